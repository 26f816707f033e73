use axum::{
    Extension, Json,
    response::{IntoResponse, Response},
};

use super::pipeline::RequestState;
use crate::error::Error;

/// GET /profile
pub async fn get_profile(Extension(state): Extension<RequestState>) -> Response {
    match state.claims {
        Some(claims) => Json(claims).into_response(),
        None => Error::Unauthorized("no profile".into()).into_response(),
    }
}

use axum::{
    Extension, Json,
    extract::State,
    response::{IntoResponse, Response},
};

use super::{create_org_for_user, derive_org_name, find_org_for_user};
use crate::auth::pipeline::RequestState;
use crate::context::Ctx;
use crate::error::Error;

/// GET /organization
///
/// Returns the caller's development organization, creating it on first use.
/// Every failure is reported as 404 and logged.
pub async fn get_organization(
    State(ctx): State<Ctx>,
    Extension(state): Extension<RequestState>,
) -> Response {
    let (Some(user_id), Some(claims)) = (state.user_id.as_deref(), state.claims.as_ref()) else {
        tracing::info!("organization requested without a resolved user");
        return Error::NotFound("no user".into()).into_response();
    };
    if user_id.trim().is_empty() {
        return Error::NotFound("blank user id".into()).into_response();
    }

    let config = &ctx.config;
    let name = derive_org_name(&config.org_prefix, &claims.account_name);

    let found = find_org_for_user(ctx.resources.as_ref(), &name, user_id, &config.quota_id).await;
    let organization = match found {
        Ok(organization) => organization,
        Err(e) if e.is_not_found() => {
            match create_org_for_user(
                ctx.resources.as_ref(),
                &name,
                user_id,
                &config.quota_id,
                &config.space_name,
            )
            .await
            {
                Ok(report) => report.organization,
                Err(e) => {
                    tracing::error!("failed to create organization {}: {}", name, e);
                    return Error::NotFound(name).into_response();
                }
            }
        }
        Err(e) => {
            tracing::error!("failed to find organization for user {}: {}", user_id, e);
            return Error::NotFound(name).into_response();
        }
    };

    Json(organization).into_response()
}

//! Request pipeline: populate the session, then gate protected routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tower_cookies::Cookies;

use super::claims::IdentityClaims;
use crate::context::Ctx;
use crate::error::Error;
use crate::session::{SessionBlob, SessionToken, codec};

/// Session data for one request, attached as a request extension.
#[derive(Debug, Clone, Default)]
pub struct RequestState {
    pub session: Option<SessionBlob>,
    pub token: Option<SessionToken>,
    pub claims: Option<IdentityClaims>,
    pub user_id: Option<String>,
}

impl RequestState {
    pub fn from_session(session: SessionBlob) -> Self {
        let decoded = codec::decode(&session);
        Self {
            session: Some(session),
            token: decoded.token,
            claims: decoded.claims,
            user_id: decoded.user_id,
        }
    }
}

/// Attach a [`RequestState`] to every request. Never rejects.
pub async fn populate_session(
    State(ctx): State<Ctx>,
    cookies: Cookies,
    mut req: Request,
    next: Next,
) -> Response {
    let state = ctx
        .sessions
        .load(&cookies)
        .map(RequestState::from_session)
        .unwrap_or_default();
    req.extensions_mut().insert(state);
    next.run(req).await
}

/// Gate a protected route: valid token, profile, authorized email domain and
/// a resolved platform user, in that order.
pub async fn authorize(
    State(ctx): State<Ctx>,
    cookies: Cookies,
    mut req: Request,
    next: Next,
) -> Response {
    let state = req
        .extensions()
        .get::<RequestState>()
        .cloned()
        .unwrap_or_default();

    let state = match check(&ctx, &cookies, state).await {
        Ok(state) => state,
        Err(e) => {
            tracing::info!("request to {} rejected: {}", req.uri().path(), e);
            return e.into_response();
        }
    };

    req.extensions_mut().insert(state);
    next.run(req).await
}

async fn check(ctx: &Ctx, cookies: &Cookies, mut state: RequestState) -> Result<RequestState, Error> {
    let Some(token) = state.token.as_ref().filter(|t| t.has_access_token()) else {
        return Err(Error::Unauthorized("no token".into()));
    };
    if token.is_expired_at(Utc::now()) {
        return Err(Error::Unauthorized("token expired".into()));
    }

    let Some(claims) = state.claims.as_ref() else {
        return Err(Error::Unauthorized("no profile".into()));
    };

    let domain = ctx.config.authorized_domain.trim().to_lowercase();
    if !domain.is_empty() && !claims.email.to_lowercase().ends_with(&domain) {
        return Err(Error::Forbidden(format!(
            "{} is not in the authorized domain",
            claims.email
        )));
    }

    if state.user_id.is_none() {
        let user_id = ctx
            .users
            .resolve_or_ensure(claims)
            .await
            .map_err(|e| Error::Unauthorized(format!("unable to provision user: {e}")))?;

        let mut session = state.session.take().unwrap_or_default();
        session.bind_user_id(&user_id);
        ctx.sessions
            .save(cookies, &session)
            .map_err(|e| Error::Unauthorized(format!("unable to save session: {e}")))?;
        tracing::info!("bound platform user {} to session", user_id);

        state.user_id = Some(user_id);
        state.session = Some(session);
    }

    Ok(state)
}

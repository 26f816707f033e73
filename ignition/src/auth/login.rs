//! Login, OAuth callback and logout handlers
//!
//! `/login` redirects to the provider with a random state value that is also
//! kept in a signed cookie; `/oauth2` checks it, exchanges the code, verifies
//! the ID token and issues the session.

use axum::{
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use oauth2::CsrfToken;
use serde::Deserialize;
use tower_cookies::Cookies;
use url::Url;

use crate::context::Ctx;
use crate::error::{Error, Result};
use crate::session::{SessionToken, TokenExtra, codec};

// ============================================================================
// OAuth client
// ============================================================================

/// Authorization-code client for the identity provider.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    pub redirect_url: String,
    pub scopes: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_in: Option<i64>,
}

impl TokenResponse {
    pub fn into_session_token(self) -> SessionToken {
        SessionToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type.unwrap_or_else(|| "bearer".to_string()),
            expiry: self.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
            extra: TokenExtra {
                id_token: self.id_token,
            },
        }
    }
}

impl OAuthClient {
    pub fn authorize_url(&self, state: &str) -> Result<String> {
        let mut url = Url::parse(&self.auth_url)
            .map_err(|e| Error::InvalidArgument(format!("invalid auth url: {e}")))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_url)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.scopes.join(" "))
            .append_pair("state", state);
        Ok(url.to_string())
    }

    pub async fn exchange_code(&self, http: &reqwest::Client, code: &str) -> Result<TokenResponse> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_url.as_str()),
        ];

        let response = http
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(header::ACCEPT, "application/json")
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::VerificationFailed(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::VerificationFailed(format!(
                "token exchange failed: {status} {body}"
            )));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| Error::VerificationFailed(format!("failed to parse token response: {e}")))
    }
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// GET /login
pub async fn login(State(ctx): State<Ctx>, cookies: Cookies) -> Response {
    let state = CsrfToken::new_random();
    let result = ctx
        .sessions
        .save_state(&cookies, state.secret())
        .and_then(|_| ctx.oauth.authorize_url(state.secret()));

    match result {
        Ok(url) => found(&url),
        Err(e) => {
            tracing::error!("failed to start login: {}", e);
            e.into_response()
        }
    }
}

/// GET /oauth2
pub async fn callback(
    State(ctx): State<Ctx>,
    cookies: Cookies,
    Query(query): Query<CallbackQuery>,
) -> Response {
    match issue_session(&ctx, &cookies, query).await {
        Ok(()) => found("/"),
        Err(e) => {
            tracing::warn!("login failed: {}", e);
            logout(State(ctx), cookies).await
        }
    }
}

/// GET /logout
pub async fn logout(State(ctx): State<Ctx>, cookies: Cookies) -> Response {
    ctx.sessions.destroy(&cookies);
    found("/")
}

async fn issue_session(ctx: &Ctx, cookies: &Cookies, query: CallbackQuery) -> Result<()> {
    let expected = ctx.sessions.take_state(cookies);
    if let Some(error) = query.error {
        return Err(Error::Unauthorized(format!("provider returned {error}")));
    }
    match (expected, query.state.as_deref()) {
        (Some(expected), Some(state)) if expected == state => {}
        _ => return Err(Error::Unauthorized("state mismatch".into())),
    }
    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| Error::Unauthorized("missing authorization code".into()))?;

    let token = ctx
        .oauth
        .exchange_code(&ctx.http, &code)
        .await?
        .into_session_token();
    let raw_id_token = token
        .extra
        .id_token
        .as_deref()
        .ok_or_else(|| Error::VerificationFailed("no id_token in token response".into()))?;
    let claims = ctx.verifier.verify(raw_id_token).await?;

    let mut session = codec::encode(&claims, &token)?;
    // the authorize stage retries when this fails
    match ctx.users.resolve_or_ensure(&claims).await {
        Ok(user_id) => {
            session.bind_user_id(&user_id);
        }
        Err(e) => tracing::warn!("unable to resolve user {}: {}", claims.account_name, e),
    }

    ctx.sessions.save(cookies, &session)?;
    tracing::info!("issued session for {}", claims.account_name);
    Ok(())
}

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by the session, identity and tenant layers.
///
/// Each variant carries a server-side detail message. Responses only ever
/// carry the canonical status text; the detail is for logs.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("identity token verification failed: {0}")]
    VerificationFailed(String),

    #[error("identity service unavailable: {0}")]
    IdentityServiceUnavailable(String),

    #[error("resource service unavailable: {0}")]
    ResourceServiceUnavailable(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("session error: {0}")]
    Session(String),
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::VerificationFailed(_) | Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Error::IdentityServiceUnavailable(_)
            | Error::ResourceServiceUnavailable(_)
            | Error::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let reason = status.canonical_reason().unwrap_or("Error");
        (status, reason).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            Error::VerificationFailed("sig".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(Error::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(Error::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            Error::InvalidArgument("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::ResourceServiceUnavailable("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_response_hides_detail() {
        let response = Error::Unauthorized("token expired at 12:00".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

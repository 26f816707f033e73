use serde::de::DeserializeOwned;

pub mod configuration;
pub mod organizations_api;
pub mod spaces_api;
pub mod users_api;

use configuration::Configuration;

#[derive(Debug, Clone)]
pub struct ResponseContent {
    pub status: reqwest::StatusCode,
    pub content: String,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("error in reqwest: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("error in serde: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("error in response: status code {}", .0.status)]
    ResponseError(ResponseContent),
}

impl Error {
    /// HTTP status of a non-success response, if that is what failed.
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            Error::ResponseError(content) => Some(content.status),
            Error::Reqwest(e) => e.status(),
            _ => None,
        }
    }
}

pub(crate) fn endpoint(configuration: &Configuration, path: &str) -> Result<url::Url, Error> {
    let base = configuration.base_path.trim_end_matches('/');
    Ok(url::Url::parse(&format!("{base}{path}"))?)
}

/// Apply user agent and bearer token to an outgoing request.
pub(crate) async fn authorized(
    configuration: &Configuration,
    mut builder: reqwest::RequestBuilder,
) -> Result<reqwest::RequestBuilder, Error> {
    if let Some(user_agent) = &configuration.user_agent {
        builder = builder.header(reqwest::header::USER_AGENT, user_agent.clone());
    }
    if let Some(token) = configuration.access_token().await? {
        builder = builder.bearer_auth(token);
    }
    Ok(builder.header(reqwest::header::ACCEPT, "application/json"))
}

pub(crate) async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, Error> {
    let status = response.status();
    let content = response.text().await?;

    if status.is_client_error() || status.is_server_error() {
        return Err(Error::ResponseError(ResponseContent { status, content }));
    }
    Ok(serde_json::from_str(&content)?)
}

pub(crate) async fn read_empty(response: reqwest::Response) -> Result<(), Error> {
    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        let content = response.text().await?;
        return Err(Error::ResponseError(ResponseContent { status, content }));
    }
    Ok(())
}

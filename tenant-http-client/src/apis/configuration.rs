use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::apis::Error;
use crate::models::PasswordTokenResponse;

/// Connection settings shared by every API call against one tenant service.
#[derive(Debug, Clone)]
pub struct Configuration {
    /// Base URL of the service, e.g. `https://uaa.sys.example.com`
    pub base_path: String,
    pub user_agent: Option<String>,
    pub client: reqwest::Client,
    /// Static bearer token, used when no password grant is configured
    pub bearer_access_token: Option<String>,
    /// Credentials used to obtain the bearer token
    pub password_grant: Option<PasswordGrant>,
    /// Last password-grant token, shared by clones
    pub token_cache: TokenCache,
}

/// OAuth2 resource-owner password grant against a UAA token endpoint.
#[derive(Debug, Clone)]
pub struct PasswordGrant {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
}

impl Configuration {
    pub fn new() -> Configuration {
        Configuration::default()
    }

    /// Resolve the bearer token for the next request, reusing a granted token
    /// until shortly before it expires.
    pub async fn access_token(&self) -> Result<Option<String>, Error> {
        let Some(grant) = &self.password_grant else {
            return Ok(self.bearer_access_token.clone());
        };
        if let Some(token) = self.token_cache.get() {
            return Ok(Some(token));
        }
        let token = grant.fetch(&self.client).await?;
        self.token_cache.put(&token);
        Ok(Some(token.access_token))
    }
}

/// Tokens within this long of expiry are fetched again.
const EXPIRY_MARGIN: Duration = Duration::from_secs(30);

struct CachedToken {
    access_token: String,
    refresh_at: Instant,
}

/// Read-mostly cache for the password-grant token. Concurrent misses may each
/// fetch a token; the last one written wins.
#[derive(Clone, Default)]
pub struct TokenCache(Arc<RwLock<Option<CachedToken>>>);

impl TokenCache {
    fn get(&self) -> Option<String> {
        let cached = self.0.read().ok()?;
        cached
            .as_ref()
            .filter(|token| Instant::now() < token.refresh_at)
            .map(|token| token.access_token.clone())
    }

    /// Tokens without a usable `expires_in` are not kept.
    fn put(&self, token: &PasswordTokenResponse) {
        let Some(lifetime) = token
            .expires_in
            .map(Duration::from_secs)
            .and_then(|lifetime| lifetime.checked_sub(EXPIRY_MARGIN))
            .filter(|lifetime| !lifetime.is_zero())
        else {
            return;
        };
        if let Ok(mut cached) = self.0.write() {
            *cached = Some(CachedToken {
                access_token: token.access_token.clone(),
                refresh_at: Instant::now() + lifetime,
            });
        }
    }
}

impl fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cached = self.0.read().map(|c| c.is_some()).unwrap_or(false);
        f.debug_struct("TokenCache").field("cached", &cached).finish()
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            base_path: "http://localhost".to_owned(),
            user_agent: Some("tenant-http-client/1.0.0/rust".to_owned()),
            client: default_client(),
            bearer_access_token: None,
            password_grant: None,
            token_cache: TokenCache::default(),
        }
    }
}

/// A client with a connect timeout only; request deadlines are left to the transport.
pub fn default_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

impl PasswordGrant {
    pub async fn fetch(&self, client: &reqwest::Client) -> Result<PasswordTokenResponse, Error> {
        let params = [
            ("grant_type", "password"),
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
        ];

        let response = client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&params)
            .send()
            .await?;

        super::read_json(response).await
    }
}

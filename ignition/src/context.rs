use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use openidconnect::{IssuerUrl, core::CoreProviderMetadata};
use serde::Deserialize;
use tenant_http_client::apis::configuration::{Configuration, PasswordGrant, TokenCache};

use crate::auth::login::OAuthClient;
use crate::auth::{IdentityVerifier, OidcVerifier, TenantUserResolver};
use crate::session::SessionStore;
use crate::tenant::{HttpIdentityApi, HttpResourceApi, TenantIdentityApi, TenantResourceApi};

/// Identity provider settings taken directly from the environment
#[derive(Clone, Debug, PartialEq)]
pub struct OpenIdConfig {
    pub issuer_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: Option<String>,
    pub token_url: Option<String>,
    pub jwks_url: Option<String>,
}

/// Credentials of the bound Single Sign On service instance named `identity`
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ServiceBinding {
    pub auth_domain: String,
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AuthVariant {
    OpenId(OpenIdConfig),
    ServiceBinding(ServiceBinding),
}

/// Authorization, token and key-set endpoints of the identity provider
#[derive(Clone, Debug, PartialEq)]
pub struct ProviderEndpoints {
    pub issuer_url: String,
    pub auth_url: String,
    pub token_url: String,
    pub jwks_url: String,
}

/// Read-only configuration shared by every request
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub scheme: String,
    pub domain: String,
    /// Public port used to build redirect URLs
    pub port: u16,
    /// Port the server binds to
    pub serve_port: u16,
    pub session_secret: String,
    /// Email suffix required of every user; empty disables the check
    pub authorized_domain: String,
    pub auth: AuthVariant,
    pub scopes: Vec<String>,
    pub verify_audience: bool,
    pub org_prefix: String,
    pub quota_id: String,
    pub space_name: String,
    pub uaa_url: String,
    pub uaa_origin: String,
    pub ccapi_url: String,
    pub ccapi_client_id: String,
    pub ccapi_client_secret: String,
    pub ccapi_username: String,
    pub ccapi_password: String,
}

#[derive(Deserialize)]
struct VcapApplication {
    #[serde(default)]
    application_uris: Vec<String>,
}

#[derive(Deserialize)]
struct VcapService {
    name: String,
    #[serde(default)]
    credentials: serde_json::Map<String, serde_json::Value>,
}

const IDENTITY_SERVICE_REQUIRED: &str =
    "a Single Sign On service instance with the name \"identity\" is required to use this app";

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from `IGNITION_*` variables. When
    /// `VCAP_APPLICATION` is present the app is running on the platform and
    /// scheme, domain and ports come from there.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &str| get(key).ok_or_else(|| anyhow!("{key} must be set"));

        let vcap_application = get("VCAP_APPLICATION");
        let (scheme, domain, port, serve_port) = match &vcap_application {
            Some(raw) => {
                let app: VcapApplication =
                    serde_json::from_str(raw).context("Failed to parse VCAP_APPLICATION")?;
                let domain = app.application_uris.into_iter().next().ok_or_else(|| {
                    anyhow!("ignition requires a route to function; please map a route")
                })?;
                let serve_port = required("PORT")?.parse().context("Invalid PORT")?;
                ("https".to_string(), domain, 443, serve_port)
            }
            None => (
                get("IGNITION_SCHEME").unwrap_or_else(|| "http".to_string()),
                get("IGNITION_DOMAIN").unwrap_or_else(|| "localhost".to_string()),
                parse_port(get("IGNITION_PORT"), 3000).context("Invalid IGNITION_PORT")?,
                parse_port(get("IGNITION_SERVE_PORT"), 3000)
                    .context("Invalid IGNITION_SERVE_PORT")?,
            ),
        };

        let variant = get("IGNITION_AUTH_VARIANT")
            .unwrap_or_default()
            .to_lowercase();
        let auth = match variant.as_str() {
            "p-identity" => {
                let services = get("VCAP_SERVICES").ok_or_else(|| anyhow!(IDENTITY_SERVICE_REQUIRED))?;
                AuthVariant::ServiceBinding(identity_binding(&services)?)
            }
            "" | "openid" => AuthVariant::OpenId(OpenIdConfig {
                issuer_url: get("IGNITION_ISSUER_URL")
                    .or_else(|| get("IGNITION_AUTH_ISSUER"))
                    .ok_or_else(|| anyhow!("IGNITION_ISSUER_URL must be set"))?,
                client_id: required("IGNITION_CLIENT_ID")?,
                client_secret: required("IGNITION_CLIENT_SECRET")?,
                auth_url: get("IGNITION_AUTH_URL"),
                token_url: get("IGNITION_TOKEN_URL"),
                jwks_url: get("IGNITION_JWKS_URL"),
            }),
            other => bail!("unknown IGNITION_AUTH_VARIANT {other}"),
        };

        let scopes = get("IGNITION_AUTH_SCOPES")
            .map(|s| {
                s.split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_else(|| vec!["openid".into(), "profile".into(), "email".into()]);

        let verify_audience = match get("IGNITION_VERIFY_AUDIENCE") {
            Some(v) => v.parse().context("Invalid IGNITION_VERIFY_AUDIENCE")?,
            None => true,
        };

        Ok(Self {
            scheme,
            domain,
            port,
            serve_port,
            session_secret: required("IGNITION_SESSION_SECRET")?,
            authorized_domain: get("IGNITION_AUTHORIZED_DOMAIN").unwrap_or_default(),
            auth,
            scopes,
            verify_audience,
            org_prefix: get("IGNITION_ORG_PREFIX").unwrap_or_else(|| "ignition".to_string()),
            quota_id: required("IGNITION_QUOTA_ID")?,
            space_name: get("IGNITION_SPACE_NAME").unwrap_or_else(|| "playground".to_string()),
            uaa_url: required("IGNITION_UAA_URL")?,
            uaa_origin: get("IGNITION_UAA_ORIGIN").unwrap_or_else(|| "uaa".to_string()),
            ccapi_url: required("IGNITION_CCAPI_URL")?,
            ccapi_client_id: get("IGNITION_CCAPI_CLIENT_ID").unwrap_or_else(|| "cf".to_string()),
            ccapi_client_secret: get("IGNITION_CCAPI_CLIENT_SECRET").unwrap_or_default(),
            ccapi_username: required("IGNITION_CCAPI_USERNAME")?,
            ccapi_password: required("IGNITION_CCAPI_PASSWORD")?,
        })
    }

    /// Public base URI, without the port when it is the scheme's default.
    pub fn uri(&self) -> String {
        match (self.scheme.as_str(), self.port) {
            ("https", 443) | ("http", 80) => format!("{}://{}", self.scheme, self.domain),
            _ => format!("{}://{}:{}", self.scheme, self.domain, self.port),
        }
    }

    pub fn redirect_url(&self) -> String {
        format!("{}/oauth2", self.uri())
    }

    /// Cookies are only marked `Secure` off localhost.
    pub fn secure_cookies(&self) -> bool {
        self.domain != "localhost"
    }

    pub fn client_credentials(&self) -> (&str, &str) {
        match &self.auth {
            AuthVariant::OpenId(c) => (&c.client_id, &c.client_secret),
            AuthVariant::ServiceBinding(b) => (&b.client_id, &b.client_secret),
        }
    }

    fn password_grant(&self) -> PasswordGrant {
        PasswordGrant {
            token_url: format!("{}/oauth/token", self.uaa_url.trim_end_matches('/')),
            client_id: self.ccapi_client_id.clone(),
            client_secret: self.ccapi_client_secret.clone(),
            username: self.ccapi_username.clone(),
            password: self.ccapi_password.clone(),
        }
    }

    pub fn tenant_configuration(&self, base_path: &str, client: reqwest::Client) -> Configuration {
        Configuration {
            base_path: base_path.to_string(),
            user_agent: Some(format!("ignition/{}", env!("CARGO_PKG_VERSION"))),
            client,
            bearer_access_token: None,
            password_grant: Some(self.password_grant()),
            token_cache: TokenCache::default(),
        }
    }
}

fn parse_port(value: Option<String>, default: u16) -> anyhow::Result<u16> {
    match value {
        Some(v) => Ok(v.parse()?),
        None => Ok(default),
    }
}

fn identity_binding(raw: &str) -> anyhow::Result<ServiceBinding> {
    let services: std::collections::HashMap<String, Vec<VcapService>> =
        serde_json::from_str(raw).context("Failed to parse VCAP_SERVICES")?;
    let service = services
        .into_values()
        .flatten()
        .find(|s| s.name == "identity")
        .ok_or_else(|| anyhow!(IDENTITY_SERVICE_REQUIRED))?;

    let credential = |key: &str| {
        service
            .credentials
            .get(key)
            .and_then(|v| v.as_str())
            .filter(|v| !v.trim().is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                anyhow!(
                    "could not retrieve the {key}; make sure you have created and bound a Single Sign On service instance with the name \"identity\""
                )
            })
    };

    Ok(ServiceBinding {
        auth_domain: credential("auth_domain")?,
        client_id: credential("client_id")?,
        client_secret: credential("client_secret")?,
    })
}

/// Resolve provider endpoints, discovering any the environment leaves unset.
pub async fn resolve_endpoints(
    auth: &AuthVariant,
    http: &reqwest::Client,
) -> anyhow::Result<ProviderEndpoints> {
    match auth {
        AuthVariant::ServiceBinding(binding) => {
            let issuer = binding.auth_domain.trim_end_matches('/');
            Ok(ProviderEndpoints {
                issuer_url: format!("{issuer}/oauth/token"),
                auth_url: format!("{issuer}/oauth/authorize"),
                token_url: format!("{issuer}/oauth/token"),
                jwks_url: format!("{issuer}/token_keys"),
            })
        }
        AuthVariant::OpenId(config) => {
            let issuer = config.issuer_url.trim_end_matches('/');
            if let (Some(auth_url), Some(token_url)) = (&config.auth_url, &config.token_url) {
                return Ok(ProviderEndpoints {
                    issuer_url: config.issuer_url.clone(),
                    auth_url: auth_url.clone(),
                    token_url: token_url.clone(),
                    jwks_url: config
                        .jwks_url
                        .clone()
                        .unwrap_or_else(|| format!("{issuer}/token_keys")),
                });
            }

            tracing::info!("Discovering provider metadata for {}", config.issuer_url);
            let issuer_url = IssuerUrl::new(config.issuer_url.clone()).context("Invalid issuer URL")?;
            let metadata = CoreProviderMetadata::discover_async(issuer_url, http)
                .await
                .context("Failed to discover provider metadata")?;

            let token_url = match &config.token_url {
                Some(url) => url.clone(),
                None => metadata
                    .token_endpoint()
                    .map(|u| u.as_str().to_string())
                    .ok_or_else(|| anyhow!("provider does not advertise a token endpoint"))?,
            };
            Ok(ProviderEndpoints {
                issuer_url: config.issuer_url.clone(),
                auth_url: config
                    .auth_url
                    .clone()
                    .unwrap_or_else(|| metadata.authorization_endpoint().as_str().to_string()),
                token_url,
                jwks_url: config
                    .jwks_url
                    .clone()
                    .unwrap_or_else(|| metadata.jwks_uri().as_str().to_string()),
            })
        }
    }
}

/// Application context that holds shared resources
#[derive(Clone)]
pub struct Ctx {
    pub config: Arc<AppConfig>,
    pub sessions: SessionStore,
    pub oauth: Arc<OAuthClient>,
    pub verifier: Arc<dyn IdentityVerifier>,
    pub users: TenantUserResolver,
    pub resources: Arc<dyn TenantResourceApi>,
    /// Outbound client shared by the token exchange and key-set fetches
    pub http: reqwest::Client,
}

impl Ctx {
    /// Create a new application context
    pub async fn new() -> anyhow::Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        let config = AppConfig::from_env()?;
        tracing::info!("Starting ignition at {}", config.uri());

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Failed to build HTTP client")?;

        let endpoints = resolve_endpoints(&config.auth, &http).await?;
        tracing::info!(
            "Using identity provider {} (keys at {})",
            endpoints.issuer_url,
            endpoints.jwks_url
        );

        let (client_id, client_secret) = config.client_credentials();
        let verifier = OidcVerifier::new(
            http.clone(),
            &endpoints.issuer_url,
            client_id,
            client_secret,
            &endpoints.jwks_url,
        )?
        .require_audience_match(config.verify_audience);

        let identity = HttpIdentityApi::new(config.tenant_configuration(&config.uaa_url, http.clone()));
        let resources =
            HttpResourceApi::new(config.tenant_configuration(&config.ccapi_url, http.clone()));
        tracing::info!(
            "Tenant APIs configured (uaa {}, cloud controller {})",
            config.uaa_url,
            config.ccapi_url
        );

        Ok(Self::with_services(
            config,
            &endpoints,
            Arc::new(verifier),
            Arc::new(identity),
            Arc::new(resources),
            http,
        ))
    }

    pub fn with_services(
        config: AppConfig,
        endpoints: &ProviderEndpoints,
        verifier: Arc<dyn IdentityVerifier>,
        identity: Arc<dyn TenantIdentityApi>,
        resources: Arc<dyn TenantResourceApi>,
        http: reqwest::Client,
    ) -> Self {
        let (client_id, client_secret) = config.client_credentials();
        let oauth = OAuthClient {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            auth_url: endpoints.auth_url.clone(),
            token_url: endpoints.token_url.clone(),
            redirect_url: config.redirect_url(),
            scopes: config.scopes.clone(),
        };

        Self {
            sessions: SessionStore::new(&config.session_secret, config.secure_cookies()),
            users: TenantUserResolver::new(identity, config.uaa_origin.clone()),
            oauth: Arc::new(oauth),
            verifier,
            resources,
            http,
            config: Arc::new(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, String> {
        [
            ("IGNITION_CLIENT_ID", "test-ignition-client-id"),
            ("IGNITION_CLIENT_SECRET", "test-ignition-client-secret"),
            ("IGNITION_AUTH_URL", "https://login.example.com/oauth/authorize"),
            ("IGNITION_TOKEN_URL", "https://login.example.com/oauth/token"),
            ("IGNITION_ISSUER_URL", "https://login.example.com/oauth/token"),
            ("IGNITION_SESSION_SECRET", "test-session-secret"),
            ("IGNITION_CCAPI_URL", "https://api.example.com"),
            ("IGNITION_UAA_URL", "https://uaa.example.com"),
            ("IGNITION_CCAPI_USERNAME", "test-ccapi-username"),
            ("IGNITION_CCAPI_PASSWORD", "test-ccapi-password"),
            ("IGNITION_QUOTA_ID", "test-quotaid"),
        ]
        .into_iter()
        .map(|(k, v)| (k, v.to_string()))
        .collect()
    }

    fn load(env: &HashMap<&'static str, String>) -> anyhow::Result<AppConfig> {
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    const VCAP_APPLICATION: &str = r#"{"application_name": "ignition","application_uris": ["ignition.example.io"],"space_name": "development"}"#;

    #[test]
    fn test_empty_environment_fails() {
        assert!(load(&HashMap::new()).is_err());
    }

    #[test]
    fn test_local_defaults() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.scheme, "http");
        assert_eq!(config.domain, "localhost");
        assert_eq!(config.port, 3000);
        assert_eq!(config.serve_port, 3000);
        assert_eq!(config.ccapi_client_id, "cf");
        assert_eq!(config.ccapi_client_secret, "");
        assert_eq!(config.org_prefix, "ignition");
        assert_eq!(config.scopes, vec!["openid", "profile", "email"]);
        assert!(!config.secure_cookies());
        assert_eq!(config.redirect_url(), "http://localhost:3000/oauth2");
        assert_eq!(
            config.client_credentials(),
            ("test-ignition-client-id", "test-ignition-client-secret")
        );
    }

    #[test]
    fn test_required_keys() {
        for key in [
            "IGNITION_CCAPI_URL",
            "IGNITION_CLIENT_ID",
            "IGNITION_CLIENT_SECRET",
            "IGNITION_CCAPI_USERNAME",
            "IGNITION_CCAPI_PASSWORD",
            "IGNITION_QUOTA_ID",
        ] {
            let mut env = base_env();
            env.remove(key);
            assert!(load(&env).is_err(), "{key} should be required");
        }
    }

    #[test]
    fn test_running_on_platform() {
        let mut env = base_env();
        env.insert("VCAP_APPLICATION", VCAP_APPLICATION.to_string());
        env.insert("PORT", "6543".to_string());

        let config = load(&env).unwrap();
        assert_eq!(config.scheme, "https");
        assert_eq!(config.port, 443);
        assert_eq!(config.serve_port, 6543);
        assert_eq!(config.domain, "ignition.example.io");
        assert!(config.secure_cookies());
        assert_eq!(config.redirect_url(), "https://ignition.example.io/oauth2");
    }

    #[test]
    fn test_platform_requires_route() {
        let mut env = base_env();
        env.insert("VCAP_APPLICATION", r#"{"application_uris": []}"#.to_string());
        env.insert("PORT", "6543".to_string());

        let err = load(&env).unwrap_err();
        assert!(err.to_string().contains("please map a route"));
    }

    #[test]
    fn test_service_binding_variant() {
        let mut env = base_env();
        env.insert("VCAP_APPLICATION", VCAP_APPLICATION.to_string());
        env.insert("PORT", "6543".to_string());
        env.insert("IGNITION_AUTH_VARIANT", "p-identity".to_string());

        env.insert("VCAP_SERVICES", "{}".to_string());
        let err = load(&env).unwrap_err();
        assert!(err.to_string().contains(IDENTITY_SERVICE_REQUIRED));

        env.insert(
            "VCAP_SERVICES",
            r#"{"p-identity": [{"name": "identity", "label": "p-identity",
                "credentials": {"auth_domain": "https://ignition.login.example.io",
                                "client_secret": "test-cf-client-secret"}}]}"#
                .to_string(),
        );
        let err = load(&env).unwrap_err();
        assert!(err.to_string().contains("could not retrieve the client_id"));

        env.insert(
            "VCAP_SERVICES",
            r#"{"p-identity": [{"name": "identity", "label": "p-identity",
                "credentials": {"auth_domain": "https://ignition.login.example.io",
                                "client_id": "test-cf-client-id",
                                "client_secret": "test-cf-client-secret"}}]}"#
                .to_string(),
        );
        let config = load(&env).unwrap();
        assert_eq!(
            config.client_credentials(),
            ("test-cf-client-id", "test-cf-client-secret")
        );
    }

    #[tokio::test]
    async fn test_service_binding_endpoints() {
        let auth = AuthVariant::ServiceBinding(ServiceBinding {
            auth_domain: "https://ignition.login.example.io/".to_string(),
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
        });
        let endpoints = resolve_endpoints(&auth, &reqwest::Client::new()).await.unwrap();
        assert_eq!(endpoints.auth_url, "https://ignition.login.example.io/oauth/authorize");
        assert_eq!(endpoints.jwks_url, "https://ignition.login.example.io/token_keys");
    }

    #[tokio::test]
    async fn test_configured_endpoints_skip_discovery() {
        let config = load(&base_env()).unwrap();
        let endpoints = resolve_endpoints(&config.auth, &reqwest::Client::new())
            .await
            .unwrap();
        assert_eq!(endpoints.token_url, "https://login.example.com/oauth/token");
        assert_eq!(endpoints.jwks_url, "https://login.example.com/oauth/token/token_keys");
    }
}

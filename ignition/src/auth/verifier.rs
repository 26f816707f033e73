//! ID token verification against the identity provider's key set.

use async_trait::async_trait;
use openidconnect::{
    AdditionalClaims, ClientId, ClientSecret, IdToken, IdTokenClaims, IssuerUrl,
    JsonWebKeySetUrl, Nonce,
    core::{
        CoreGenderClaim, CoreIdTokenVerifier, CoreJsonWebKeySet,
        CoreJweContentEncryptionAlgorithm, CoreJwsSigningAlgorithm,
    },
};
use serde::{Deserialize, Serialize};

use super::claims::IdentityClaims;
use crate::error::{Error, Result};

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verify signature, issuer and audience of a raw ID token and map it to
    /// identity claims. Every failure is `VerificationFailed`.
    async fn verify(&self, raw_id_token: &str) -> Result<IdentityClaims>;
}

/// Non-standard claims UAA puts in its ID tokens.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UaaClaims {
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl AdditionalClaims for UaaClaims {}

type UaaIdToken = IdToken<
    UaaClaims,
    CoreGenderClaim,
    CoreJweContentEncryptionAlgorithm,
    CoreJwsSigningAlgorithm,
>;

type UaaIdTokenClaims = IdTokenClaims<UaaClaims, CoreGenderClaim>;

/// Verifies tokens with keys fetched from the provider's JWKS endpoint on
/// every call.
pub struct OidcVerifier {
    http: reqwest::Client,
    issuer: IssuerUrl,
    client_id: ClientId,
    client_secret: ClientSecret,
    jwks_url: JsonWebKeySetUrl,
    require_audience: bool,
}

impl OidcVerifier {
    pub fn new(
        http: reqwest::Client,
        issuer: &str,
        client_id: &str,
        client_secret: &str,
        jwks_url: &str,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            http,
            issuer: IssuerUrl::new(issuer.to_string())?,
            client_id: ClientId::new(client_id.to_string()),
            client_secret: ClientSecret::new(client_secret.to_string()),
            jwks_url: JsonWebKeySetUrl::new(jwks_url.to_string())?,
            require_audience: true,
        })
    }

    pub fn require_audience_match(mut self, require: bool) -> Self {
        self.require_audience = require;
        self
    }
}

#[async_trait]
impl IdentityVerifier for OidcVerifier {
    async fn verify(&self, raw_id_token: &str) -> Result<IdentityClaims> {
        let keys = CoreJsonWebKeySet::fetch_async(&self.jwks_url, &self.http)
            .await
            .map_err(|e| Error::VerificationFailed(format!("failed to fetch key set: {e}")))?;

        let id_token: UaaIdToken = raw_id_token
            .parse()
            .map_err(|e| Error::VerificationFailed(format!("malformed id token: {e}")))?;

        let verifier = CoreIdTokenVerifier::new_confidential_client(
            self.client_id.clone(),
            self.client_secret.clone(),
            self.issuer.clone(),
            keys,
        )
        .require_audience_match(self.require_audience);

        // no nonce is sent on the authorization request
        let claims = id_token
            .claims(
                &verifier,
                |_: Option<&Nonce>| -> std::result::Result<(), String> { Ok(()) },
            )
            .map_err(|e| Error::VerificationFailed(e.to_string()))?;

        identity_from_claims(claims)
    }
}

fn identity_from_claims(claims: &UaaIdTokenClaims) -> Result<IdentityClaims> {
    let given_name = claims
        .given_name()
        .and_then(|n| n.get(None))
        .map(|n| n.as_str().to_string());
    let family_name = claims
        .family_name()
        .and_then(|n| n.get(None))
        .map(|n| n.as_str().to_string());
    let email = claims.email().map(|e| e.as_str().to_string());

    map_identity(
        claims.subject().as_str(),
        claims.additional_claims().user_name.as_deref(),
        given_name.as_deref(),
        family_name.as_deref(),
        email.as_deref(),
    )
}

/// Build identity claims from verified token fields.
///
/// The account name falls back to the email when `user_name` is blank; a
/// token with neither is rejected.
pub fn map_identity(
    subject: &str,
    user_name: Option<&str>,
    given_name: Option<&str>,
    family_name: Option<&str>,
    email: Option<&str>,
) -> Result<IdentityClaims> {
    let email = email.unwrap_or_default().to_string();
    let account_name = match user_name.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => email.clone(),
    };
    if account_name.is_empty() {
        return Err(Error::VerificationFailed(
            "token carries neither user_name nor email".into(),
        ));
    }

    let display_name = format!(
        "{} {}",
        given_name.unwrap_or_default(),
        family_name.unwrap_or_default()
    )
    .trim()
    .to_string();

    Ok(IdentityClaims {
        subject: subject.to_string(),
        account_name,
        display_name,
        email,
    })
}

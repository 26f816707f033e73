use std::io::{Read, Write};

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use flate2::{Compression, read::GzDecoder, write::GzEncoder};
use serde::{Deserialize, Serialize};

use crate::auth::claims::IdentityClaims;
use crate::error::{Error, Result};

/// Extra fields carried alongside the OAuth token pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenExtra {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

/// OAuth token pair as held in the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: String,
    /// `None` means the provider did not report an expiry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub extra: TokenExtra,
}

impl SessionToken {
    pub fn has_access_token(&self) -> bool {
        !self.access_token.is_empty()
    }

    /// Expired once `expiry - now` is negative. No grace period.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => expiry.signed_duration_since(now) < chrono::Duration::zero(),
            None => false,
        }
    }
}

/// The client-held session container.
///
/// `token` holds gzip-compressed token JSON, `profile` the claims JSON and
/// `uaaid` the resolved platform user id. [`SessionBlob::pack`] frames the
/// three as `<token>.<profile>.<uaaid>`, each base64url once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionBlob {
    token: Vec<u8>,
    profile: Vec<u8>,
    uaaid: Option<String>,
}

impl SessionBlob {
    pub fn user_id(&self) -> Option<&str> {
        self.uaaid.as_deref().filter(|id| !id.trim().is_empty())
    }

    /// Bind the platform user id. Returns `false` when an id is already bound
    /// or `id` is blank; a bound id is never replaced.
    pub fn bind_user_id(&mut self, id: &str) -> bool {
        if self.user_id().is_some() || id.trim().is_empty() {
            return false;
        }
        self.uaaid = Some(id.to_string());
        true
    }

    pub fn pack(&self) -> String {
        format!(
            "{}.{}.{}",
            URL_SAFE_NO_PAD.encode(&self.token),
            URL_SAFE_NO_PAD.encode(&self.profile),
            URL_SAFE_NO_PAD.encode(self.uaaid.as_deref().unwrap_or_default())
        )
    }

    /// Inverse of [`pack`](Self::pack). A field that fails to decode comes
    /// back empty so the others still load; a value without three fields is
    /// not a session.
    pub fn unpack(value: &str) -> Option<Self> {
        let mut fields = value.split('.');
        let (Some(token), Some(profile), Some(uaaid), None) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return None;
        };

        let field = |name: &str, encoded: &str| match URL_SAFE_NO_PAD.decode(encoded) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("dropping undecodable session {}: {}", name, e);
                Vec::new()
            }
        };

        Some(Self {
            token: field("token", token),
            profile: field("profile", profile),
            uaaid: String::from_utf8(field("uaaid", uaaid))
                .ok()
                .filter(|id| !id.is_empty()),
        })
    }
}

/// Result of a partial decode. Each field is independently absent on failure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedSession {
    pub claims: Option<IdentityClaims>,
    pub token: Option<SessionToken>,
    pub user_id: Option<String>,
}

pub fn encode(claims: &IdentityClaims, token: &SessionToken) -> Result<SessionBlob> {
    let profile = serde_json::to_vec(claims)
        .map_err(|e| Error::Session(format!("failed to encode profile: {e}")))?;
    let token_json = serde_json::to_vec(token)
        .map_err(|e| Error::Session(format!("failed to encode token: {e}")))?;
    Ok(SessionBlob {
        token: gzip(&token_json)?,
        profile,
        uaaid: None,
    })
}

pub fn decode(blob: &SessionBlob) -> DecodedSession {
    let token = match decode_token(&blob.token) {
        Ok(token) => token,
        Err(e) => {
            tracing::warn!("unable to decode session token: {}", e);
            None
        }
    };

    let claims = if blob.profile.is_empty() {
        None
    } else {
        match serde_json::from_slice::<IdentityClaims>(&blob.profile) {
            Ok(claims) => Some(claims),
            Err(e) => {
                tracing::warn!("unable to decode session profile: {}", e);
                None
            }
        }
    };

    DecodedSession {
        claims,
        token,
        user_id: blob.user_id().map(str::to_string),
    }
}

fn decode_token(compressed: &[u8]) -> Result<Option<SessionToken>> {
    if compressed.is_empty() {
        return Ok(None);
    }
    let json = gunzip(compressed)?;
    let token = serde_json::from_slice(&json)
        .map_err(|e| Error::Session(format!("bad token json: {e}")))?;
    Ok(Some(token))
}

fn gzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|e| Error::Session(format!("gzip failed: {e}")))
}

fn gunzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| Error::Session(format!("gunzip failed: {e}")))?;
    Ok(out)
}

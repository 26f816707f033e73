//! Signed cookie session store.
//!
//! Cookie values are `<data>.<hex hmac-sha256>`, where `data` is a packed
//! [`SessionBlob`] for the session cookie and a base64url payload for the
//! login state. Anything that fails to verify or parse is treated as no
//! session.

pub mod codec;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tower_cookies::{Cookie, Cookies, cookie::SameSite};

use crate::error::{Error, Result};
pub use codec::{DecodedSession, SessionBlob, SessionToken, TokenExtra};

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "ignition";
pub const STATE_COOKIE: &str = "ignition_state";

const SESSION_MAX_AGE_SECONDS: i64 = 30 * 24 * 60 * 60;
const STATE_MAX_AGE_SECONDS: i64 = 5 * 60;

/// Browsers drop cookies whose `name=value` exceeds this.
pub const MAX_COOKIE_BYTES: usize = 4096;

/// Reads and writes the session and login-state cookies.
#[derive(Clone)]
pub struct SessionStore {
    secret: Vec<u8>,
    secure: bool,
}

impl SessionStore {
    pub fn new(secret: impl AsRef<[u8]>, secure: bool) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            secure,
        }
    }

    // ========================================================================
    // Signing
    // ========================================================================

    fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| Error::Session(format!("failed to create HMAC: {e}")))
    }

    /// Append an HMAC to cookie-safe `data`.
    fn sign(&self, data: &str) -> Result<String> {
        let mut mac = self.mac()?;
        mac.update(data.as_bytes());
        Ok(format!("{}.{}", data, hex::encode(mac.finalize().into_bytes())))
    }

    /// Check the trailing HMAC and return the signed data.
    fn verify<'a>(&self, value: &'a str) -> Option<&'a str> {
        let (data, signature) = value.rsplit_once('.')?;
        let signature = hex::decode(signature).ok()?;

        let mut mac = self.mac().ok()?;
        mac.update(data.as_bytes());
        if mac.verify_slice(&signature).is_err() {
            tracing::warn!("rejected cookie with invalid signature");
            return None;
        }
        Some(data)
    }

    /// Sign `payload` into a cookie value.
    pub fn seal(&self, payload: &[u8]) -> Result<String> {
        self.sign(&URL_SAFE_NO_PAD.encode(payload))
    }

    /// Verify a cookie value and return its payload.
    pub fn open(&self, value: &str) -> Option<Vec<u8>> {
        URL_SAFE_NO_PAD.decode(self.verify(value)?).ok()
    }

    // ========================================================================
    // Session cookie
    // ========================================================================

    pub fn load(&self, cookies: &Cookies) -> Option<SessionBlob> {
        let cookie = cookies.get(SESSION_COOKIE)?;
        self.open_session(cookie.value())
    }

    /// Verify a session cookie value and unpack it.
    pub fn open_session(&self, value: &str) -> Option<SessionBlob> {
        let blob = SessionBlob::unpack(self.verify(value)?);
        if blob.is_none() {
            tracing::warn!("discarding malformed session cookie");
        }
        blob
    }

    /// Write the session cookie. Fails rather than emit a cookie the browser
    /// would drop.
    pub fn save(&self, cookies: &Cookies, blob: &SessionBlob) -> Result<()> {
        let value = self.cookie_value(blob)?;
        let size = SESSION_COOKIE.len() + 1 + value.len();
        if size > MAX_COOKIE_BYTES {
            tracing::error!(
                "session cookie is {} bytes, over the {} byte limit",
                size,
                MAX_COOKIE_BYTES
            );
            return Err(Error::Session(format!("session cookie too large: {size} bytes")));
        }
        cookies.add(self.cookie(SESSION_COOKIE, value, SESSION_MAX_AGE_SECONDS));
        Ok(())
    }

    pub fn cookie_value(&self, blob: &SessionBlob) -> Result<String> {
        self.sign(&blob.pack())
    }

    pub fn destroy(&self, cookies: &Cookies) {
        let mut cookie = Cookie::new(SESSION_COOKIE, "");
        cookie.set_path("/");
        cookies.remove(cookie);
    }

    // ========================================================================
    // Login state cookie
    // ========================================================================

    pub fn save_state(&self, cookies: &Cookies, state: &str) -> Result<()> {
        let value = self.seal(state.as_bytes())?;
        cookies.add(self.cookie(STATE_COOKIE, value, STATE_MAX_AGE_SECONDS));
        Ok(())
    }

    /// Consume the login state cookie, returning the state it carried.
    pub fn take_state(&self, cookies: &Cookies) -> Option<String> {
        let cookie = cookies.get(STATE_COOKIE)?;
        let state = self
            .open(cookie.value())
            .and_then(|payload| String::from_utf8(payload).ok());

        let mut removal = Cookie::new(STATE_COOKIE, "");
        removal.set_path("/");
        cookies.remove(removal);
        state
    }

    fn cookie(&self, name: &'static str, value: String, max_age: i64) -> Cookie<'static> {
        let mut cookie = Cookie::new(name, value);
        cookie.set_http_only(true);
        cookie.set_secure(self.secure);
        cookie.set_same_site(SameSite::Lax);
        cookie.set_max_age(tower_cookies::cookie::time::Duration::seconds(max_age));
        cookie.set_path("/");
        cookie
    }
}

use serde::{Deserialize, Serialize};

/// Verified identity of the logged-in user.
///
/// Produced once per login from the ID token and embedded in the session;
/// never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IdentityClaims {
    pub subject: String,
    /// `user@domain`, `DOMAIN\user` or a bare name
    pub account_name: String,
    pub display_name: String,
    pub email: String,
}

impl IdentityClaims {
    pub fn has_account_name(&self) -> bool {
        !self.account_name.trim().is_empty()
    }
}

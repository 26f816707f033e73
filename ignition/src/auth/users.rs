use std::sync::Arc;

use super::claims::IdentityClaims;
use crate::error::{Error, Result};
use crate::tenant::TenantIdentityApi;

/// Maps verified identities to platform user ids.
#[derive(Clone)]
pub struct TenantUserResolver {
    api: Arc<dyn TenantIdentityApi>,
    origin: String,
}

impl TenantUserResolver {
    pub fn new(api: Arc<dyn TenantIdentityApi>, origin: impl Into<String>) -> Self {
        Self {
            api,
            origin: origin.into(),
        }
    }

    /// Exact `userName` lookup. `Ok(None)` means no such user.
    pub async fn resolve(&self, account_name: &str) -> Result<Option<String>> {
        if account_name.trim().is_empty() {
            return Err(Error::InvalidArgument("account name is empty".into()));
        }
        self.api.user_id_for_account_name(account_name).await
    }

    /// Create the platform user. Duplicate detection is left to the service.
    pub async fn ensure(&self, account_name: &str, email: &str) -> Result<String> {
        if account_name.trim().is_empty() {
            return Err(Error::InvalidArgument("account name is empty".into()));
        }
        let id = self
            .api
            .create_user(account_name, &self.origin, email)
            .await?;
        tracing::info!(
            "created platform user {} for {} (origin {})",
            id,
            account_name,
            self.origin
        );
        Ok(id)
    }

    pub async fn resolve_or_ensure(&self, claims: &IdentityClaims) -> Result<String> {
        match self.resolve(&claims.account_name).await? {
            Some(id) => Ok(id),
            None => self.ensure(&claims.account_name, &claims.email).await,
        }
    }
}

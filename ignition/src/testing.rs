//! In-memory stand-ins for the remote APIs.

use std::sync::Mutex;

use async_trait::async_trait;
use tenant_http_client::models::OrgRole;

use crate::auth::claims::IdentityClaims;
use crate::auth::verifier::IdentityVerifier;
use crate::error::{Error, Result};
use crate::tenant::{NewSpace, Organization, TenantIdentityApi, TenantResourceApi};

pub fn claims(account_name: &str, email: &str) -> IdentityClaims {
    IdentityClaims {
        subject: format!("sub-{account_name}"),
        account_name: account_name.to_string(),
        display_name: "Jane Doe".to_string(),
        email: email.to_string(),
    }
}

pub fn org(guid: &str, name: &str, quota: &str) -> Organization {
    Organization {
        guid: guid.to_string(),
        name: name.to_string(),
        quota_definition_guid: quota.to_string(),
        created_at: None,
        updated_at: None,
    }
}

#[derive(Default)]
pub struct FakeIdentityApi {
    pub users: Mutex<Vec<(String, String)>>,
    pub created: Mutex<Vec<(String, String, String)>>,
    pub fail: bool,
}

impl FakeIdentityApi {
    pub fn with_user(account_name: &str, id: &str) -> Self {
        let api = Self::default();
        api.users
            .lock()
            .unwrap()
            .push((account_name.to_string(), id.to_string()));
        api
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }
}

#[async_trait]
impl TenantIdentityApi for FakeIdentityApi {
    async fn user_id_for_account_name(&self, account_name: &str) -> Result<Option<String>> {
        if self.fail {
            return Err(Error::IdentityServiceUnavailable("uaa down".into()));
        }
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|(name, _)| name == account_name)
            .map(|(_, id)| id.clone()))
    }

    async fn create_user(&self, account_name: &str, origin: &str, email: &str) -> Result<String> {
        if self.fail {
            return Err(Error::IdentityServiceUnavailable("uaa down".into()));
        }
        let id = format!("created-{account_name}");
        self.created.lock().unwrap().push((
            account_name.to_string(),
            origin.to_string(),
            email.to_string(),
        ));
        self.users
            .lock()
            .unwrap()
            .push((account_name.to_string(), id.clone()));
        Ok(id)
    }
}

#[derive(Default)]
pub struct FakeResourceApi {
    pub orgs: Mutex<Vec<Organization>>,
    pub roles: Mutex<Vec<(String, String, OrgRole)>>,
    pub spaces: Mutex<Vec<NewSpace>>,
    pub calls: Mutex<usize>,
    pub fail_list: bool,
    pub fail_create: bool,
    pub fail_roles: Vec<OrgRole>,
    pub fail_space: bool,
}

impl FakeResourceApi {
    pub fn with_orgs(orgs: Vec<Organization>) -> Self {
        Self {
            orgs: Mutex::new(orgs),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    fn record_call(&self) {
        *self.calls.lock().unwrap() += 1;
    }
}

#[async_trait]
impl TenantResourceApi for FakeResourceApi {
    async fn organizations_for_user(&self, _user_id: &str) -> Result<Vec<Organization>> {
        self.record_call();
        if self.fail_list {
            return Err(Error::ResourceServiceUnavailable("cc down".into()));
        }
        Ok(self.orgs.lock().unwrap().clone())
    }

    async fn create_organization(&self, name: &str, quota_id: &str) -> Result<Organization> {
        self.record_call();
        if self.fail_create {
            return Err(Error::ResourceServiceUnavailable("name taken".into()));
        }
        let created = org(&format!("guid-{name}"), name, quota_id);
        self.orgs.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn associate_org_role(&self, org_guid: &str, user_id: &str, role: OrgRole) -> Result<()> {
        self.record_call();
        if self.fail_roles.contains(&role) {
            return Err(Error::ResourceServiceUnavailable(format!("{role} rejected")));
        }
        self.roles
            .lock()
            .unwrap()
            .push((org_guid.to_string(), user_id.to_string(), role));
        Ok(())
    }

    async fn create_space(&self, space: NewSpace) -> Result<()> {
        self.record_call();
        if self.fail_space {
            return Err(Error::ResourceServiceUnavailable("space rejected".into()));
        }
        self.spaces.lock().unwrap().push(space);
        Ok(())
    }
}

/// Accepts any token equal to `expected`, returning fixed claims.
pub struct FakeVerifier {
    pub expected: String,
    pub claims: IdentityClaims,
}

#[async_trait]
impl IdentityVerifier for FakeVerifier {
    async fn verify(&self, raw_id_token: &str) -> Result<IdentityClaims> {
        if raw_id_token == self.expected {
            Ok(self.claims.clone())
        } else {
            Err(Error::VerificationFailed("signature mismatch".into()))
        }
    }
}

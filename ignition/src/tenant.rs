//! Seams over the two tenant platform APIs and their HTTP implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tenant_http_client::apis::{configuration::Configuration, organizations_api, spaces_api, users_api};
use tenant_http_client::models::{
    CreateOrganizationRequest, CreateUserRequest, OrgRole, OrganizationResource, SpaceRequest,
};

use crate::error::{Error, Result};

/// A tenant organization as returned to clients of `/organization`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub guid: String,
    pub name: String,
    pub quota_definition_guid: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<OrganizationResource> for Organization {
    fn from(resource: OrganizationResource) -> Self {
        Organization {
            guid: resource.metadata.guid,
            name: resource.entity.name,
            quota_definition_guid: resource.entity.quota_definition_guid,
            created_at: resource.metadata.created_at,
            updated_at: resource.metadata.updated_at,
        }
    }
}

/// Parameters for the default space created with a new organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSpace {
    pub name: String,
    pub organization_guid: String,
    pub manager_guids: Vec<String>,
    pub developer_guids: Vec<String>,
    pub auditor_guids: Vec<String>,
    pub allow_ssh: bool,
}

/// Platform user directory (UAA SCIM style).
#[async_trait]
pub trait TenantIdentityApi: Send + Sync {
    /// `Ok(None)` when no user has this exact `userName`.
    async fn user_id_for_account_name(&self, account_name: &str) -> Result<Option<String>>;

    async fn create_user(&self, account_name: &str, origin: &str, email: &str) -> Result<String>;
}

/// Organization and space management (Cloud Controller v2 style).
#[async_trait]
pub trait TenantResourceApi: Send + Sync {
    /// All organizations `user_id` belongs to, in API order.
    async fn organizations_for_user(&self, user_id: &str) -> Result<Vec<Organization>>;

    async fn create_organization(&self, name: &str, quota_id: &str) -> Result<Organization>;

    async fn associate_org_role(&self, org_guid: &str, user_id: &str, role: OrgRole) -> Result<()>;

    async fn create_space(&self, space: NewSpace) -> Result<()>;
}

// ============================================================================
// HTTP implementations
// ============================================================================

pub struct HttpIdentityApi {
    configuration: Configuration,
}

impl HttpIdentityApi {
    pub fn new(configuration: Configuration) -> Self {
        Self { configuration }
    }
}

#[async_trait]
impl TenantIdentityApi for HttpIdentityApi {
    async fn user_id_for_account_name(&self, account_name: &str) -> Result<Option<String>> {
        let user = users_api::get_user_by_username(&self.configuration, account_name)
            .await
            .map_err(|e| Error::IdentityServiceUnavailable(e.to_string()))?;
        Ok(user.map(|u| u.id))
    }

    async fn create_user(&self, account_name: &str, origin: &str, email: &str) -> Result<String> {
        let request = CreateUserRequest::new(account_name, origin, account_name, email);
        let user = users_api::create_user(&self.configuration, request)
            .await
            .map_err(|e| Error::IdentityServiceUnavailable(e.to_string()))?;

        if user.id.trim().is_empty() {
            return Err(Error::IdentityServiceUnavailable(format!(
                "created user {account_name} has no id"
            )));
        }
        Ok(user.id)
    }
}

pub struct HttpResourceApi {
    configuration: Configuration,
}

impl HttpResourceApi {
    pub fn new(configuration: Configuration) -> Self {
        Self { configuration }
    }
}

#[async_trait]
impl TenantResourceApi for HttpResourceApi {
    async fn organizations_for_user(&self, user_id: &str) -> Result<Vec<Organization>> {
        let organizations =
            organizations_api::list_organizations_for_user(&self.configuration, user_id)
                .await
                .map_err(|e| Error::ResourceServiceUnavailable(e.to_string()))?;
        Ok(organizations.into_iter().map(Organization::from).collect())
    }

    async fn create_organization(&self, name: &str, quota_id: &str) -> Result<Organization> {
        let request = CreateOrganizationRequest::new(name.to_string(), quota_id);
        let organization = organizations_api::create_organization(&self.configuration, request)
            .await
            .map_err(|e| Error::ResourceServiceUnavailable(e.to_string()))?;
        Ok(organization.into())
    }

    async fn associate_org_role(&self, org_guid: &str, user_id: &str, role: OrgRole) -> Result<()> {
        organizations_api::associate_organization_role(&self.configuration, org_guid, user_id, role)
            .await
            .map_err(|e| Error::ResourceServiceUnavailable(e.to_string()))
    }

    async fn create_space(&self, space: NewSpace) -> Result<()> {
        let request = SpaceRequest {
            name: space.name,
            organization_guid: space.organization_guid,
            manager_guids: space.manager_guids,
            developer_guids: space.developer_guids,
            auditor_guids: space.auditor_guids,
            allow_ssh: space.allow_ssh,
        };
        spaces_api::create_space(&self.configuration, request)
            .await
            .map(|_| ())
            .map_err(|e| Error::ResourceServiceUnavailable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, routing::post};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn configuration(base_path: String) -> Configuration {
        Configuration {
            base_path,
            ..Configuration::new()
        }
    }

    #[tokio::test]
    async fn test_create_organization_maps_resource() {
        let router = Router::new().route(
            "/v2/organizations",
            post(|| async {
                (
                    StatusCode::CREATED,
                    Json(serde_json::json!({
                        "metadata": {"guid": "org-guid", "created_at": "2018-03-01T10:00:00Z"},
                        "entity": {"name": "dev-jdoe", "quota_definition_guid": "quota"}
                    })),
                )
            }),
        );
        let api = HttpResourceApi::new(configuration(serve(router).await));

        let org = api.create_organization("dev-jdoe", "quota").await.unwrap();
        assert_eq!(org.guid, "org-guid");
        assert_eq!(org.quota_definition_guid, "quota");
        assert!(org.created_at.is_some());
        assert!(org.updated_at.is_none());
    }

    #[tokio::test]
    async fn test_transport_failure_is_unavailable() {
        let router = Router::new().route(
            "/v2/spaces",
            post(|| async { (StatusCode::BAD_GATEWAY, "down") }),
        );
        let api = HttpResourceApi::new(configuration(serve(router).await));

        let err = api
            .create_space(NewSpace {
                name: "development".to_string(),
                organization_guid: "org".to_string(),
                manager_guids: vec![],
                developer_guids: vec![],
                auditor_guids: vec![],
                allow_ssh: true,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ResourceServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_identity_lookup_failure_is_unavailable() {
        let api = HttpIdentityApi::new(configuration("http://127.0.0.1:9".to_string()));
        let err = api.user_id_for_account_name("jdoe").await.unwrap_err();
        assert!(matches!(err, Error::IdentityServiceUnavailable(_)));
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Resource metadata common to every Cloud Controller v2 entity.
#[derive(Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub guid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrganizationEntity {
    pub name: String,
    #[serde(default)]
    pub quota_definition_guid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrganizationResource {
    pub metadata: Metadata,
    pub entity: OrganizationEntity,
}

/// One page of a v2 list response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub total_results: u64,
    #[serde(default)]
    pub total_pages: u64,
    #[serde(default)]
    pub next_url: Option<String>,
    #[serde(default = "Vec::new")]
    pub resources: Vec<T>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreateOrganizationRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quota_definition_guid: Option<String>,
}

impl CreateOrganizationRequest {
    pub fn new(name: String, quota_definition_guid: &str) -> CreateOrganizationRequest {
        let quota = quota_definition_guid.trim();
        CreateOrganizationRequest {
            name,
            quota_definition_guid: (!quota.is_empty()).then(|| quota.to_string()),
        }
    }
}

/// Organization-level roles that can be associated with a user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrgRole {
    User,
    Manager,
    Auditor,
}

impl OrgRole {
    pub fn path_segment(self) -> &'static str {
        match self {
            OrgRole::User => "users",
            OrgRole::Manager => "managers",
            OrgRole::Auditor => "auditors",
        }
    }
}

impl std::fmt::Display for OrgRole {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            OrgRole::User => write!(f, "org-user"),
            OrgRole::Manager => write!(f, "org-manager"),
            OrgRole::Auditor => write!(f, "org-auditor"),
        }
    }
}

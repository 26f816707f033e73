use serde::{Deserialize, Serialize};

use super::Metadata;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpaceRequest {
    pub name: String,
    pub organization_guid: String,
    #[serde(default)]
    pub manager_guids: Vec<String>,
    #[serde(default)]
    pub developer_guids: Vec<String>,
    #[serde(default)]
    pub auditor_guids: Vec<String>,
    #[serde(default)]
    pub allow_ssh: bool,
}

#[derive(Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpaceEntity {
    pub name: String,
    #[serde(default)]
    pub organization_guid: String,
    #[serde(default)]
    pub allow_ssh: bool,
}

#[derive(Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpaceResource {
    pub metadata: Metadata,
    pub entity: SpaceEntity,
}

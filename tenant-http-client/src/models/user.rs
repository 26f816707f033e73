use serde::{Deserialize, Serialize};

/// A SCIM user record as returned by the UAA `/Users` endpoints.
#[derive(Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimUser {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default)]
    pub emails: Vec<ScimEmail>,
}

#[derive(Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScimEmail {
    pub value: String,
    #[serde(default)]
    pub primary: bool,
}

#[derive(Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimUserList {
    #[serde(default)]
    pub resources: Vec<ScimUser>,
    #[serde(default)]
    pub total_results: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub user_name: String,
    pub origin: String,
    pub external_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub emails: Vec<ScimEmail>,
}

impl CreateUserRequest {
    pub fn new(user_name: &str, origin: &str, external_id: &str, email: &str) -> CreateUserRequest {
        let emails = if email.trim().is_empty() {
            Vec::new()
        } else {
            vec![ScimEmail {
                value: email.to_string(),
                primary: true,
            }]
        };
        CreateUserRequest {
            user_name: user_name.to_string(),
            origin: origin.to_string(),
            external_id: external_id.to_string(),
            emails,
        }
    }
}

use std::collections::HashSet;

use super::{Error, authorized, configuration, endpoint, read_empty, read_json};
use crate::models::{CreateOrganizationRequest, OrgRole, OrganizationResource, Page};

/// List every organization `user_guid` is a member of, following `next_url`
/// until the last page. A `next_url` that was already fetched ends the walk.
pub async fn list_organizations_for_user(
    configuration: &configuration::Configuration,
    user_guid: &str,
) -> Result<Vec<OrganizationResource>, Error> {
    let mut url = endpoint(configuration, "/v2/organizations")?;
    url.query_pairs_mut()
        .append_pair("q", &format!("user_guid:{user_guid}"));

    let mut organizations = Vec::new();
    let mut visited = HashSet::new();
    let mut next = Some(url);
    while let Some(url) = next.take() {
        visited.insert(url.clone());
        let request = authorized(configuration, configuration.client.get(url.clone())).await?;
        let page: Page<OrganizationResource> = read_json(request.send().await?).await?;
        organizations.extend(page.resources);

        if let Some(next_url) = page.next_url.filter(|n| !n.trim().is_empty()) {
            let next_url = url.join(&next_url)?;
            if visited.contains(&next_url) {
                tracing::warn!("organization listing revisits {}, stopping", next_url);
                break;
            }
            next = Some(next_url);
        }
    }

    tracing::debug!(
        "found {} organizations for user {}",
        organizations.len(),
        user_guid
    );
    Ok(organizations)
}

pub async fn create_organization(
    configuration: &configuration::Configuration,
    create_organization_request: CreateOrganizationRequest,
) -> Result<OrganizationResource, Error> {
    let url = endpoint(configuration, "/v2/organizations")?;
    let request = authorized(configuration, configuration.client.post(url)).await?;
    read_json(request.json(&create_organization_request).send().await?).await
}

/// Associate `user_guid` with `role` on the organization.
pub async fn associate_organization_role(
    configuration: &configuration::Configuration,
    organization_guid: &str,
    user_guid: &str,
    role: OrgRole,
) -> Result<(), Error> {
    let url = endpoint(
        configuration,
        &format!(
            "/v2/organizations/{}/{}/{}",
            organization_guid,
            role.path_segment(),
            user_guid
        ),
    )?;
    let request = authorized(configuration, configuration.client.put(url)).await?;
    read_empty(request.send().await?).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::test_support::serve;
    use axum::{
        Json, Router,
        extract::{Path, Query},
        http::StatusCode,
        routing::{get, put},
    };
    use std::collections::HashMap;

    fn org(guid: &str, name: &str) -> serde_json::Value {
        serde_json::json!({
            "metadata": {
                "guid": guid,
                "created_at": "2018-03-01T10:00:00Z",
                "updated_at": "2018-03-01T10:00:00Z"
            },
            "entity": {"name": name, "quota_definition_guid": "quota"}
        })
    }

    fn config(base: String) -> configuration::Configuration {
        configuration::Configuration {
            base_path: base,
            ..configuration::Configuration::new()
        }
    }

    #[tokio::test]
    async fn test_list_organizations_follows_pages() {
        let router = Router::new().route(
            "/v2/organizations",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                assert_eq!(q.get("q").map(String::as_str), Some("user_guid:user-1"));
                if q.get("page").map(String::as_str) == Some("2") {
                    Json(serde_json::json!({
                        "total_results": 2, "total_pages": 2, "next_url": null,
                        "resources": [org("org-2", "second")]
                    }))
                } else {
                    Json(serde_json::json!({
                        "total_results": 2, "total_pages": 2,
                        "next_url": "/v2/organizations?order-direction=asc&page=2&q=user_guid:user-1",
                        "resources": [org("org-1", "first")]
                    }))
                }
            }),
        );
        let config = config(serve(router).await);

        let orgs = list_organizations_for_user(&config, "user-1").await.unwrap();
        let names: Vec<_> = orgs.iter().map(|o| o.entity.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert!(orgs[0].metadata.created_at.is_some());
    }

    #[tokio::test]
    async fn test_list_organizations_stops_on_page_cycle() {
        let router = Router::new().route(
            "/v2/organizations",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                let (guid, next) = match q.get("page").map(String::as_str) {
                    Some("2") => ("org-2", "/v2/organizations?page=1&q=user_guid:user-1"),
                    _ => ("org-1", "/v2/organizations?page=2&q=user_guid:user-1"),
                };
                Json(serde_json::json!({
                    "total_results": 2, "total_pages": 2, "next_url": next,
                    "resources": [org(guid, guid)]
                }))
            }),
        );
        let config = config(serve(router).await);

        let orgs = list_organizations_for_user(&config, "user-1").await.unwrap();
        let guids: Vec<_> = orgs.iter().map(|o| o.metadata.guid.as_str()).collect();
        assert_eq!(guids, vec!["org-1", "org-2", "org-1"]);
    }

    #[tokio::test]
    async fn test_associate_role_uses_role_path() {
        let router = Router::new().route(
            "/v2/organizations/{org}/{role}/{user}",
            put(
                |Path((org, role, user)): Path<(String, String, String)>| async move {
                    if org == "org-1" && role == "managers" && user == "user-1" {
                        (StatusCode::CREATED, Json(org_json()))
                    } else {
                        (StatusCode::NOT_FOUND, Json(serde_json::json!({})))
                    }
                },
            ),
        );
        let config = config(serve(router).await);

        associate_organization_role(&config, "org-1", "user-1", OrgRole::Manager)
            .await
            .unwrap();
        let err = associate_organization_role(&config, "org-1", "user-1", OrgRole::Auditor)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(reqwest::StatusCode::NOT_FOUND));
    }

    fn org_json() -> serde_json::Value {
        org("org-1", "first")
    }
}

use super::{Error, authorized, configuration, endpoint, read_json};
use crate::models::{CreateUserRequest, ScimUser, ScimUserList};

/// Look up a user by exact `userName`. `Ok(None)` when the search matches nobody.
pub async fn get_user_by_username(
    configuration: &configuration::Configuration,
    username: &str,
) -> Result<Option<ScimUser>, Error> {
    let mut url = endpoint(configuration, "/Users")?;
    url.query_pairs_mut().append_pair(
        "filter",
        &format!("userName eq \"{}\"", username.replace('"', "\\\"")),
    );

    let request = authorized(configuration, configuration.client.get(url)).await?;
    let list: ScimUserList = read_json(request.send().await?).await?;

    Ok(list
        .resources
        .into_iter()
        .find(|user| !user.id.trim().is_empty()))
}

/// Create a user; returns the record the server stored, including its id.
pub async fn create_user(
    configuration: &configuration::Configuration,
    create_user_request: CreateUserRequest,
) -> Result<ScimUser, Error> {
    let url = endpoint(configuration, "/Users")?;
    let request = authorized(configuration, configuration.client.post(url)).await?;
    read_json(request.json(&create_user_request).send().await?).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::test_support::serve;
    use axum::{Json, Router, extract::Query, http::StatusCode, routing::get};
    use std::collections::HashMap;

    fn config(base: String) -> configuration::Configuration {
        configuration::Configuration {
            base_path: base,
            bearer_access_token: Some("token".to_string()),
            ..configuration::Configuration::new()
        }
    }

    #[tokio::test]
    async fn test_get_user_by_username() {
        let router = Router::new().route(
            "/Users",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                let filter = q.get("filter").cloned().unwrap_or_default();
                if filter == "userName eq \"jdoe@example.com\"" {
                    Json(serde_json::json!({
                        "resources": [{"id": "user-guid", "userName": "jdoe@example.com"}],
                        "totalResults": 1
                    }))
                } else {
                    Json(serde_json::json!({"resources": [], "totalResults": 0}))
                }
            })
            .post(|Json(body): Json<CreateUserRequest>| async move {
                (
                    StatusCode::CREATED,
                    Json(serde_json::json!({
                        "id": "new-guid",
                        "userName": body.user_name,
                        "origin": body.origin,
                        "externalId": body.external_id
                    })),
                )
            }),
        );
        let config = config(serve(router).await);

        let found = get_user_by_username(&config, "jdoe@example.com")
            .await
            .unwrap();
        assert_eq!(found.map(|u| u.id), Some("user-guid".to_string()));

        let missing = get_user_by_username(&config, "nobody").await.unwrap();
        assert!(missing.is_none());

        let created = create_user(
            &config,
            CreateUserRequest::new("nobody", "okta", "nobody", "nobody@example.com"),
        )
        .await
        .unwrap();
        assert_eq!(created.id, "new-guid");
        assert_eq!(created.origin.as_deref(), Some("okta"));
    }

    #[tokio::test]
    async fn test_error_status_is_surfaced() {
        let router = Router::new().route(
            "/Users",
            get(|| async { (StatusCode::UNAUTHORIZED, "denied") }),
        );
        let config = config(serve(router).await);

        let err = get_user_by_username(&config, "jdoe").await.unwrap_err();
        assert_eq!(err.status(), Some(reqwest::StatusCode::UNAUTHORIZED));
    }
}

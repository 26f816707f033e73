use axum::{Json, Router, http::StatusCode, middleware, routing::get};
use serde_json::{Value, json};
use tower_cookies::CookieManagerLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{self, login, profile};
use crate::context::Ctx;
use crate::organization::handler;

/// Create all routes for the application
pub fn create_routes(ctx: Ctx) -> Router {
    // Routes that require a valid, authorized session
    let protected_routes = Router::new()
        .route("/profile", get(profile::get_profile))
        .route_layer(middleware::from_fn_with_state(ctx.clone(), auth::authorize));

    // Routes that read the session; `/organization` does its own checks
    let session_routes = Router::new()
        .route("/organization", get(handler::get_organization))
        .merge(protected_routes)
        .route_layer(middleware::from_fn_with_state(
            ctx.clone(),
            auth::populate_session,
        ));

    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/login", get(login::login))
        .route("/oauth2", get(login::callback))
        .route("/logout", get(login::logout));

    public_routes
        .merge(session_routes)
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

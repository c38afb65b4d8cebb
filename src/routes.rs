//! HTTP router.

use crate::auth::{api as auth_api, require_token, AuthState};
use crate::middleware::request_logging;
use axum::{
    middleware,
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

async fn root() -> &'static str {
    "Hello world!"
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Build the full application router.
pub fn app_router(state: AuthState) -> Router {
    let public_routes = Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/users/signup", post(auth_api::signup))
        .route("/users/login", post(auth_api::login))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/users/me", get(auth_api::get_current_user))
        .route("/users/all", get(auth_api::list_users))
        .route(
            "/users/:id",
            patch(auth_api::update_user).delete(auth_api::delete_user),
        )
        .route_layer(middleware::from_fn(require_token))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(middleware::from_fn(request_logging))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

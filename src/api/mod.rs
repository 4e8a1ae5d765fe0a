//! REST API: router assembly and shared application state.
//!
//! Reads are public; every mutating route sits behind the bearer-token
//! middleware. Ownership checks happen inside handlers, after the target
//! resource has been confirmed to exist.

pub mod auth;
pub mod posts;
pub mod users;

use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post, put};
use axum::{Router, middleware};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{TokenService, require_auth};
use crate::store::Store;

/// Shared application state, constructed once at startup.
///
/// Both members are immutable after construction; requests never branch on
/// which storage backend sits behind the trait object.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: Arc<TokenService>,
}

/// Assemble the full application router.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health_check))
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/posts", get(posts::list))
        .route("/posts/count", get(posts::count))
        .route("/posts/{id}", get(posts::get_one))
        .route("/users/count", get(users::count))
        .route("/users/{id}", get(users::get_one));

    let protected = Router::new()
        .route("/posts", post(posts::create))
        .route("/posts/{id}", put(posts::update).delete(posts::remove))
        .route("/users/{id}", put(users::update).delete(users::remove))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    public
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn health_check() -> Result<Json<Value>, StatusCode> {
    Ok(Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

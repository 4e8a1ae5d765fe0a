// Core modules
pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod ownership;
pub mod store;
pub mod types;

// Re-export key types and functions
pub use api::{AppState, router};
pub use auth::TokenService;
pub use config::{
    AuthConfig, DEFAULT_TOKEN_LIFETIME_MINUTES, DocumentConfig, RelationalConfig, StorageBackend,
};
pub use error::ApiError;
pub use store::{DocumentStore, RelationalStore, Store};

use anyhow::Result;
use axum::Router;
use std::sync::Arc;

/// Convenience function to create a fully configured application router.
///
/// Connects the selected storage backend (one adapter per process, chosen
/// here and never re-branched per request), builds the token service, and
/// assembles the router.
pub async fn create_app(
    backend: StorageBackend,
    document: DocumentConfig,
    relational: RelationalConfig,
    auth: AuthConfig,
) -> Result<Router> {
    let store: Arc<dyn Store> = match backend {
        StorageBackend::Document => Arc::new(DocumentStore::connect(document).await?),
        StorageBackend::Relational => Arc::new(RelationalStore::connect(relational).await?),
    };

    let tokens = Arc::new(TokenService::new(
        &auth.jwt_secret,
        auth.token_lifetime_minutes,
    ));

    Ok(router(AppState { store, tokens }))
}

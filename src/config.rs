use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::env;

/// Which storage adapter backs the API for this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackend {
    /// SurrealDB document store
    Document,
    /// PostgreSQL relational store
    Relational,
}

/// Connection settings for the SurrealDB document store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConfig {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            url: env::var("SURREALDB_URL").unwrap_or_else(|_| "memory".to_string()),
            namespace: env::var("SURREALDB_NAMESPACE").unwrap_or_else(|_| "blogify".to_string()),
            database: env::var("SURREALDB_DATABASE").unwrap_or_else(|_| "content".to_string()),
            username: env::var("SURREALDB_USERNAME").ok(),
            password: env::var("SURREALDB_PASSWORD").ok(),
        }
    }
}

/// Connection settings for the PostgreSQL relational store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationalConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for RelationalConfig {
    fn default() -> Self {
        Self {
            url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/blogify".to_string()),
            max_connections: 10,
        }
    }
}

/// Token-signing settings.
///
/// The secret has no baked-in default: it must come from the environment or
/// the command line, otherwise startup fails.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_lifetime_minutes: i64,
}

/// Default bearer-token lifetime: 7 days, expressed in minutes.
pub const DEFAULT_TOKEN_LIFETIME_MINUTES: i64 = 10080;

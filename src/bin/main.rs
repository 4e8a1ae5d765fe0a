use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

use blogify::{
    AuthConfig, DEFAULT_TOKEN_LIFETIME_MINUTES, DocumentConfig, DocumentStore, RelationalConfig,
    RelationalStore, StorageBackend, create_app,
};

#[derive(Parser)]
#[command(name = "blogify")]
#[command(about = "Multi-tenant blog content API with pluggable storage")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Bind address, e.g. 0.0.0.0:8000
        #[arg(long, default_value = "0.0.0.0:8000")]
        bind: String,
        /// Storage backend to run against
        #[arg(long, value_enum, default_value = "document")]
        backend: StorageBackend,
        /// SurrealDB endpoint (document backend)
        #[arg(long, env = "SURREALDB_URL", default_value = "memory")]
        surreal_url: String,
        /// PostgreSQL connection string (relational backend)
        #[arg(
            long,
            env = "DATABASE_URL",
            default_value = "postgres://localhost/blogify"
        )]
        postgres_url: String,
        /// Secret used to sign and verify bearer tokens
        #[arg(long, env = "JWT_SECRET")]
        jwt_secret: String,
        /// Token lifetime in minutes
        #[arg(long, env = "JWT_EXPIRE_MINUTES", default_value_t = DEFAULT_TOKEN_LIFETIME_MINUTES)]
        token_lifetime_minutes: i64,
    },
    /// Initialize the storage schema and exit
    Init {
        #[arg(long, value_enum, default_value = "document")]
        backend: StorageBackend,
        #[arg(long, env = "SURREALDB_URL", default_value = "memory")]
        surreal_url: String,
        #[arg(
            long,
            env = "DATABASE_URL",
            default_value = "postgres://localhost/blogify"
        )]
        postgres_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("blogify=info".parse()?))
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            bind,
            backend,
            surreal_url,
            postgres_url,
            jwt_secret,
            token_lifetime_minutes,
        } => {
            let document = DocumentConfig {
                url: surreal_url,
                ..Default::default()
            };
            let relational = RelationalConfig {
                url: postgres_url,
                ..Default::default()
            };
            let auth = AuthConfig {
                jwt_secret,
                token_lifetime_minutes,
            };

            let app = create_app(backend, document, relational, auth).await?;

            let listener = tokio::net::TcpListener::bind(&bind).await?;
            info!("listening on http://{}", bind);
            axum::serve(listener, app).await?;
        }
        Commands::Init {
            backend,
            surreal_url,
            postgres_url,
        } => {
            // Connecting runs the idempotent schema bootstrap.
            match backend {
                StorageBackend::Document => {
                    let config = DocumentConfig {
                        url: surreal_url,
                        ..Default::default()
                    };
                    DocumentStore::connect(config).await?;
                }
                StorageBackend::Relational => {
                    let config = RelationalConfig {
                        url: postgres_url,
                        ..Default::default()
                    };
                    RelationalStore::connect(config).await?;
                }
            }
            println!("Storage schema initialized");
        }
    }

    Ok(())
}

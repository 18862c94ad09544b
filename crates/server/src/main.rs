mod error;
mod routes;

use std::sync::Arc;

use anyhow::Context;
use axum::{Router, extract::DefaultBodyLimit};
use db::DBService;
use services::services::{
    content::{ContentStore, SqliteContentStore},
    storage::{LocalObjectStore, ObjectStore},
};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Shared handles for the route handlers.
#[derive(Clone)]
pub struct AppState {
    pub content: Arc<dyn ContentStore>,
    pub store: Arc<dyn ObjectStore>,
}

struct ServerConfig {
    host: String,
    port: u16,
    database_url: String,
    storage_root: String,
    public_storage_base: String,
}

impl ServerConfig {
    fn from_env() -> anyhow::Result<Self> {
        let port = match std::env::var("PORT") {
            Ok(port) => port.parse().context("PORT is not a valid port number")?,
            Err(_) => 3001,
        };
        Ok(Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port,
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:content.db".to_string()),
            storage_root: std::env::var("STORAGE_ROOT").unwrap_or_else(|_| "storage".to_string()),
            public_storage_base: std::env::var("PUBLIC_STORAGE_BASE")
                .unwrap_or_else(|_| "/storage".to_string()),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    let db = DBService::new(&config.database_url)
        .await
        .context("failed to open database")?;
    let store = Arc::new(LocalObjectStore::new(
        config.storage_root.clone(),
        config.public_storage_base.clone(),
    ));

    let state = AppState {
        content: Arc::new(SqliteContentStore::new(db.pool.clone())),
        store,
    };

    let app = Router::new()
        .nest("/api", routes::router())
        .nest_service("/storage", ServeDir::new(&config.storage_root))
        // multipart submits carry files up to the 5 MB per-file cap
        .layer(DefaultBodyLimit::max(32 * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "content service listening");
    axum::serve(listener, app).await?;

    Ok(())
}

//! Standup Sync Server
//!
//! Stores work items in SQLite and serves the initial-load, commit and team
//! endpoints the Standup clients sync against.
//!
//! # Configuration
//!
//! Environment variables:
//! - `STANDUP_PORT`: Port to listen on (default: 8080)
//! - `STANDUP_DATA_DIR`: Directory holding the database (default: ~/.local/share/standup-server)
//! - `STANDUP_CONFIG`: Path to config file (default: ~/.config/standup-server/config.yaml)
//!
//! # Config File Format
//!
//! ```yaml
//! api_keys:
//!   - key: "your-secret-key-here"
//!     user_id: "alice"
//!     group_id: "platform-team"
//! ```
//!
//! # Endpoints
//!
//! - `GET /health`: Health check endpoint (no auth required)
//! - `GET /me`: Returns current user info
//! - `GET /work-items?date=YYYY-MM-DD`: The caller's work items for a day
//! - `POST /work-items/commit`: Apply added, updated and deleted work items
//! - `GET /team/work-items?date=YYYY-MM-DD`: The caller's group's work items

mod server;

use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use server::{ApiKeyStore, AppState, Config, WorkItemStore};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "standup_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();

    tracing::info!("Data directory: {}", config.data_dir.display());
    tracing::info!("Config file: {}", config.config_path.display());

    let store = WorkItemStore::open(&config.database_path()).await?;
    let api_keys = Arc::new(ApiKeyStore::load(&config.config_path));

    let app = server::router(AppState { api_keys, store });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

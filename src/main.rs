//! Ships server
//!
//! Serves the ships API over HTTP with the storage backend picked on the
//! command line.

use std::sync::Arc;

use clap::Parser;
use ships::api::{self, AppState};
use ships::constants::{
    APP_NAME, APP_VERSION, DATABASE_CONNECTIONS_COUNT_DEFAULT, DATABASE_PATH_DEFAULT,
    HTTP_BIND_ADDRESS_DEFAULT,
};
use ships::{storage, Config, ShipLogic, StorageKind, SystemClock};

// =============================================================================
// CLI
// =============================================================================

/// Ship registry server
#[derive(Parser, Debug)]
#[command(name = APP_NAME)]
#[command(about = "Owned ship records over HTTP")]
#[command(version)]
struct Cli {
    /// HTTP API bind address
    #[arg(short, long, env = "SHIPS_BIND", default_value = HTTP_BIND_ADDRESS_DEFAULT)]
    bind: String,

    /// Storage backend
    #[arg(long, env = "SHIPS_STORAGE", value_enum, default_value_t = StorageKind::Sqlite)]
    storage: StorageKind,

    /// SQLite database file (or `:memory:`)
    #[arg(long, env = "SHIPS_DATABASE_PATH", default_value = DATABASE_PATH_DEFAULT)]
    database_path: String,

    /// SQLite connection pool size
    #[arg(long, env = "SHIPS_DATABASE_CONNECTIONS", default_value_t = DATABASE_CONNECTIONS_COUNT_DEFAULT)]
    database_connections: u32,

    /// API tokens as `token:user_id` pairs, comma separated
    #[arg(long, env = "SHIPS_API_TOKENS", default_value = "", hide_env_values = true)]
    api_tokens: String,

    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file before clap reads the environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 => "info,tower_http=debug",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .init();

    tracing::info!("{} v{}", APP_NAME, APP_VERSION);

    let config = Config::new(
        &cli.bind,
        cli.storage,
        &cli.database_path,
        cli.database_connections,
        &cli.api_tokens,
    )?;
    config.storage.ensure_parent_dir()?;

    let storage = storage::open(&config.storage, Arc::new(SystemClock)).await?;
    let logic = ShipLogic::new(storage);
    let app = api::router(AppState::new(logic, config.auth));

    tracing::info!("Starting HTTP server on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
    }
    tracing::info!("Shutdown requested");
}

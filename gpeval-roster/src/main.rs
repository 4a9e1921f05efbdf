//! GP roster service (gpeval-roster) - Main entry point
//!
//! Serves presenter identity resolution and the monthly evaluation ledger over
//! HTTP, backed by the shared SQLite database in the root folder.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use gpeval_common::config::{self, RootFolderInitializer, RootFolderResolver};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gpeval_roster::{build_router, AppState};

/// Command-line arguments for gpeval-roster
#[derive(Parser, Debug)]
#[command(name = "gpeval-roster")]
#[command(about = "GP identity resolution and monthly ledger service")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "GPEVAL_PORT")]
    port: Option<u16>,

    /// Root folder holding the database
    #[arg(short, long, env = "GPEVAL_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Path to the TOML config file
    #[arg(short, long, env = "GPEVAL_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins over the config file's level
    let default_filter = config::peek_log_level(args.config.as_deref());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting gpeval-roster v{}", env!("CARGO_PKG_VERSION"));

    let toml_config = config::load_or_default(args.config.as_deref());

    let root_folder = RootFolderResolver::new()
        .with_cli_arg(args.root_folder.clone())
        .with_toml(&toml_config)
        .resolve();
    info!("Root folder: {}", root_folder.display());

    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to create root folder")?;

    let db_path = initializer.database_path();
    let db = gpeval_common::db::init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    if !toml_config.matching.cache_candidates {
        warn!("Candidate cache disabled; every resolution reloads its scope");
    }
    info!(
        fuzzy_threshold = toml_config.matching.fuzzy_threshold,
        max_batch_size = toml_config.bulk.max_batch_size,
        "Matching and bulk limits"
    );

    let state = AppState::new(db, &toml_config);
    let app = build_router(state);

    let port = args.port.unwrap_or(toml_config.server.port);
    let addr: SocketAddr = format!("{}:{}", toml_config.server.bind_address, port)
        .parse()
        .with_context(|| format!("Invalid bind address: {}", toml_config.server.bind_address))?;

    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}

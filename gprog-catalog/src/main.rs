//! gprog-catalog - Radio programming catalog service
//!
//! Serves the catalog REST API (songs, announcers, stations, announcement
//! bank, grids, generated programs and audio spots) over a single SQLite
//! database in the root folder.

use anyhow::{Context, Result};
use clap::Parser;
use gprog_catalog::pagination::PageLimits;
use gprog_catalog::{build_router_with_static, AppState};
use gprog_common::config::{CliOverrides, ServiceConfig, TomlConfig};
use std::path::PathBuf;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for gprog-catalog
#[derive(Parser, Debug)]
#[command(name = "gprog-catalog")]
#[command(about = "Radio programming catalog service")]
#[command(version)]
struct Args {
    /// Root folder holding the database
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind
    #[arg(long)]
    bind_address: Option<String>,

    /// Directory of static web assets to serve
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Insert reference styles, categories, announcers and stations
    #[arg(long)]
    seed: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = TomlConfig::load_default();
    let config = ServiceConfig::resolve(
        CliOverrides {
            root_folder: args.root_folder,
            bind_address: args.bind_address,
            port: args.port,
            static_dir: args.static_dir,
        },
        toml_config,
    )
    .context("Failed to resolve configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting gprog-catalog {} ({}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE"),
    );

    config
        .ensure_root_folder()
        .context("Failed to initialize root folder")?;

    let db_path = config.database_path();
    info!("Database: {}", db_path.display());
    let pool = gprog_common::db::init_database(&db_path)
        .await
        .context("Failed to open database")?;

    if args.seed {
        let report = gprog_common::db::seed_reference_data(&pool).await?;
        if report.is_empty() {
            info!("Reference data already present; seeding skipped");
        } else {
            info!(
                "Seeded {} styles, {} categories, {} announcers, {} stations",
                report.styles, report.categories, report.announcers, report.stations
            );
        }
    }

    let state = AppState::new(pool).with_page_limits(PageLimits {
        default_size: config.default_page_size,
        max_size: config.max_page_size,
    });

    if let Some(dir) = &config.static_dir {
        if dir.is_dir() {
            info!("Serving static files from {}", dir.display());
        } else {
            warn!("Static directory {} does not exist", dir.display());
        }
    }
    let app = build_router_with_static(state, config.static_dir.clone());

    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

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
            Ok(mut stream) => {
                stream.recv().await;
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
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}

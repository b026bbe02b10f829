//! Segue Player (segue-player) - Main entry point
//!
//! Wires the SQLite settings store and catalog, the clock-driven player
//! resource and the HTTP control API around the playback engine.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use segue_player::api::{self, AppContext};
use segue_player::config::{Args, Config};
use segue_player::db::{self, SqliteCatalog, SqliteSettings};
use segue_player::playback::services::LocalFocusArbiter;
use segue_player::playback::types::EngineConfig;
use segue_player::playback::{spawn_engine, EngineServices, PlaybackEngine, VirtualPlayerFactory};
use segue_player::SharedState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "segue_player=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = Config::resolve(&args).context("Failed to resolve configuration")?;

    info!("Starting Segue Player v{}", env!("CARGO_PKG_VERSION"));
    config.log_summary();

    let pool = db::open_database(&config.data_folder)
        .await
        .context("Failed to open database")?;
    db::initialize_database(&pool)
        .await
        .context("Failed to initialize database")?;

    let state = Arc::new(SharedState::new());
    let services = EngineServices {
        catalog: Arc::new(SqliteCatalog::new(pool.clone(), config.library_root.clone())),
        settings: Arc::new(SqliteSettings::new(pool.clone())),
        focus: Arc::new(LocalFocusArbiter::new()),
        presenter: state.clone(),
        players: Arc::new(VirtualPlayerFactory::default()),
    };

    let (mut engine, slot_events) = PlaybackEngine::new(services, EngineConfig::default());
    engine
        .start()
        .await
        .context("Failed to start playback engine")?;
    let (handle, engine_task) = spawn_engine(engine, slot_events);
    info!("Playback engine running");

    let ctx = AppContext {
        state,
        engine: handle.clone(),
    };
    api::run(config.port, ctx, shutdown_signal())
        .await
        .context("HTTP server error")?;

    // Persist the queue before the pool goes away
    if let Err(e) = handle.shutdown().await {
        warn!("Engine shutdown: {}", e);
    }
    if let Err(e) = engine_task.await {
        warn!("Engine task ended abnormally: {}", e);
    }
    pool.close().await;

    info!("Shutdown complete");
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
            Ok(mut sigterm) => {
                sigterm.recv().await;
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

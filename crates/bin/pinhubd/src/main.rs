//! # pinhubd — pinhub daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Install the `tracing` subscriber
//! - Initialize the `SQLite` connection pool and run migrations
//! - Bind the configured GPIO backend and load the house into the registry
//! - Start the schedule watcher and the HTTP server
//! - Handle graceful shutdown (SIGTERM/SIGINT): stop the watcher and release every pin
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use pinhub_adapter_http_axum::router;
use pinhub_adapter_http_axum::state::AppState;
use pinhub_adapter_storage_sqlite_sqlx::{Config as StorageConfig, SqliteHouseStore};
use pinhub_app::event_bus::InProcessEventBus;
use pinhub_app::output_manager::OutputManager;
use pinhub_app::ports::SystemClock;
use pinhub_app::services::house_service::HouseService;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    init_tracing(&config.logging.filter);

    // Database
    let db = StorageConfig {
        database_url: config.database_url().to_string(),
    }
    .build()
    .await
    .context("failed to open database")?;
    let store = Arc::new(SqliteHouseStore::new(db.pool().clone()));
    if config.house.create_if_missing {
        store
            .ensure_house(&config.house.name)
            .await
            .context("failed to create house")?;
    }

    // Output lines
    let gpio = config.gpio.build();
    tracing::info!(
        backend = ?gpio.backend(),
        first_pin = config.gpio.first_pin,
        last_pin = config.gpio.last_pin,
        "gpio backend ready"
    );

    // Controller
    let event_bus = Arc::new(InProcessEventBus::new(config.events.capacity));
    let service = Arc::new(
        HouseService::start(
            store,
            OutputManager::new(gpio),
            event_bus,
            SystemClock,
            config.watcher(),
        )
        .await
        .context("failed to start controller")?,
    );

    // HTTP
    let app = router::build(AppState::from_arc(Arc::clone(&service)));
    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(%bind_addr, "pinhubd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server failed")?;

    service.shutdown();
    Ok(())
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|err| {
        eprintln!("invalid log filter {filter:?} ({err}), falling back to info");
        EnvFilter::new("info")
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(%err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown requested");
}

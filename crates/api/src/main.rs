use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use domain::services::{LedgerStore, MemoryLedgerStore};
use meal_checkin_api::app::{create_app, AppState};
use meal_checkin_api::config::{Config, StorageBackend};
use meal_checkin_api::middleware::{init_metrics, logging::init_logging};
use meal_checkin_api::services::HttpQrRenderer;
use persistence::PgLedgerStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    init_logging(&config.logging).context("failed to initialize logging")?;
    init_metrics().context("failed to initialize metrics")?;

    info!("Starting meal check-in service v{}", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn LedgerStore> = match config.storage.backend {
        StorageBackend::Postgres => {
            let pool = persistence::db::create_pool(&config.database.pool_settings()).await?;
            persistence::db::run_migrations(&pool).await?;
            Arc::new(PgLedgerStore::connect(pool).await?)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory ledger; data is lost on restart");
            Arc::new(MemoryLedgerStore::new())
        }
    };
    info!(backend = store.backend(), "Ledger store ready");

    let qr_renderer = Arc::new(HttpQrRenderer::new(&config.qr)?);
    let addr = config.socket_addr()?;
    let state = AppState::new(config, store, qr_renderer)?;
    let app = create_app(state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}

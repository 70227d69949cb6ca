//! Vaultline API Server
//!
//! Main entry point for the ledger and settlement service.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use vaultline_api::{AppState, create_router};
use vaultline_core::provider::HttpPaymentProvider;
use vaultline_db::{SeaLedgerStore, connect};
use vaultline_shared::{AppConfig, JwtService};

fn init_tracing(json: bool) {
    let registry = tracing_subscriber::registry().with(
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "vaultline=debug,tower_http=debug".into()),
    );
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_tracing(config.log.json);

    let db = connect(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await?;
    info!("Connected to database");

    let provider = HttpPaymentProvider::new(&config.provider)?;
    info!(provider = ?config.provider, "Payment provider configured");

    let state = AppState::new(
        Arc::new(SeaLedgerStore::new(db)),
        Arc::new(provider),
        JwtService::new(&config.jwt.secret),
        &config.settlement,
        config.provider.timeout(),
    )?;
    info!(
        fee_rate = %config.settlement.fee_rate,
        currency = %config.settlement.currency,
        "Settlement policy loaded"
    );

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

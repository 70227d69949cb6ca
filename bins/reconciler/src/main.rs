//! Reconciliation worker.
//!
//! On a fixed interval, turns abandoned pending settlements into exceptions,
//! then asks the provider what happened to the transfers each open exception
//! issued.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use vaultline_core::provider::HttpPaymentProvider;
use vaultline_core::reconciliation::ReconciliationWorker;
use vaultline_db::{SeaLedgerStore, connect};
use vaultline_shared::AppConfig;

fn init_tracing(json: bool) {
    let registry = tracing_subscriber::registry().with(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "vaultline=debug".into()),
    );
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_tracing(config.log.json);

    let db = connect(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await?;
    let provider = HttpPaymentProvider::new(&config.provider)?;
    let schedule = &config.reconciliation;
    let worker = ReconciliationWorker::new(Arc::new(SeaLedgerStore::new(db)), Arc::new(provider))
        .with_call_timeout(config.provider.timeout())
        .with_stale_after(schedule.stale_after());

    let mut ticker = tokio::time::interval(Duration::from_secs(schedule.interval_secs.max(1)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    info!(
        interval_secs = schedule.interval_secs,
        batch_size = schedule.batch_size,
        stale_after_secs = schedule.stale_after_secs,
        "Reconciler started"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                return Ok(());
            }
        }

        match worker.run_once(schedule.batch_size).await {
            Ok(report) if report.escalated > 0 || report.interrupted > 0 => {
                warn!(?report, "Sweep found settlements needing attention");
            }
            Ok(report) => info!(?report, "Sweep finished"),
            Err(err) if err.is_retryable() => warn!(error = %err, "Sweep failed, retrying next tick"),
            Err(err) => {
                error!(error = %err, "Sweep failed");
                return Err(err.into());
            }
        }
    }
}

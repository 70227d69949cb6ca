//! Health check endpoints.

use axum::{Json, Router, routing::get};
use serde::Serialize;
use vaultline_core::ledger::LedgerStore;
use vaultline_core::provider::PaymentProvider;

use crate::AppState;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
}

/// Health check handler.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Creates health check routes.
pub fn routes<S, P>() -> Router<AppState<S, P>>
where
    S: LedgerStore + 'static,
    P: PaymentProvider + 'static,
{
    Router::new().route("/health", get(health_check))
}

//! Provider webhook ingestion.
//!
//! The raw body is verified against the signature header before it is
//! parsed, so the handler takes bytes rather than JSON.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::HeaderMap,
    routing::post,
};
use vaultline_core::ledger::LedgerStore;
use vaultline_core::provider::PaymentProvider;
use vaultline_core::webhook::ReconciliationResult;

use crate::AppState;
use crate::error::ApiError;

/// Header carrying the hex HMAC-SHA512 of the body.
pub const SIGNATURE_HEADER: &str = "x-budpay-signature";

const MAX_WEBHOOK_BYTES: usize = 64 * 1024;

/// Creates the webhook routes.
pub fn routes<S, P>() -> Router<AppState<S, P>>
where
    S: LedgerStore + 'static,
    P: PaymentProvider + 'static,
{
    Router::new()
        .route("/webhooks/provider", post(receive_deposit::<S, P>))
        .layer(DefaultBodyLimit::max(MAX_WEBHOOK_BYTES))
}

/// POST /webhooks/provider
async fn receive_deposit<S, P>(
    State(state): State<AppState<S, P>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ReconciliationResult>, ApiError>
where
    S: LedgerStore + 'static,
    P: PaymentProvider + 'static,
{
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let result = state.webhooks.reconcile_webhook(signature, &body).await?;
    Ok(Json(result))
}

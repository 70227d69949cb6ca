//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes for payments, webhooks, and transaction history
//! - Bearer-token authentication middleware
//! - The JSON error envelope every failure is rendered in

pub mod error;
pub mod middleware;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use vaultline_core::ledger::{FeePolicy, LedgerError, LedgerService, LedgerStore};
use vaultline_core::provider::PaymentProvider;
use vaultline_core::settlement::SettlementOrchestrator;
use vaultline_core::webhook::WebhookReconciler;
use vaultline_shared::JwtService;
use vaultline_shared::config::SettlementConfig;

/// Application state shared across handlers.
pub struct AppState<S: LedgerStore, P: PaymentProvider> {
    /// Accounts and transaction history.
    pub ledger: Arc<LedgerService<S, P>>,
    /// Multi-leg payments.
    pub settlement: Arc<SettlementOrchestrator<S, P>>,
    /// Provider deposit notices.
    pub webhooks: Arc<WebhookReconciler<S, P>>,
    /// Verifies caller tokens.
    pub jwt_service: Arc<JwtService>,
}

impl<S: LedgerStore, P: PaymentProvider> Clone for AppState<S, P> {
    fn clone(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
            settlement: Arc::clone(&self.settlement),
            webhooks: Arc::clone(&self.webhooks),
            jwt_service: Arc::clone(&self.jwt_service),
        }
    }
}

impl<S: LedgerStore, P: PaymentProvider> AppState<S, P> {
    /// Wires the ledger services over one store and one provider.
    ///
    /// # Errors
    ///
    /// `Validation` if the configured fee rate is outside `[0, 1)`.
    pub fn new(
        store: Arc<S>,
        provider: Arc<P>,
        jwt_service: JwtService,
        settlement: &SettlementConfig,
        call_timeout: Duration,
    ) -> Result<Self, LedgerError> {
        let fees = FeePolicy::new(settlement.fee_rate)?;
        Ok(Self {
            ledger: Arc::new(LedgerService::new(
                Arc::clone(&store),
                Arc::clone(&provider),
                call_timeout,
            )),
            settlement: Arc::new(SettlementOrchestrator::new(
                Arc::clone(&store),
                Arc::clone(&provider),
                fees,
                settlement.currency,
                call_timeout,
            )),
            webhooks: Arc::new(WebhookReconciler::new(store, provider)),
            jwt_service: Arc::new(jwt_service),
        })
    }
}

/// Creates the main application router.
pub fn create_router<S, P>(state: AppState<S, P>) -> Router
where
    S: LedgerStore + 'static,
    P: PaymentProvider + 'static,
{
    Router::new()
        .nest("/api/v1", routes::api_routes(&state))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

//! Settlement Orchestrator.
//!
//! Composes multi-leg payments (buyer, recipient, platform fee) with the
//! provider transfers that physically move the money, keeping the ledger
//! consistent with the provider's outcome.

pub mod orchestrator;
pub mod types;

#[cfg(test)]
mod tests;

pub use orchestrator::SettlementOrchestrator;
pub use types::{
    ExceptionStage, ExceptionStatus, ProductPayment, SettlementException, SettlementResult,
    SubscriptionPayment,
};

//! Inbound provider notifications.

pub mod payload;
pub mod reconciler;

pub use payload::DepositNotice;
pub use reconciler::{ReconciliationResult, ReconciliationStatus, WebhookReconciler};

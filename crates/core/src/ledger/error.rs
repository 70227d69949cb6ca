//! Ledger error types.
//!
//! One variant per failure class callers must tell apart: input rejected
//! before any side effect, account state, linkage, provider, and storage
//! failures.

use rust_decimal::Decimal;
use thiserror::Error;

use super::types::TransactionStatus;
use crate::provider::ProviderError;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Input Errors ==========
    /// Malformed input: non-positive amount, bad precision, missing field.
    #[error("Validation failed: {0}")]
    Validation(String),

    // ========== Account State Errors ==========
    /// Account is locked, suspended, not fundable/withdrawable, or short of funds.
    #[error("Invalid account state: {0}")]
    InvalidState(String),

    /// No ledger account matches the lookup.
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Ledger account exists but its provider linkage (or the platform account) is missing.
    #[error("Account not configured: {0}")]
    AccountNotConfigured(String),

    /// Provider-side balance is below the requested amount.
    #[error("Insufficient funds: available {available}, required {required}")]
    InsufficientFunds {
        /// Balance reported by the provider.
        available: Decimal,
        /// Amount the operation needs.
        required: Decimal,
    },

    // ========== Webhook Errors ==========
    /// Webhook signature did not match the payload.
    #[error("Invalid webhook signature")]
    InvalidSignature,

    /// Webhook payload is missing or carries invalid fields.
    #[error("Malformed webhook: {0}")]
    MalformedWebhook(String),

    // ========== Transaction State Errors ==========
    /// Status change outside `pending -> completed | failed`.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: TransactionStatus,
        /// Requested status.
        to: TransactionStatus,
    },

    /// A transaction with this reference is already recorded for the account.
    #[error("Duplicate transaction reference: {0}")]
    DuplicateReference(String),

    /// Transaction lookup by reference or id found nothing.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    // ========== Infrastructure Errors ==========
    /// Payment provider call failed or timed out.
    #[error("Payment provider error: {0}")]
    ExternalProvider(#[from] ProviderError),

    /// Storage failure; the unit of work was rolled back.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl LedgerError {
    /// Shorthand for `Validation`.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Shorthand for `InvalidState`.
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Shorthand for `Persistence`.
    pub fn persistence(msg: impl std::fmt::Display) -> Self {
        Self::Persistence(msg.to_string())
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidState(_) => "INVALID_ACCOUNT_STATE",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::AccountNotConfigured(_) => "ACCOUNT_NOT_CONFIGURED",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::MalformedWebhook(_) => "MALFORMED_WEBHOOK",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::DuplicateReference(_) => "DUPLICATE_REFERENCE",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::ExternalProvider(_) => "EXTERNAL_PROVIDER_ERROR",
            Self::Persistence(_) => "PERSISTENCE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - rejected before any side effect
            Self::Validation(_)
            | Self::InvalidState(_)
            | Self::InsufficientFunds { .. }
            | Self::MalformedWebhook(_) => 400,

            // 401 Unauthorized
            Self::InvalidSignature => 401,

            // 404 Not Found
            Self::AccountNotFound(_) | Self::TransactionNotFound(_) => 404,

            // 409 Conflict
            Self::InvalidTransition { .. } | Self::DuplicateReference(_) => 409,

            // 500 Internal Server Error
            Self::AccountNotConfigured(_) | Self::Persistence(_) => 500,

            // 502 Bad Gateway
            Self::ExternalProvider(_) => 502,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ExternalProvider(_) | Self::Persistence(_))
    }

    /// Message safe to show to API clients.
    ///
    /// Server-side failures return a generic text; the detail stays in logs.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::ExternalProvider(_) => {
                "Payment provider unavailable, please retry later".to_string()
            }
            Self::Persistence(_) | Self::AccountNotConfigured(_) => {
                "The operation could not be completed".to_string()
            }
            other => other.to_string(),
        }
    }
}

//! Payment provider integration.
//!
//! The provider issues virtual bank accounts, reports their balances, and
//! moves money between them. The ledger only sees the narrow
//! [`PaymentProvider`] trait; [`HttpPaymentProvider`] speaks the provider's
//! REST API.

pub mod client;
pub mod error;
pub mod signature;
pub mod types;

pub use client::{HttpPaymentProvider, PaymentProvider};
pub use error::ProviderError;
pub use signature::WebhookVerifier;
pub use types::{
    CustomerProfile, TransferReceipt, TransferRequest, TransferState, VirtualAccountDetails,
};

use std::future::Future;
use std::time::Duration;

/// Runs a provider call under `deadline`; expiry becomes [`ProviderError::Timeout`].
///
/// # Errors
///
/// Whatever `call` returns, or `Timeout`.
pub async fn with_timeout<T>(
    deadline: Duration,
    call: impl Future<Output = Result<T, ProviderError>>,
) -> Result<T, ProviderError> {
    tokio::time::timeout(deadline, call)
        .await
        .map_err(|_| ProviderError::Timeout)?
}

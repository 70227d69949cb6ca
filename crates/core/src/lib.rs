//! Core ledger and settlement logic for Vaultline.
//!
//! No web framework and no database driver: persistence is reached through
//! the traits in [`ledger::store`], the payment provider through
//! [`provider::PaymentProvider`].
//!
//! # Modules
//!
//! - `ledger` - accounts, transaction legs, balance rules, history
//! - `settlement` - multi-leg product and subscription payments
//! - `webhook` - idempotent crediting from provider deposit notices
//! - `reconciliation` - sweeps settlements whose provider outcome is unknown
//! - `provider` - payment provider trait, HTTP client, webhook signatures

pub mod ledger;
pub mod provider;
pub mod reconciliation;
pub mod settlement;
pub mod webhook;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

//! Reconciliation of settlements that failed after a provider transfer was issued.

pub mod worker;

pub use worker::{Classification, ReconciliationWorker, SweepReport};

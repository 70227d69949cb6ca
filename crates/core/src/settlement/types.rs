//! Settlement inputs, results, and exception records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use vaultline_shared::types::{AccountId, ExceptionId};

use crate::ledger::TransactionRecord;

/// A buyer paying a store for a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductPayment {
    /// Buyer's ledger account.
    pub buyer_account_id: AccountId,
    /// Store's ledger account.
    pub store_account_id: AccountId,
    /// Product being paid for.
    pub product_ref: String,
    /// Gross amount charged to the buyer.
    pub amount: Decimal,
}

/// A user paying the platform for a store subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionPayment {
    /// Payer's ledger account.
    pub user_account_id: AccountId,
    /// Store the subscription is for.
    pub store_ref: String,
    /// Amount charged.
    pub amount: Decimal,
}

/// A completed settlement.
///
/// Failures are reported as `LedgerError`; by then every leg is `failed`.
#[derive(Debug, Clone, Serialize)]
pub struct SettlementResult {
    /// Reference shared by every leg.
    pub reference: String,
    /// The legs, debit first.
    pub legs: Vec<TransactionRecord>,
    /// Platform fee withheld.
    pub fee: Decimal,
    /// Amount credited to the recipient.
    pub net_amount: Decimal,
    /// Human-readable outcome.
    pub message: String,
}

/// Where a settlement broke after money may have left the buyer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionStage {
    /// A provider transfer failed or timed out after at least one was issued.
    Transfer,
    /// Every transfer went through but the ledger commit failed.
    Commit,
    /// Legs were left `pending` by a settlement that never finished.
    Interrupted,
}

impl ExceptionStage {
    /// Database/string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transfer => "transfer",
            Self::Commit => "commit",
            Self::Interrupted => "interrupted",
        }
    }
}

impl std::str::FromStr for ExceptionStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transfer" => Ok(Self::Transfer),
            "commit" => Ok(Self::Commit),
            "interrupted" => Ok(Self::Interrupted),
            _ => Err(format!("Unknown exception stage: {s}")),
        }
    }
}

/// Review state of a settlement exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExceptionStatus {
    /// Awaiting a reconciliation sweep.
    Open,
    /// Provider confirmed no money moved.
    Resolved,
    /// Provider moved money the ledger does not reflect; needs an operator.
    Escalated,
}

impl ExceptionStatus {
    /// Database/string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Resolved => "resolved",
            Self::Escalated => "escalated",
        }
    }
}

impl std::str::FromStr for ExceptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "resolved" => Ok(Self::Resolved),
            "escalated" => Ok(Self::Escalated),
            _ => Err(format!("Unknown exception status: {s}")),
        }
    }
}

/// A settlement whose provider outcome is not reflected in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementException {
    /// Exception ID.
    pub id: ExceptionId,
    /// Reference of the failed settlement.
    pub reference: String,
    /// Where it failed.
    pub stage: ExceptionStage,
    /// Error text at the time of failure.
    pub reason: String,
    /// References of transfers that were issued.
    pub transfer_references: Vec<String>,
    /// Review state.
    pub status: ExceptionStatus,
    /// Note written by the reconciliation sweep.
    pub resolution: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update.
    pub updated_at: DateTime<Utc>,
}

impl SettlementException {
    /// Creates an open exception.
    #[must_use]
    pub fn open(
        reference: impl Into<String>,
        stage: ExceptionStage,
        reason: impl Into<String>,
        transfer_references: Vec<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ExceptionId::new(),
            reference: reference.into(),
            stage,
            reason: reason.into(),
            transfer_references,
            status: ExceptionStatus::Open,
            resolution: None,
            created_at: now,
            updated_at: now,
        }
    }
}

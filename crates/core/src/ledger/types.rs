//! Ledger domain types.
//!
//! Accounts hold balances; transactions are the append-only legs that move
//! value between them. Every monetary field is a `Decimal`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use vaultline_shared::types::{AccountId, Currency, OwnerId, TransactionId, VirtualAccountId};

/// Who an account belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Wallet of an end user.
    User,
    /// Wallet receiving a store's sales.
    Store,
    /// Platform wallet collecting fees and subscriptions.
    Platform,
}

impl AccountType {
    /// Database/string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Store => "store",
            Self::Platform => "platform",
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "store" => Ok(Self::Store),
            "platform" => Ok(Self::Platform),
            _ => Err(format!("Unknown account type: {s}")),
        }
    }
}

/// A ledger account with its balance and gating flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account ID.
    pub id: AccountId,
    /// Owner (user, store owner, or platform).
    pub owner_id: OwnerId,
    /// Account type tag.
    pub account_type: AccountType,
    /// Human-readable unique key, `ACC-...`.
    pub account_key: String,
    /// Currency of the balance.
    pub currency: Currency,
    /// Current balance. Never negative.
    pub balance: Decimal,
    /// False once deactivated.
    pub is_active: bool,
    /// Whether credits are accepted.
    pub is_fundable: bool,
    /// Whether debits are allowed.
    pub is_withdrawable: bool,
    /// Suspended by compliance.
    pub is_suspended: bool,
    /// Locked by an operator.
    pub locked: bool,
    /// Why the account was locked.
    pub lock_reason: Option<String>,
    /// When the account was locked.
    pub locked_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Creates an active, fundable, withdrawable account with zero balance.
    #[must_use]
    pub fn open(
        owner_id: OwnerId,
        account_type: AccountType,
        currency: Currency,
        account_key: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AccountId::new(),
            owner_id,
            account_type,
            account_key,
            currency,
            balance: Decimal::ZERO,
            is_active: true,
            is_fundable: true,
            is_withdrawable: true,
            is_suspended: false,
            locked: false,
            lock_reason: None,
            locked_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Provider-side virtual bank account linked to a ledger account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualAccount {
    /// Link ID.
    pub id: VirtualAccountId,
    /// Owning ledger account.
    pub account_id: AccountId,
    /// NUBAN-style account number, unique.
    pub account_number: String,
    /// Name on the account.
    pub account_name: String,
    /// Issuing bank.
    pub bank_name: String,
    /// Issuing bank code.
    pub bank_code: String,
    /// Customer email.
    pub email: String,
    /// Customer phone.
    pub phone: Option<String>,
    /// Provider reference for the virtual account.
    pub provider_reference: String,
    /// Whether the link is usable.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Kind of ledger movement a transaction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Money in.
    Credit,
    /// Money out.
    Debit,
    /// Payout to an external bank account.
    Withdrawal,
    /// Buyer leg of a product purchase.
    ProductPayment,
    /// Leg of a subscription charge.
    Subscription,
    /// Platform fee leg.
    Fee,
}

impl TransactionType {
    /// All variants, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Credit,
        Self::Debit,
        Self::Withdrawal,
        Self::ProductPayment,
        Self::Subscription,
        Self::Fee,
    ];

    /// Database/string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
            Self::Withdrawal => "withdrawal",
            Self::ProductPayment => "product_payment",
            Self::Subscription => "subscription",
            Self::Fee => "fee",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Unknown transaction type: {s}"))
    }
}

/// Transaction lifecycle status.
///
/// `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Created, outcome not yet known.
    Pending,
    /// Settled.
    Completed,
    /// Abandoned; no balance effect.
    Failed,
}

impl TransactionStatus {
    /// Database/string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Returns true if no further transition is allowed.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Unknown transaction status: {s}")),
        }
    }
}

/// One persisted ledger leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Leg ID.
    pub id: TransactionId,
    /// Account the leg is booked against.
    pub account_id: AccountId,
    /// Virtual account the money arrived through, for provider credits.
    pub virtual_account_id: Option<VirtualAccountId>,
    /// Movement kind.
    pub transaction_type: TransactionType,
    /// Leg amount, always positive.
    pub amount: Decimal,
    /// Fee withheld from this leg.
    pub fee_amount: Decimal,
    /// Lifecycle status.
    pub status: TransactionStatus,
    /// Shared by every leg of one logical operation.
    pub reference: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// Set when the leg completes.
    pub completed_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last status change.
    pub updated_at: DateTime<Utc>,
}

impl TransactionRecord {
    /// Creates a pending leg.
    #[must_use]
    pub fn pending(
        account_id: AccountId,
        transaction_type: TransactionType,
        amount: Decimal,
        reference: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            account_id,
            virtual_account_id: None,
            transaction_type,
            amount,
            fee_amount: Decimal::ZERO,
            status: TransactionStatus::Pending,
            reference: reference.into(),
            description: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the withheld fee.
    #[must_use]
    pub fn with_fee(mut self, fee_amount: Decimal) -> Self {
        self.fee_amount = fee_amount;
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Links the virtual account the money moved through.
    #[must_use]
    pub fn via_virtual_account(mut self, id: VirtualAccountId) -> Self {
        self.virtual_account_id = Some(id);
        self
    }
}

/// Input for creating a single transaction record directly.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTransaction {
    /// Movement kind.
    pub transaction_type: TransactionType,
    /// Positive amount.
    pub amount: Decimal,
    /// Account the record is booked against.
    pub account_id: AccountId,
    /// Initial status.
    #[serde(default = "default_status")]
    pub status: TransactionStatus,
    /// Explicit reference; generated when absent.
    #[serde(default)]
    pub reference: Option<String>,
    /// Fee withheld.
    #[serde(default)]
    pub fee_amount: Decimal,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
}

fn default_status() -> TransactionStatus {
    TransactionStatus::Pending
}

/// History filters. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionFilter {
    /// Only this movement kind.
    #[serde(rename = "type", default)]
    pub transaction_type: Option<TransactionType>,
    /// Only this status.
    #[serde(default)]
    pub status: Option<TransactionStatus>,
    /// Created at or after.
    #[serde(default)]
    pub created_from: Option<DateTime<Utc>>,
    /// Created strictly before.
    #[serde(default)]
    pub created_to: Option<DateTime<Utc>>,
}

impl TransactionFilter {
    /// Returns true if `record` passes every set filter.
    #[must_use]
    pub fn matches(&self, record: &TransactionRecord) -> bool {
        self.transaction_type
            .is_none_or(|t| t == record.transaction_type)
            && self.status.is_none_or(|s| s == record.status)
            && self.created_from.is_none_or(|from| record.created_at >= from)
            && self.created_to.is_none_or(|to| record.created_at < to)
    }
}

/// Per-type totals of completed transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSummary {
    /// Movement kind.
    pub transaction_type: TransactionType,
    /// Number of completed legs.
    pub count: u64,
    /// Sum of leg amounts.
    pub total_amount: Decimal,
    /// Sum of fees withheld.
    pub total_fees: Decimal,
}

//! Persistence seams for the ledger.
//!
//! These traits are implemented by the db crate. Every method runs inside a
//! unit of work; nothing is visible to other callers until `commit`.

use std::future::Future;

use chrono::{DateTime, Utc};
use vaultline_shared::types::{AccountId, Currency, OwnerId, PageRequest, TransactionId};

use super::error::LedgerError;
use super::types::{
    Account, AccountType, TransactionFilter, TransactionRecord, TransactionStatus,
    TransactionSummary, VirtualAccount,
};
use crate::settlement::SettlementException;

/// Account rows and their virtual-account links.
pub trait AccountStore: Send + Sync {
    /// Plain read.
    fn find_account(
        &self,
        id: AccountId,
    ) -> impl Future<Output = Result<Option<Account>, LedgerError>> + Send;

    /// Read with a row lock held until the unit of work ends.
    fn lock_account(
        &self,
        id: AccountId,
    ) -> impl Future<Output = Result<Option<Account>, LedgerError>> + Send;

    /// The platform account for a currency.
    fn find_platform_account(
        &self,
        currency: Currency,
    ) -> impl Future<Output = Result<Option<Account>, LedgerError>> + Send;

    /// The owner's account of one type and currency.
    fn find_owner_account(
        &self,
        owner_id: OwnerId,
        account_type: AccountType,
        currency: Currency,
    ) -> impl Future<Output = Result<Option<Account>, LedgerError>> + Send;

    /// All accounts of an owner.
    fn list_owner_accounts(
        &self,
        owner_id: OwnerId,
    ) -> impl Future<Output = Result<Vec<Account>, LedgerError>> + Send;

    /// Whether an account key is taken.
    fn account_key_exists(
        &self,
        account_key: &str,
    ) -> impl Future<Output = Result<bool, LedgerError>> + Send;

    /// Inserts a new account.
    fn insert_account(
        &self,
        account: &Account,
    ) -> impl Future<Output = Result<(), LedgerError>> + Send;

    /// Writes back balance, flags, lock fields, and `updated_at`.
    fn save_account(
        &self,
        account: &Account,
    ) -> impl Future<Output = Result<(), LedgerError>> + Send;

    /// The virtual account linked to a ledger account.
    fn find_virtual_account(
        &self,
        account_id: AccountId,
    ) -> impl Future<Output = Result<Option<VirtualAccount>, LedgerError>> + Send;

    /// Lookup by provider account number.
    fn find_virtual_account_by_number(
        &self,
        account_number: &str,
    ) -> impl Future<Output = Result<Option<VirtualAccount>, LedgerError>> + Send;

    /// Inserts a virtual-account link.
    fn insert_virtual_account(
        &self,
        virtual_account: &VirtualAccount,
    ) -> impl Future<Output = Result<(), LedgerError>> + Send;
}

/// Transaction legs.
pub trait TransactionStore: Send + Sync {
    /// Inserts a leg.
    ///
    /// Fails with `DuplicateReference` if the account already has a leg with
    /// the same reference.
    fn insert_transaction(
        &self,
        record: &TransactionRecord,
    ) -> impl Future<Output = Result<(), LedgerError>> + Send;

    /// Lookup by id.
    fn find_transaction(
        &self,
        id: TransactionId,
    ) -> impl Future<Output = Result<Option<TransactionRecord>, LedgerError>> + Send;

    /// Every leg sharing `reference`, oldest first.
    fn find_by_reference(
        &self,
        reference: &str,
    ) -> impl Future<Output = Result<Vec<TransactionRecord>, LedgerError>> + Send;

    /// Whether any leg uses `reference`.
    fn reference_exists(
        &self,
        reference: &str,
    ) -> impl Future<Output = Result<bool, LedgerError>> + Send;

    /// Compare-and-set on status.
    ///
    /// Persists `status`, `completed_at`, and `updated_at` from `record` only
    /// if the stored status still equals `expected`. Returns whether a row
    /// was updated.
    fn update_status(
        &self,
        record: &TransactionRecord,
        expected: TransactionStatus,
    ) -> impl Future<Output = Result<bool, LedgerError>> + Send;

    /// Page of legs for one account, newest first, plus the total count.
    fn list_for_account(
        &self,
        account_id: AccountId,
        filter: &TransactionFilter,
        page: &PageRequest,
    ) -> impl Future<Output = Result<(Vec<TransactionRecord>, u64), LedgerError>> + Send;

    /// Page of legs across every account of an owner, newest first.
    fn list_for_owner(
        &self,
        owner_id: OwnerId,
        filter: &TransactionFilter,
        page: &PageRequest,
    ) -> impl Future<Output = Result<(Vec<TransactionRecord>, u64), LedgerError>> + Send;

    /// Up to `limit` legs still `pending` that were created before `before`,
    /// oldest first.
    fn list_stale_pending(
        &self,
        before: DateTime<Utc>,
        limit: u64,
    ) -> impl Future<Output = Result<Vec<TransactionRecord>, LedgerError>> + Send;

    /// Per-type totals of completed legs in `[from, to)`.
    fn summarize(
        &self,
        account_id: AccountId,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> impl Future<Output = Result<Vec<TransactionSummary>, LedgerError>> + Send;
}

/// Settlements whose provider outcome must be checked.
pub trait ExceptionStore: Send + Sync {
    /// Records a new exception.
    fn insert_exception(
        &self,
        exception: &SettlementException,
    ) -> impl Future<Output = Result<(), LedgerError>> + Send;

    /// Oldest open exceptions, at most `limit`.
    fn list_open_exceptions(
        &self,
        limit: u64,
    ) -> impl Future<Output = Result<Vec<SettlementException>, LedgerError>> + Send;

    /// Writes back status, resolution note, and timestamps.
    fn save_exception(
        &self,
        exception: &SettlementException,
    ) -> impl Future<Output = Result<(), LedgerError>> + Send;
}

/// One atomic commit boundary.
///
/// Dropping a unit of work without committing discards its writes.
pub trait UnitOfWork: AccountStore + TransactionStore + ExceptionStore + Sized {
    /// Makes every write visible atomically.
    fn commit(self) -> impl Future<Output = Result<(), LedgerError>> + Send;

    /// Discards every write.
    fn rollback(self) -> impl Future<Output = Result<(), LedgerError>> + Send;
}

/// Factory for units of work.
pub trait LedgerStore: Send + Sync {
    /// Concrete unit of work.
    type Uow: UnitOfWork;

    /// Opens a unit of work.
    fn begin(&self) -> impl Future<Output = Result<Self::Uow, LedgerError>> + Send;
}

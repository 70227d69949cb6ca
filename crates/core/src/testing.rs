//! In-memory store and scripted provider for tests.
//!
//! Compiled for this crate's tests and, behind the `test-util` feature, for
//! downstream crates' tests.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::OwnedMutexGuard;
use vaultline_shared::types::{
    AccountId, Currency, OwnerId, PageRequest, TransactionId, VirtualAccountId,
};

use crate::ledger::store::{
    AccountStore, ExceptionStore, LedgerStore, TransactionStore, UnitOfWork,
};
use crate::ledger::{
    Account, AccountType, LedgerError, TransactionFilter, TransactionRecord, TransactionStatus,
    TransactionSummary, VirtualAccount,
};
use crate::provider::{
    CustomerProfile, PaymentProvider, ProviderError, TransferReceipt, TransferRequest,
    TransferState, VirtualAccountDetails, WebhookVerifier,
};
use crate::settlement::{ExceptionStatus, SettlementException};

/// Webhook secret [`MockProvider`] signs and verifies with.
pub const WEBHOOK_SECRET: &str = "whsec_test";

/// Committed contents of a [`MemoryStore`].
#[derive(Debug, Clone, Default)]
pub struct State {
    /// Accounts by id.
    pub accounts: BTreeMap<AccountId, Account>,
    /// Virtual-account links.
    pub virtual_accounts: Vec<VirtualAccount>,
    /// Transaction legs in insertion order.
    pub transactions: Vec<TransactionRecord>,
    /// Settlement exceptions.
    pub exceptions: Vec<SettlementException>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
    gate: Arc<tokio::sync::Mutex<()>>,
    commits: Mutex<usize>,
    failing_commit: Mutex<Option<usize>>,
}

/// Snapshot-isolated store. Units of work run one at a time.
#[derive(Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl MemoryStore {
    /// Committed state.
    pub fn snapshot(&self) -> State {
        guard(&self.shared.state).clone()
    }

    /// Makes the `nth` commit from now fail, counting from 1.
    pub fn fail_commit(&self, nth: usize) {
        let done = *guard(&self.shared.commits);
        *guard(&self.shared.failing_commit) = Some(done + nth);
    }

    /// Committed account; panics if absent.
    pub fn account(&self, id: AccountId) -> Account {
        self.snapshot().accounts[&id].clone()
    }

    /// Committed balance of an account.
    pub fn balance(&self, id: AccountId) -> Decimal {
        self.account(id).balance
    }

    /// Committed legs sharing `reference`.
    pub fn legs(&self, reference: &str) -> Vec<TransactionRecord> {
        self.snapshot()
            .transactions
            .into_iter()
            .filter(|t| t.reference == reference)
            .collect()
    }

    /// Committed settlement exceptions.
    pub fn exceptions(&self) -> Vec<SettlementException> {
        self.snapshot().exceptions
    }

    /// Number of committed legs.
    pub fn transaction_count(&self) -> usize {
        self.snapshot().transactions.len()
    }

    /// Seeds an account with a linked active virtual account numbered `number`.
    pub fn seed(
        &self,
        account_type: AccountType,
        balance: Decimal,
        number: &str,
    ) -> Account {
        let now = Utc::now();
        let mut account = Account::open(
            OwnerId::new(),
            account_type,
            Currency::Ngn,
            format!("ACC-{number}"),
            now,
        );
        account.balance = balance;
        let link = VirtualAccount {
            id: VirtualAccountId::new(),
            account_id: account.id,
            account_number: number.to_string(),
            account_name: format!("{account_type} {number}"),
            bank_name: "Test Bank".to_string(),
            bank_code: "000".to_string(),
            email: format!("{number}@example.com"),
            phone: None,
            provider_reference: format!("VA-{number}"),
            is_active: true,
            created_at: now,
        };
        let mut state = guard(&self.shared.state);
        state.accounts.insert(account.id, account.clone());
        state.virtual_accounts.push(link);
        account
    }

    /// Edits a committed account in place.
    pub fn update_account(&self, id: AccountId, change: impl FnOnce(&mut Account)) {
        let mut state = guard(&self.shared.state);
        if let Some(account) = state.accounts.get_mut(&id) {
            change(account);
        }
    }

    /// Edits the committed virtual account of an account in place.
    pub fn update_virtual_account(&self, account_id: AccountId, change: impl FnOnce(&mut VirtualAccount)) {
        let mut state = guard(&self.shared.state);
        if let Some(link) = state
            .virtual_accounts
            .iter_mut()
            .find(|va| va.account_id == account_id)
        {
            change(link);
        }
    }

    /// Stores an exception outside any unit of work.
    pub fn insert_exception_now(&self, exception: SettlementException) {
        guard(&self.shared.state).exceptions.push(exception);
    }
}

impl LedgerStore for MemoryStore {
    type Uow = MemoryUow;

    async fn begin(&self) -> Result<MemoryUow, LedgerError> {
        let turn = Arc::clone(&self.shared.gate).lock_owned().await;
        let working = self.snapshot();
        Ok(MemoryUow {
            shared: Arc::clone(&self.shared),
            working: Mutex::new(working),
            _turn: turn,
        })
    }
}

/// Unit of work over a private copy of the committed state.
pub struct MemoryUow {
    shared: Arc<Shared>,
    working: Mutex<State>,
    _turn: OwnedMutexGuard<()>,
}

impl MemoryUow {
    fn state(&self) -> MutexGuard<'_, State> {
        guard(&self.working)
    }
}

fn page(mut rows: Vec<TransactionRecord>, request: &PageRequest) -> (Vec<TransactionRecord>, u64) {
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let total = rows.len() as u64;
    let offset = usize::try_from(request.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(request.limit()).unwrap_or(usize::MAX);
    (rows.into_iter().skip(offset).take(limit).collect(), total)
}

impl AccountStore for MemoryUow {
    async fn find_account(&self, id: AccountId) -> Result<Option<Account>, LedgerError> {
        Ok(self.state().accounts.get(&id).cloned())
    }

    async fn lock_account(&self, id: AccountId) -> Result<Option<Account>, LedgerError> {
        self.find_account(id).await
    }

    async fn find_platform_account(&self, currency: Currency) -> Result<Option<Account>, LedgerError> {
        Ok(self
            .state()
            .accounts
            .values()
            .find(|a| a.account_type == AccountType::Platform && a.currency == currency)
            .cloned())
    }

    async fn find_owner_account(
        &self,
        owner_id: OwnerId,
        account_type: AccountType,
        currency: Currency,
    ) -> Result<Option<Account>, LedgerError> {
        Ok(self
            .state()
            .accounts
            .values()
            .find(|a| {
                a.owner_id == owner_id && a.account_type == account_type && a.currency == currency
            })
            .cloned())
    }

    async fn list_owner_accounts(&self, owner_id: OwnerId) -> Result<Vec<Account>, LedgerError> {
        Ok(self
            .state()
            .accounts
            .values()
            .filter(|a| a.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn account_key_exists(&self, account_key: &str) -> Result<bool, LedgerError> {
        Ok(self
            .state()
            .accounts
            .values()
            .any(|a| a.account_key == account_key))
    }

    async fn insert_account(&self, account: &Account) -> Result<(), LedgerError> {
        self.state().accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn save_account(&self, account: &Account) -> Result<(), LedgerError> {
        let mut state = self.state();
        match state.accounts.get_mut(&account.id) {
            Some(stored) => {
                *stored = account.clone();
                Ok(())
            }
            None => Err(LedgerError::AccountNotFound(account.id.to_string())),
        }
    }

    async fn find_virtual_account(
        &self,
        account_id: AccountId,
    ) -> Result<Option<VirtualAccount>, LedgerError> {
        Ok(self
            .state()
            .virtual_accounts
            .iter()
            .find(|va| va.account_id == account_id)
            .cloned())
    }

    async fn find_virtual_account_by_number(
        &self,
        account_number: &str,
    ) -> Result<Option<VirtualAccount>, LedgerError> {
        Ok(self
            .state()
            .virtual_accounts
            .iter()
            .find(|va| va.account_number == account_number)
            .cloned())
    }

    async fn insert_virtual_account(&self, virtual_account: &VirtualAccount) -> Result<(), LedgerError> {
        let mut state = self.state();
        if state
            .virtual_accounts
            .iter()
            .any(|va| va.account_number == virtual_account.account_number)
        {
            return Err(LedgerError::persistence("duplicate account number"));
        }
        state.virtual_accounts.push(virtual_account.clone());
        Ok(())
    }
}

impl TransactionStore for MemoryUow {
    async fn insert_transaction(&self, record: &TransactionRecord) -> Result<(), LedgerError> {
        let mut state = self.state();
        if state
            .transactions
            .iter()
            .any(|t| t.reference == record.reference && t.account_id == record.account_id)
        {
            return Err(LedgerError::DuplicateReference(record.reference.clone()));
        }
        state.transactions.push(record.clone());
        Ok(())
    }

    async fn find_transaction(&self, id: TransactionId) -> Result<Option<TransactionRecord>, LedgerError> {
        Ok(self.state().transactions.iter().find(|t| t.id == id).cloned())
    }

    async fn find_by_reference(&self, reference: &str) -> Result<Vec<TransactionRecord>, LedgerError> {
        Ok(self
            .state()
            .transactions
            .iter()
            .filter(|t| t.reference == reference)
            .cloned()
            .collect())
    }

    async fn reference_exists(&self, reference: &str) -> Result<bool, LedgerError> {
        Ok(self.state().transactions.iter().any(|t| t.reference == reference))
    }

    async fn update_status(
        &self,
        record: &TransactionRecord,
        expected: TransactionStatus,
    ) -> Result<bool, LedgerError> {
        let mut state = self.state();
        match state
            .transactions
            .iter_mut()
            .find(|t| t.id == record.id && t.status == expected)
        {
            Some(stored) => {
                stored.status = record.status;
                stored.completed_at = record.completed_at;
                stored.updated_at = record.updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_for_account(
        &self,
        account_id: AccountId,
        filter: &TransactionFilter,
        request: &PageRequest,
    ) -> Result<(Vec<TransactionRecord>, u64), LedgerError> {
        let rows = self
            .state()
            .transactions
            .iter()
            .filter(|t| t.account_id == account_id && filter.matches(t))
            .cloned()
            .collect();
        Ok(page(rows, request))
    }

    async fn list_for_owner(
        &self,
        owner_id: OwnerId,
        filter: &TransactionFilter,
        request: &PageRequest,
    ) -> Result<(Vec<TransactionRecord>, u64), LedgerError> {
        let state = self.state();
        let rows = state
            .transactions
            .iter()
            .filter(|t| {
                state
                    .accounts
                    .get(&t.account_id)
                    .is_some_and(|a| a.owner_id == owner_id)
                    && filter.matches(t)
            })
            .cloned()
            .collect();
        Ok(page(rows, request))
    }

    async fn list_stale_pending(
        &self,
        before: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<TransactionRecord>, LedgerError> {
        let mut rows: Vec<TransactionRecord> = self
            .state()
            .transactions
            .iter()
            .filter(|t| t.status == TransactionStatus::Pending && t.created_at < before)
            .cloned()
            .collect();
        rows.sort_by_key(|t| t.created_at);
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows)
    }

    async fn summarize(
        &self,
        account_id: AccountId,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<TransactionSummary>, LedgerError> {
        let filter = TransactionFilter {
            status: Some(TransactionStatus::Completed),
            created_from: from,
            created_to: to,
            ..TransactionFilter::default()
        };
        let mut totals: Vec<TransactionSummary> = Vec::new();
        for t in self
            .state()
            .transactions
            .iter()
            .filter(|t| t.account_id == account_id && filter.matches(t))
        {
            if let Some(row) = totals.iter_mut().find(|s| s.transaction_type == t.transaction_type) {
                row.count += 1;
                row.total_amount += t.amount;
                row.total_fees += t.fee_amount;
            } else {
                totals.push(TransactionSummary {
                    transaction_type: t.transaction_type,
                    count: 1,
                    total_amount: t.amount,
                    total_fees: t.fee_amount,
                });
            }
        }
        totals.sort_by_key(|s| s.transaction_type.as_str());
        Ok(totals)
    }
}

impl ExceptionStore for MemoryUow {
    async fn insert_exception(&self, exception: &SettlementException) -> Result<(), LedgerError> {
        self.state().exceptions.push(exception.clone());
        Ok(())
    }

    async fn list_open_exceptions(&self, limit: u64) -> Result<Vec<SettlementException>, LedgerError> {
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(self
            .state()
            .exceptions
            .iter()
            .filter(|e| e.status == ExceptionStatus::Open)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn save_exception(&self, exception: &SettlementException) -> Result<(), LedgerError> {
        let mut state = self.state();
        match state.exceptions.iter_mut().find(|e| e.id == exception.id) {
            Some(stored) => {
                *stored = exception.clone();
                Ok(())
            }
            None => Err(LedgerError::persistence("exception not found")),
        }
    }
}

impl UnitOfWork for MemoryUow {
    async fn commit(self) -> Result<(), LedgerError> {
        let mut commits = guard(&self.shared.commits);
        *commits += 1;
        if *guard(&self.shared.failing_commit) == Some(*commits) {
            return Err(LedgerError::persistence("injected commit failure"));
        }
        drop(commits);
        let working = std::mem::take(&mut *guard(&self.working));
        *guard(&self.shared.state) = working;
        Ok(())
    }

    async fn rollback(self) -> Result<(), LedgerError> {
        Ok(())
    }
}

/// What the next provider transfer does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scripted {
    /// Completed receipt.
    Succeed,
    /// Receipt still processing.
    Pending,
    /// Provider declines the transfer.
    Reject,
    /// Connection fails before an answer.
    NetworkError,
    /// Provider answers 502.
    GatewayError,
    /// Never answers.
    Hang,
}

#[derive(Default)]
struct ProviderState {
    balances: HashMap<String, Decimal>,
    script: VecDeque<Scripted>,
    statuses: HashMap<String, TransferState>,
    status_errors: bool,
    status_hangs: bool,
    transfers: Vec<TransferRequest>,
    created: usize,
    fail_create: bool,
}

/// Scripted provider. Transfers succeed unless scripted otherwise.
pub struct MockProvider {
    verifier: WebhookVerifier,
    state: Mutex<ProviderState>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            verifier: WebhookVerifier::new(WEBHOOK_SECRET).unwrap(),
            state: Mutex::new(ProviderState::default()),
        }
    }
}

impl MockProvider {
    /// Sets the provider-side balance of an account number.
    pub fn with_balance(self, account_number: &str, balance: Decimal) -> Self {
        guard(&self.state)
            .balances
            .insert(account_number.to_string(), balance);
        self
    }

    /// Queues outcomes for the next transfers.
    pub fn script(&self, steps: impl IntoIterator<Item = Scripted>) {
        guard(&self.state).script.extend(steps);
    }

    /// Sets what a status lookup reports for a transfer reference.
    pub fn set_status(&self, reference: &str, state: TransferState) {
        guard(&self.state)
            .statuses
            .insert(reference.to_string(), state);
    }

    /// Makes every status lookup fail.
    pub fn fail_status_checks(&self) {
        guard(&self.state).status_errors = true;
    }

    /// Makes every status lookup wait forever.
    pub fn hang_status_checks(&self) {
        guard(&self.state).status_hangs = true;
    }

    /// Makes virtual-account creation fail.
    pub fn fail_create(&self) {
        guard(&self.state).fail_create = true;
    }

    /// Transfers requested so far.
    pub fn transfers(&self) -> Vec<TransferRequest> {
        guard(&self.state).transfers.clone()
    }

    /// Signs a webhook body with [`WEBHOOK_SECRET`].
    pub fn sign(&self, body: &[u8]) -> String {
        self.verifier.sign(body)
    }
}

impl PaymentProvider for MockProvider {
    async fn create_virtual_account(
        &self,
        customer: &CustomerProfile,
    ) -> Result<VirtualAccountDetails, ProviderError> {
        let mut state = guard(&self.state);
        if state.fail_create {
            return Err(ProviderError::Api {
                status: 400,
                message: "customer rejected".to_string(),
            });
        }
        state.created += 1;
        Ok(VirtualAccountDetails {
            account_number: format!("90000000{:02}", state.created),
            account_name: format!("{} {}", customer.first_name, customer.last_name),
            bank_name: "Test Bank".to_string(),
            bank_code: "000".to_string(),
            reference: format!("VA-REF-{}", state.created),
        })
    }

    async fn get_balance(&self, account_number: &str) -> Result<Decimal, ProviderError> {
        Ok(guard(&self.state)
            .balances
            .get(account_number)
            .copied()
            .unwrap_or(Decimal::ZERO))
    }

    async fn transfer(&self, request: &TransferRequest) -> Result<TransferReceipt, ProviderError> {
        let step = {
            let mut state = guard(&self.state);
            state.transfers.push(request.clone());
            let step = state.script.pop_front().unwrap_or(Scripted::Succeed);
            let recorded = match step {
                Scripted::Succeed => Some(TransferState::Successful),
                Scripted::Pending => Some(TransferState::Pending),
                Scripted::Reject => Some(TransferState::Failed),
                Scripted::NetworkError | Scripted::GatewayError | Scripted::Hang => None,
            };
            if let Some(recorded) = recorded {
                state.statuses.insert(request.reference.clone(), recorded);
            }
            step
        };
        let receipt = |state| TransferReceipt {
            reference: request.reference.clone(),
            state,
        };
        match step {
            Scripted::Succeed => Ok(receipt(TransferState::Successful)),
            Scripted::Pending => Ok(receipt(TransferState::Pending)),
            Scripted::Reject => Ok(receipt(TransferState::Failed)),
            Scripted::NetworkError => Err(ProviderError::Network("connection reset".to_string())),
            Scripted::GatewayError => Err(ProviderError::Api {
                status: 502,
                message: "bad gateway".to_string(),
            }),
            Scripted::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ProviderError::Timeout)
            }
        }
    }

    async fn transfer_status(&self, reference: &str) -> Result<TransferState, ProviderError> {
        let hangs = guard(&self.state).status_hangs;
        if hangs {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        let state = guard(&self.state);
        if state.status_errors {
            return Err(ProviderError::Network("status endpoint unavailable".to_string()));
        }
        Ok(state
            .statuses
            .get(reference)
            .copied()
            .unwrap_or(TransferState::NotFound))
    }

    fn verify_signature(&self, signature: &str, raw_body: &[u8]) -> bool {
        self.verifier.verify(signature, raw_body)
    }
}

//! Ledger service: account administration, direct postings, and history.
//!
//! Settlement and webhook crediting live in their own modules; this service
//! covers everything else the application does with accounts and
//! transaction records. Every write runs in one unit of work.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument, warn};
use vaultline_shared::types::{
    AccountId, Currency, OwnerId, PageRequest, PageResponse, TransactionId, VirtualAccountId,
};

use super::error::LedgerError;
use super::mutator::AccountMutator;
use super::reference::ReferenceGenerator;
use super::status;
use super::store::{AccountStore, LedgerStore, TransactionStore, UnitOfWork};
use super::types::{
    Account, AccountType, NewTransaction, TransactionFilter, TransactionRecord, TransactionStatus,
    TransactionSummary, VirtualAccount,
};
use crate::provider::{self, CustomerProfile, PaymentProvider};

/// A freshly opened account and its provider-side link.
#[derive(Debug, Clone, Serialize)]
pub struct OpenedAccount {
    /// Ledger account.
    pub account: Account,
    /// Virtual bank account issued by the provider.
    pub virtual_account: VirtualAccount,
}

/// Commits on success, rolls back on error.
pub(crate) async fn finish<U: UnitOfWork, T>(
    uow: U,
    result: Result<T, LedgerError>,
) -> Result<T, LedgerError> {
    match result {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback) = uow.rollback().await {
                warn!(error = %rollback, "rollback failed");
            }
            Err(err)
        }
    }
}

/// Ends a read-only unit of work.
pub(crate) async fn release<U: UnitOfWork, T>(
    uow: U,
    result: Result<T, LedgerError>,
) -> Result<T, LedgerError> {
    uow.rollback().await?;
    result
}

/// Ledger operations outside settlement.
pub struct LedgerService<S: LedgerStore, P: PaymentProvider> {
    store: Arc<S>,
    provider: Arc<P>,
    call_timeout: Duration,
    references: ReferenceGenerator,
}

impl<S: LedgerStore, P: PaymentProvider> LedgerService<S, P> {
    /// Creates a service.
    #[must_use]
    pub fn new(store: Arc<S>, provider: Arc<P>, call_timeout: Duration) -> Self {
        Self {
            store,
            provider,
            call_timeout,
            references: ReferenceGenerator::default(),
        }
    }

    /// Replaces the reference generator.
    #[must_use]
    pub fn with_references(mut self, references: ReferenceGenerator) -> Self {
        self.references = references;
        self
    }

    async fn existing_account(uow: &S::Uow, id: AccountId) -> Result<Account, LedgerError> {
        uow.find_account(id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(id.to_string()))
    }

    /// Loads an account.
    ///
    /// # Errors
    ///
    /// `AccountNotFound` if it does not exist.
    pub async fn account(&self, id: AccountId) -> Result<Account, LedgerError> {
        let uow = self.store.begin().await?;
        let result = Self::existing_account(&uow, id).await;
        release(uow, result).await
    }

    /// Every account of an owner.
    ///
    /// # Errors
    ///
    /// `Persistence` on storage failure.
    pub async fn owner_accounts(&self, owner_id: OwnerId) -> Result<Vec<Account>, LedgerError> {
        let uow = self.store.begin().await?;
        let result = uow.list_owner_accounts(owner_id).await;
        release(uow, result).await
    }

    /// Opens a ledger account backed by a new provider virtual account.
    ///
    /// An owner holds at most one account per type and currency, and there is
    /// one platform account per currency.
    ///
    /// # Errors
    ///
    /// `Validation` if the account already exists, `ExternalProvider` if the
    /// provider refuses, `Persistence` on storage failure.
    #[instrument(skip(self, profile), fields(%owner_id, %account_type, %currency))]
    pub async fn open_account(
        &self,
        owner_id: OwnerId,
        account_type: AccountType,
        currency: Currency,
        profile: &CustomerProfile,
    ) -> Result<OpenedAccount, LedgerError> {
        let uow = self.store.begin().await?;
        let absent = Self::ensure_absent(&uow, owner_id, account_type, currency).await;
        release(uow, absent).await?;

        let details = provider::with_timeout(
            self.call_timeout,
            self.provider.create_virtual_account(profile),
        )
        .await?;

        let now = Utc::now();
        let uow = self.store.begin().await?;
        let result = async {
            Self::ensure_absent(&uow, owner_id, account_type, currency).await?;
            let key = self.references.account_key(&uow, owner_id, now).await?;
            let account = Account::open(owner_id, account_type, currency, key, now);
            let virtual_account = VirtualAccount {
                id: VirtualAccountId::new(),
                account_id: account.id,
                account_number: details.account_number.clone(),
                account_name: details.account_name.clone(),
                bank_name: details.bank_name.clone(),
                bank_code: details.bank_code.clone(),
                email: profile.email.clone(),
                phone: (!profile.phone.is_empty()).then(|| profile.phone.clone()),
                provider_reference: details.reference.clone(),
                is_active: true,
                created_at: now,
            };
            uow.insert_account(&account).await?;
            uow.insert_virtual_account(&virtual_account).await?;
            Ok::<_, LedgerError>(OpenedAccount {
                account,
                virtual_account,
            })
        }
        .await;
        let opened = finish(uow, result).await;

        match &opened {
            Ok(opened) => info!(
                account_id = %opened.account.id,
                account_key = %opened.account.account_key,
                "account opened"
            ),
            Err(err) => warn!(
                account_number = %details.account_number,
                error = %err,
                "virtual account issued but ledger account not stored"
            ),
        }
        opened
    }

    async fn ensure_absent(
        uow: &S::Uow,
        owner_id: OwnerId,
        account_type: AccountType,
        currency: Currency,
    ) -> Result<(), LedgerError> {
        if uow
            .find_owner_account(owner_id, account_type, currency)
            .await?
            .is_some()
        {
            return Err(LedgerError::validation(format!(
                "owner already has a {account_type} account in {currency}"
            )));
        }
        if account_type == AccountType::Platform
            && uow.find_platform_account(currency).await?.is_some()
        {
            return Err(LedgerError::validation(format!(
                "a platform account for {currency} already exists"
            )));
        }
        Ok(())
    }

    async fn modify(
        &self,
        id: AccountId,
        change: impl FnOnce(&mut Account, DateTime<Utc>) + Send,
    ) -> Result<Account, LedgerError> {
        let uow = self.store.begin().await?;
        let result = async {
            let mut account = uow
                .lock_account(id)
                .await?
                .ok_or_else(|| LedgerError::AccountNotFound(id.to_string()))?;
            change(&mut account, Utc::now());
            uow.save_account(&account).await?;
            Ok::<_, LedgerError>(account)
        }
        .await;
        finish(uow, result).await
    }

    /// Locks an account against credits and debits.
    ///
    /// # Errors
    ///
    /// `AccountNotFound`, or `Persistence` on storage failure.
    pub async fn lock_account(&self, id: AccountId, reason: &str) -> Result<Account, LedgerError> {
        let account = self
            .modify(id, |account, now| {
                account.locked = true;
                account.lock_reason = Some(reason.to_string());
                account.locked_at = Some(now);
                account.updated_at = now;
            })
            .await?;
        info!(account_id = %id, reason, "account locked");
        Ok(account)
    }

    /// Clears an operator lock.
    ///
    /// # Errors
    ///
    /// `AccountNotFound`, or `Persistence` on storage failure.
    pub async fn unlock_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        let account = self
            .modify(id, |account, now| {
                account.locked = false;
                account.lock_reason = None;
                account.locked_at = None;
                account.updated_at = now;
            })
            .await?;
        info!(account_id = %id, "account unlocked");
        Ok(account)
    }

    /// Soft-deletes an account: it stays readable but accepts no mutation.
    ///
    /// # Errors
    ///
    /// `AccountNotFound`, or `Persistence` on storage failure.
    pub async fn deactivate_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        let account = self
            .modify(id, |account, now| {
                account.is_active = false;
                account.is_fundable = false;
                account.is_withdrawable = false;
                account.updated_at = now;
            })
            .await?;
        info!(account_id = %id, "account deactivated");
        Ok(account)
    }

    /// Credits an account directly, outside any settlement.
    ///
    /// # Errors
    ///
    /// See [`AccountMutator::credit_locked`].
    pub async fn credit(&self, account_id: AccountId, amount: Decimal) -> Result<Account, LedgerError> {
        let uow = self.store.begin().await?;
        let result = AccountMutator::credit_locked(&uow, account_id, amount, Utc::now()).await;
        finish(uow, result).await
    }

    /// Debits an account directly, outside any settlement.
    ///
    /// # Errors
    ///
    /// See [`AccountMutator::debit_locked`].
    pub async fn debit(&self, account_id: AccountId, amount: Decimal) -> Result<Account, LedgerError> {
        let uow = self.store.begin().await?;
        let result = AccountMutator::debit_locked(&uow, account_id, amount, Utc::now()).await;
        finish(uow, result).await
    }

    /// Records a single transaction without touching any balance.
    ///
    /// A reference is generated when none is given. A record created as
    /// `completed` is stamped with `completed_at`.
    ///
    /// # Errors
    ///
    /// `Validation` for a non-positive amount or a fee outside `[0, amount]`,
    /// `AccountNotFound`, `DuplicateReference` if the account already has a
    /// record with that reference.
    pub async fn create_transaction(&self, input: NewTransaction) -> Result<TransactionRecord, LedgerError> {
        if input.amount <= Decimal::ZERO {
            return Err(LedgerError::validation("amount must be greater than zero"));
        }
        if input.fee_amount < Decimal::ZERO || input.fee_amount > input.amount {
            return Err(LedgerError::validation(
                "fee must be between zero and the amount",
            ));
        }
        if input.reference.as_deref().is_some_and(|r| r.trim().is_empty()) {
            return Err(LedgerError::validation("reference must not be blank"));
        }

        let uow = self.store.begin().await?;
        let result = async {
            let account = Self::existing_account(&uow, input.account_id).await?;
            let now = Utc::now();
            let reference = match input.reference {
                Some(reference) => reference,
                None => self.references.transaction_reference(&uow, now).await?,
            };
            let mut record = TransactionRecord::pending(
                account.id,
                input.transaction_type,
                input.amount,
                reference,
                now,
            )
            .with_fee(input.fee_amount);
            record.description = input.description;
            if input.status != TransactionStatus::Pending {
                status::transition(&mut record, input.status, now)?;
            }
            uow.insert_transaction(&record).await?;
            Ok::<_, LedgerError>(record)
        }
        .await;
        finish(uow, result).await
    }

    /// Loads one record by id.
    ///
    /// # Errors
    ///
    /// `TransactionNotFound` if it does not exist.
    pub async fn transaction(&self, id: TransactionId) -> Result<TransactionRecord, LedgerError> {
        let uow = self.store.begin().await?;
        let result = uow.find_transaction(id).await;
        release(uow, result)
            .await?
            .ok_or_else(|| LedgerError::TransactionNotFound(id.to_string()))
    }

    /// First leg recorded under `reference`, if any.
    ///
    /// # Errors
    ///
    /// `Persistence` on storage failure.
    pub async fn find_by_reference(&self, reference: &str) -> Result<Option<TransactionRecord>, LedgerError> {
        Ok(self.related(reference).await?.into_iter().next())
    }

    /// Every leg of one operation, oldest first.
    ///
    /// # Errors
    ///
    /// `Persistence` on storage failure.
    pub async fn related(&self, reference: &str) -> Result<Vec<TransactionRecord>, LedgerError> {
        let uow = self.store.begin().await?;
        let result = uow.find_by_reference(reference).await;
        release(uow, result).await
    }

    /// Moves a record along the status law.
    ///
    /// # Errors
    ///
    /// `TransactionNotFound`, or `InvalidTransition` for an illegal edge,
    /// including when another writer changed the status first.
    pub async fn update_status(
        &self,
        id: TransactionId,
        to: TransactionStatus,
    ) -> Result<TransactionRecord, LedgerError> {
        let uow = self.store.begin().await?;
        let result = async {
            let mut record = uow
                .find_transaction(id)
                .await?
                .ok_or_else(|| LedgerError::TransactionNotFound(id.to_string()))?;
            let from = record.status;
            status::transition(&mut record, to, Utc::now())?;
            if !uow.update_status(&record, from).await? {
                let current = uow
                    .find_transaction(id)
                    .await?
                    .map_or(from, |r| r.status);
                return Err(LedgerError::InvalidTransition { from: current, to });
            }
            Ok::<_, LedgerError>(record)
        }
        .await;
        finish(uow, result).await
    }

    /// Page of one account's records, newest first.
    ///
    /// # Errors
    ///
    /// `AccountNotFound`, or `Persistence` on storage failure.
    pub async fn list_for_account(
        &self,
        account_id: AccountId,
        filter: &TransactionFilter,
        page: &PageRequest,
    ) -> Result<PageResponse<TransactionRecord>, LedgerError> {
        let page = page.normalized();
        let uow = self.store.begin().await?;
        let result = async {
            Self::existing_account(&uow, account_id).await?;
            uow.list_for_account(account_id, filter, &page).await
        }
        .await;
        let (rows, total) = release(uow, result).await?;
        Ok(PageResponse::new(rows, page.page, page.per_page, total))
    }

    /// Page of records across every account of an owner, newest first.
    ///
    /// # Errors
    ///
    /// `Persistence` on storage failure.
    pub async fn list_for_owner(
        &self,
        owner_id: OwnerId,
        filter: &TransactionFilter,
        page: &PageRequest,
    ) -> Result<PageResponse<TransactionRecord>, LedgerError> {
        let page = page.normalized();
        let uow = self.store.begin().await?;
        let result = uow.list_for_owner(owner_id, filter, &page).await;
        let (rows, total) = release(uow, result).await?;
        Ok(PageResponse::new(rows, page.page, page.per_page, total))
    }

    /// Per-type totals of completed records in `[from, to)`.
    ///
    /// # Errors
    ///
    /// `Validation` if `from` is not before `to`, `AccountNotFound`.
    pub async fn summary(
        &self,
        account_id: AccountId,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<TransactionSummary>, LedgerError> {
        if let (Some(from), Some(to)) = (from, to)
            && from >= to
        {
            return Err(LedgerError::validation("summary range is empty"));
        }
        let uow = self.store.begin().await?;
        let result = async {
            Self::existing_account(&uow, account_id).await?;
            uow.summarize(account_id, from, to).await
        }
        .await;
        release(uow, result).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::TransactionType;
    use crate::testing::{MemoryStore, MockProvider};
    use rust_decimal_macros::dec;

    fn service() -> (Arc<MemoryStore>, Arc<MockProvider>, LedgerService<MemoryStore, MockProvider>) {
        let store = Arc::new(MemoryStore::default());
        let provider = Arc::new(MockProvider::default());
        let service = LedgerService::new(
            Arc::clone(&store),
            Arc::clone(&provider),
            Duration::from_millis(100),
        );
        (store, provider, service)
    }

    fn profile() -> CustomerProfile {
        CustomerProfile {
            email: "ada@example.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Obi".to_string(),
            phone: "+2348000000000".to_string(),
        }
    }

    fn new_transaction(account_id: AccountId, reference: Option<&str>) -> NewTransaction {
        NewTransaction {
            transaction_type: TransactionType::Credit,
            amount: dec!(10),
            account_id,
            status: TransactionStatus::Pending,
            reference: reference.map(ToString::to_string),
            fee_amount: Decimal::ZERO,
            description: Some("manual adjustment".to_string()),
        }
    }

    #[tokio::test]
    async fn test_open_account_links_virtual_account() {
        let (_store, _provider, service) = service();
        let owner = OwnerId::new();

        let opened = service
            .open_account(owner, AccountType::User, Currency::Ngn, &profile())
            .await
            .unwrap();

        assert_eq!(opened.account.owner_id, owner);
        assert_eq!(opened.account.balance, Decimal::ZERO);
        assert!(opened.account.account_key.starts_with("ACC-"));
        assert_eq!(opened.virtual_account.account_id, opened.account.id);
        assert_eq!(opened.virtual_account.account_name, "Ada Obi");
        assert_eq!(opened.virtual_account.phone.as_deref(), Some("+2348000000000"));

        let accounts = service.owner_accounts(owner).await.unwrap();
        assert_eq!(accounts, vec![opened.account]);
    }

    #[tokio::test]
    async fn test_open_account_twice_is_rejected() {
        let (_store, _provider, service) = service();
        let owner = OwnerId::new();
        service
            .open_account(owner, AccountType::Store, Currency::Ngn, &profile())
            .await
            .unwrap();

        let err = service
            .open_account(owner, AccountType::Store, Currency::Ngn, &profile())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));

        // Another currency is a different account.
        service
            .open_account(owner, AccountType::Store, Currency::Usd, &profile())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_provider_refusal_stores_nothing() {
        let (store, provider, service) = service();
        provider.fail_create();

        let err = service
            .open_account(OwnerId::new(), AccountType::User, Currency::Ngn, &profile())
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::ExternalProvider(_)));
        assert!(store.snapshot().accounts.is_empty());
    }

    #[tokio::test]
    async fn test_lock_unlock_deactivate() {
        let (store, _provider, service) = service();
        let account = store.seed(AccountType::User, dec!(100), "1000000001");

        let locked = service.lock_account(account.id, "chargeback review").await.unwrap();
        assert!(locked.locked);
        assert_eq!(locked.lock_reason.as_deref(), Some("chargeback review"));
        assert!(locked.locked_at.is_some());
        assert!(matches!(
            service.debit(account.id, dec!(1)).await,
            Err(LedgerError::InvalidState(_))
        ));

        let unlocked = service.unlock_account(account.id).await.unwrap();
        assert!(!unlocked.locked);
        assert!(unlocked.lock_reason.is_none());
        assert_eq!(service.debit(account.id, dec!(1)).await.unwrap().balance, dec!(99));

        let closed = service.deactivate_account(account.id).await.unwrap();
        assert!(!closed.is_active);
        assert!(service.credit(account.id, dec!(1)).await.is_err());
        assert!(service.debit(account.id, dec!(1)).await.is_err());
        assert_eq!(store.balance(account.id), dec!(99));
    }

    #[tokio::test]
    async fn test_direct_credit_and_debit() {
        let (store, _provider, service) = service();
        let account = store.seed(AccountType::User, dec!(100), "1000000001");

        assert_eq!(service.credit(account.id, dec!(25.50)).await.unwrap().balance, dec!(125.50));
        assert!(matches!(
            service.debit(account.id, dec!(200)).await,
            Err(LedgerError::InvalidState(_))
        ));
        assert_eq!(store.balance(account.id), dec!(125.50));
        assert!(matches!(
            service.credit(AccountId::new(), dec!(1)).await,
            Err(LedgerError::AccountNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_create_transaction_generates_reference() {
        let (store, _provider, service) = service();
        let account = store.seed(AccountType::User, Decimal::ZERO, "1000000001");

        let record = service
            .create_transaction(new_transaction(account.id, None))
            .await
            .unwrap();

        assert!(record.reference.starts_with("TXN-"));
        assert_eq!(record.status, TransactionStatus::Pending);
        assert_eq!(record.description.as_deref(), Some("manual adjustment"));
        assert_eq!(store.balance(account.id), Decimal::ZERO);

        let found = service.find_by_reference(&record.reference).await.unwrap();
        assert_eq!(found.map(|r| r.id), Some(record.id));
        assert!(service.find_by_reference("TXN-MISSING").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_transaction_rejects_duplicate_reference() {
        let (store, _provider, service) = service();
        let account = store.seed(AccountType::User, Decimal::ZERO, "1000000001");
        service
            .create_transaction(new_transaction(account.id, Some("REF-1")))
            .await
            .unwrap();

        let err = service
            .create_transaction(new_transaction(account.id, Some("REF-1")))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateReference(r) if r == "REF-1"));
        assert_eq!(store.transaction_count(), 1);
    }

    #[tokio::test]
    async fn test_create_transaction_validates_input() {
        let (store, _provider, service) = service();
        let account = store.seed(AccountType::User, Decimal::ZERO, "1000000001");

        let mut zero = new_transaction(account.id, None);
        zero.amount = Decimal::ZERO;
        assert!(matches!(
            service.create_transaction(zero).await,
            Err(LedgerError::Validation(_))
        ));

        let mut greedy = new_transaction(account.id, None);
        greedy.fee_amount = dec!(11);
        assert!(matches!(
            service.create_transaction(greedy).await,
            Err(LedgerError::Validation(_))
        ));

        assert!(matches!(
            service
                .create_transaction(new_transaction(AccountId::new(), None))
                .await,
            Err(LedgerError::AccountNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_completed_record_is_stamped() {
        let (store, _provider, service) = service();
        let account = store.seed(AccountType::User, Decimal::ZERO, "1000000001");
        let mut input = new_transaction(account.id, None);
        input.status = TransactionStatus::Completed;

        let record = service.create_transaction(input).await.unwrap();
        assert!(record.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_update_status_follows_transition_law() {
        let (store, _provider, service) = service();
        let account = store.seed(AccountType::User, Decimal::ZERO, "1000000001");
        let record = service
            .create_transaction(new_transaction(account.id, None))
            .await
            .unwrap();

        let failed = service
            .update_status(record.id, TransactionStatus::Failed)
            .await
            .unwrap();
        assert_eq!(failed.status, TransactionStatus::Failed);
        assert!(failed.completed_at.is_none());

        let err = service
            .update_status(record.id, TransactionStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidTransition {
                from: TransactionStatus::Failed,
                to: TransactionStatus::Completed
            }
        ));
        assert_eq!(
            service.transaction(record.id).await.unwrap().status,
            TransactionStatus::Failed
        );
        assert!(matches!(
            service
                .update_status(TransactionId::new(), TransactionStatus::Completed)
                .await,
            Err(LedgerError::TransactionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_history_filters_and_pages() {
        let (store, _provider, service) = service();
        let account = store.seed(AccountType::User, Decimal::ZERO, "1000000001");
        for i in 0..5 {
            let mut input = new_transaction(account.id, Some(&format!("REF-{i}")));
            if i % 2 == 0 {
                input.status = TransactionStatus::Completed;
            }
            service.create_transaction(input).await.unwrap();
        }

        let page = service
            .list_for_account(account.id, &TransactionFilter::default(), &PageRequest::new(1, 2))
            .await
            .unwrap();
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.meta.total, 5);
        assert_eq!(page.meta.total_pages, 3);

        let completed = TransactionFilter {
            status: Some(TransactionStatus::Completed),
            ..TransactionFilter::default()
        };
        let page = service
            .list_for_account(account.id, &completed, &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.meta.total, 3);

        let mine = service
            .list_for_owner(account.owner_id, &TransactionFilter::default(), &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(mine.meta.total, 5);
        let theirs = service
            .list_for_owner(OwnerId::new(), &TransactionFilter::default(), &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(theirs.meta.total, 0);

        assert!(matches!(
            service
                .list_for_account(AccountId::new(), &TransactionFilter::default(), &PageRequest::default())
                .await,
            Err(LedgerError::AccountNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_summary_counts_completed_only() {
        let (store, _provider, service) = service();
        let account = store.seed(AccountType::User, Decimal::ZERO, "1000000001");
        for (i, status) in [
            TransactionStatus::Completed,
            TransactionStatus::Completed,
            TransactionStatus::Pending,
        ]
        .into_iter()
        .enumerate()
        {
            let mut input = new_transaction(account.id, Some(&format!("REF-{i}")));
            input.status = status;
            input.fee_amount = dec!(0.15);
            service.create_transaction(input).await.unwrap();
        }

        let summary = service.summary(account.id, None, None).await.unwrap();
        assert_eq!(
            summary,
            vec![TransactionSummary {
                transaction_type: TransactionType::Credit,
                count: 2,
                total_amount: dec!(20),
                total_fees: dec!(0.30),
            }]
        );

        let now = Utc::now();
        assert!(matches!(
            service.summary(account.id, Some(now), Some(now)).await,
            Err(LedgerError::Validation(_))
        ));
    }
}

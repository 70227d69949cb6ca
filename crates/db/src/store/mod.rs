//! Postgres implementation of the ledger store traits.
//!
//! One [`SeaUnitOfWork`] wraps one `DatabaseTransaction`. Account rows read
//! through [`AccountStore::lock_account`] are held with `SELECT ... FOR
//! UPDATE` until the transaction ends.

mod convert;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::ActiveValue::{Set, Unchanged};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, SqlErr,
    TransactionTrait,
};
use vaultline_core::ledger::{
    Account, AccountStore, AccountType, ExceptionStore, LedgerError, LedgerStore,
    TransactionFilter, TransactionRecord, TransactionStatus, TransactionStore, TransactionSummary,
    UnitOfWork, VirtualAccount,
};
use vaultline_core::settlement::SettlementException;
use vaultline_shared::types::{AccountId, Currency, OwnerId, PageRequest, TransactionId};

use crate::entities::{
    accounts, sea_orm_active_enums as db, settlement_exceptions, transactions, virtual_accounts,
};
use convert::stamp;

fn db_err(err: DbErr) -> LedgerError {
    LedgerError::persistence(err)
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Opens units of work on a connection pool.
#[derive(Debug, Clone)]
pub struct SeaLedgerStore {
    db: DatabaseConnection,
}

impl SeaLedgerStore {
    /// Creates a store over `db`.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl LedgerStore for SeaLedgerStore {
    type Uow = SeaUnitOfWork;

    async fn begin(&self) -> Result<SeaUnitOfWork, LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        Ok(SeaUnitOfWork { txn })
    }
}

/// A single database transaction.
///
/// Dropping it without `commit` rolls back.
#[derive(Debug)]
pub struct SeaUnitOfWork {
    txn: DatabaseTransaction,
}

impl SeaUnitOfWork {
    fn filtered(
        mut query: Select<transactions::Entity>,
        filter: &TransactionFilter,
    ) -> Select<transactions::Entity> {
        if let Some(kind) = filter.transaction_type {
            query = query
                .filter(transactions::Column::TransactionType.eq(db::TransactionType::from(kind)));
        }
        if let Some(status) = filter.status {
            query =
                query.filter(transactions::Column::Status.eq(db::TransactionStatus::from(status)));
        }
        if let Some(from) = filter.created_from {
            query = query.filter(transactions::Column::CreatedAt.gte(from));
        }
        if let Some(to) = filter.created_to {
            query = query.filter(transactions::Column::CreatedAt.lt(to));
        }
        query
    }

    async fn page(
        &self,
        query: Select<transactions::Entity>,
        page: &PageRequest,
    ) -> Result<(Vec<TransactionRecord>, u64), LedgerError> {
        let total = query.clone().count(&self.txn).await.map_err(db_err)?;
        let rows = query
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.txn)
            .await
            .map_err(db_err)?;
        Ok((rows.into_iter().map(convert::transaction).collect(), total))
    }
}

impl AccountStore for SeaUnitOfWork {
    async fn find_account(&self, id: AccountId) -> Result<Option<Account>, LedgerError> {
        accounts::Entity::find_by_id(id.into_inner())
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(convert::account)
            .transpose()
    }

    async fn lock_account(&self, id: AccountId) -> Result<Option<Account>, LedgerError> {
        accounts::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(convert::account)
            .transpose()
    }

    async fn find_platform_account(
        &self,
        currency: Currency,
    ) -> Result<Option<Account>, LedgerError> {
        accounts::Entity::find()
            .filter(accounts::Column::AccountType.eq(db::AccountType::Platform))
            .filter(accounts::Column::Currency.eq(currency.code()))
            .order_by_asc(accounts::Column::CreatedAt)
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(convert::account)
            .transpose()
    }

    async fn find_owner_account(
        &self,
        owner_id: OwnerId,
        account_type: AccountType,
        currency: Currency,
    ) -> Result<Option<Account>, LedgerError> {
        accounts::Entity::find()
            .filter(accounts::Column::OwnerId.eq(owner_id.into_inner()))
            .filter(accounts::Column::AccountType.eq(db::AccountType::from(account_type)))
            .filter(accounts::Column::Currency.eq(currency.code()))
            .one(&self.txn)
            .await
            .map_err(db_err)?
            .map(convert::account)
            .transpose()
    }

    async fn list_owner_accounts(&self, owner_id: OwnerId) -> Result<Vec<Account>, LedgerError> {
        accounts::Entity::find()
            .filter(accounts::Column::OwnerId.eq(owner_id.into_inner()))
            .order_by_asc(accounts::Column::CreatedAt)
            .all(&self.txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(convert::account)
            .collect()
    }

    async fn account_key_exists(&self, account_key: &str) -> Result<bool, LedgerError> {
        let count = accounts::Entity::find()
            .filter(accounts::Column::AccountKey.eq(account_key))
            .count(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(count > 0)
    }

    async fn insert_account(&self, account: &Account) -> Result<(), LedgerError> {
        match convert::new_account(account).insert(&self.txn).await {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(LedgerError::validation(format!(
                "account {} or its owner/type/currency already exists",
                account.account_key
            ))),
            Err(err) => Err(db_err(err)),
        }
    }

    async fn save_account(&self, account: &Account) -> Result<(), LedgerError> {
        let model = accounts::ActiveModel {
            id: Unchanged(account.id.into_inner()),
            balance: Set(account.balance),
            is_active: Set(account.is_active),
            is_fundable: Set(account.is_fundable),
            is_withdrawable: Set(account.is_withdrawable),
            is_suspended: Set(account.is_suspended),
            locked: Set(account.locked),
            lock_reason: Set(account.lock_reason.clone()),
            locked_at: Set(account.locked_at.map(stamp)),
            updated_at: Set(stamp(account.updated_at)),
            ..Default::default()
        };
        model.update(&self.txn).await.map_err(db_err)?;
        Ok(())
    }

    async fn find_virtual_account(
        &self,
        account_id: AccountId,
    ) -> Result<Option<VirtualAccount>, LedgerError> {
        let found = virtual_accounts::Entity::find()
            .filter(virtual_accounts::Column::AccountId.eq(account_id.into_inner()))
            .order_by_desc(virtual_accounts::Column::IsActive)
            .order_by_asc(virtual_accounts::Column::CreatedAt)
            .one(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(found.map(convert::virtual_account))
    }

    async fn find_virtual_account_by_number(
        &self,
        account_number: &str,
    ) -> Result<Option<VirtualAccount>, LedgerError> {
        let found = virtual_accounts::Entity::find()
            .filter(virtual_accounts::Column::AccountNumber.eq(account_number))
            .one(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(found.map(convert::virtual_account))
    }

    async fn insert_virtual_account(
        &self,
        virtual_account: &VirtualAccount,
    ) -> Result<(), LedgerError> {
        match convert::new_virtual_account(virtual_account)
            .insert(&self.txn)
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(LedgerError::validation(format!(
                "virtual account {} is already linked",
                virtual_account.account_number
            ))),
            Err(err) => Err(db_err(err)),
        }
    }
}

#[derive(Debug, FromQueryResult)]
struct SummaryRow {
    transaction_type: db::TransactionType,
    count: i64,
    total_amount: Option<Decimal>,
    total_fees: Option<Decimal>,
}

impl TransactionStore for SeaUnitOfWork {
    async fn insert_transaction(&self, record: &TransactionRecord) -> Result<(), LedgerError> {
        match convert::new_transaction(record).insert(&self.txn).await {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(LedgerError::DuplicateReference(record.reference.clone()))
            }
            Err(err) => Err(db_err(err)),
        }
    }

    async fn find_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Option<TransactionRecord>, LedgerError> {
        let found = transactions::Entity::find_by_id(id.into_inner())
            .one(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(found.map(convert::transaction))
    }

    async fn find_by_reference(
        &self,
        reference: &str,
    ) -> Result<Vec<TransactionRecord>, LedgerError> {
        let rows = transactions::Entity::find()
            .filter(transactions::Column::Reference.eq(reference))
            .order_by_asc(transactions::Column::CreatedAt)
            .order_by_asc(transactions::Column::Id)
            .all(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(convert::transaction).collect())
    }

    async fn reference_exists(&self, reference: &str) -> Result<bool, LedgerError> {
        let count = transactions::Entity::find()
            .filter(transactions::Column::Reference.eq(reference))
            .count(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(count > 0)
    }

    async fn update_status(
        &self,
        record: &TransactionRecord,
        expected: TransactionStatus,
    ) -> Result<bool, LedgerError> {
        let result = transactions::Entity::update_many()
            .col_expr(
                transactions::Column::Status,
                Expr::value(db::TransactionStatus::from(record.status)),
            )
            .col_expr(
                transactions::Column::CompletedAt,
                Expr::value(record.completed_at.map(stamp)),
            )
            .col_expr(
                transactions::Column::UpdatedAt,
                Expr::value(stamp(record.updated_at)),
            )
            .filter(transactions::Column::Id.eq(record.id.into_inner()))
            .filter(transactions::Column::Status.eq(db::TransactionStatus::from(expected)))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected == 1)
    }

    async fn list_for_account(
        &self,
        account_id: AccountId,
        filter: &TransactionFilter,
        page: &PageRequest,
    ) -> Result<(Vec<TransactionRecord>, u64), LedgerError> {
        let query = transactions::Entity::find()
            .filter(transactions::Column::AccountId.eq(account_id.into_inner()));
        self.page(Self::filtered(query, filter), page).await
    }

    async fn list_for_owner(
        &self,
        owner_id: OwnerId,
        filter: &TransactionFilter,
        page: &PageRequest,
    ) -> Result<(Vec<TransactionRecord>, u64), LedgerError> {
        let query = transactions::Entity::find()
            .inner_join(accounts::Entity)
            .filter(accounts::Column::OwnerId.eq(owner_id.into_inner()));
        self.page(Self::filtered(query, filter), page).await
    }

    async fn list_stale_pending(
        &self,
        before: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<TransactionRecord>, LedgerError> {
        let rows = transactions::Entity::find()
            .filter(transactions::Column::Status.eq(db::TransactionStatus::Pending))
            .filter(transactions::Column::CreatedAt.lt(before))
            .order_by_asc(transactions::Column::CreatedAt)
            .order_by_asc(transactions::Column::Id)
            .limit(limit)
            .all(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(convert::transaction).collect())
    }

    async fn summarize(
        &self,
        account_id: AccountId,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<TransactionSummary>, LedgerError> {
        let mut query = transactions::Entity::find()
            .select_only()
            .column(transactions::Column::TransactionType)
            .column_as(Expr::col(transactions::Column::Id).count(), "count")
            .column_as(Expr::col(transactions::Column::Amount).sum(), "total_amount")
            .column_as(Expr::col(transactions::Column::FeeAmount).sum(), "total_fees")
            .filter(transactions::Column::AccountId.eq(account_id.into_inner()))
            .filter(transactions::Column::Status.eq(db::TransactionStatus::Completed));
        if let Some(from) = from {
            query = query.filter(transactions::Column::CreatedAt.gte(from));
        }
        if let Some(to) = to {
            query = query.filter(transactions::Column::CreatedAt.lt(to));
        }

        let rows = query
            .group_by(transactions::Column::TransactionType)
            .order_by_asc(transactions::Column::TransactionType)
            .into_model::<SummaryRow>()
            .all(&self.txn)
            .await
            .map_err(db_err)?;

        Ok(rows
            .into_iter()
            .map(|row| TransactionSummary {
                transaction_type: row.transaction_type.into(),
                count: u64::try_from(row.count).unwrap_or_default(),
                total_amount: row.total_amount.unwrap_or_default(),
                total_fees: row.total_fees.unwrap_or_default(),
            })
            .collect())
    }
}

impl ExceptionStore for SeaUnitOfWork {
    async fn insert_exception(&self, exception: &SettlementException) -> Result<(), LedgerError> {
        convert::new_exception(exception)
            .insert(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn list_open_exceptions(
        &self,
        limit: u64,
    ) -> Result<Vec<SettlementException>, LedgerError> {
        settlement_exceptions::Entity::find()
            .filter(settlement_exceptions::Column::Status.eq(db::ExceptionStatus::Open))
            .order_by_asc(settlement_exceptions::Column::CreatedAt)
            .limit(limit)
            .all(&self.txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(convert::exception)
            .collect()
    }

    async fn save_exception(&self, exception: &SettlementException) -> Result<(), LedgerError> {
        let model = settlement_exceptions::ActiveModel {
            id: Unchanged(exception.id.into_inner()),
            status: Set(exception.status.into()),
            resolution: Set(exception.resolution.clone()),
            updated_at: Set(stamp(exception.updated_at)),
            ..Default::default()
        };
        model.update(&self.txn).await.map_err(db_err)?;
        Ok(())
    }
}

impl UnitOfWork for SeaUnitOfWork {
    async fn commit(self) -> Result<(), LedgerError> {
        self.txn.commit().await.map_err(db_err)
    }

    async fn rollback(self) -> Result<(), LedgerError> {
        self.txn.rollback().await.map_err(db_err)
    }
}

//! Row <-> domain conversions.

use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::ActiveValue::Set;
use vaultline_core::ledger::{
    Account, AccountType, LedgerError, TransactionRecord, TransactionStatus, TransactionType,
    VirtualAccount,
};
use vaultline_core::settlement::{ExceptionStage, ExceptionStatus, SettlementException};
use vaultline_shared::types::{
    AccountId, Currency, ExceptionId, OwnerId, TransactionId, VirtualAccountId,
};

use crate::entities::{
    accounts, sea_orm_active_enums as db, settlement_exceptions, transactions, virtual_accounts,
};

fn utc(ts: DateTimeWithTimeZone) -> DateTime<Utc> {
    ts.with_timezone(&Utc)
}

pub(crate) fn stamp(ts: DateTime<Utc>) -> DateTimeWithTimeZone {
    ts.into()
}

impl From<AccountType> for db::AccountType {
    fn from(value: AccountType) -> Self {
        match value {
            AccountType::User => Self::User,
            AccountType::Store => Self::Store,
            AccountType::Platform => Self::Platform,
        }
    }
}

impl From<db::AccountType> for AccountType {
    fn from(value: db::AccountType) -> Self {
        match value {
            db::AccountType::User => Self::User,
            db::AccountType::Store => Self::Store,
            db::AccountType::Platform => Self::Platform,
        }
    }
}

impl From<TransactionType> for db::TransactionType {
    fn from(value: TransactionType) -> Self {
        match value {
            TransactionType::Credit => Self::Credit,
            TransactionType::Debit => Self::Debit,
            TransactionType::Withdrawal => Self::Withdrawal,
            TransactionType::ProductPayment => Self::ProductPayment,
            TransactionType::Subscription => Self::Subscription,
            TransactionType::Fee => Self::Fee,
        }
    }
}

impl From<db::TransactionType> for TransactionType {
    fn from(value: db::TransactionType) -> Self {
        match value {
            db::TransactionType::Credit => Self::Credit,
            db::TransactionType::Debit => Self::Debit,
            db::TransactionType::Withdrawal => Self::Withdrawal,
            db::TransactionType::ProductPayment => Self::ProductPayment,
            db::TransactionType::Subscription => Self::Subscription,
            db::TransactionType::Fee => Self::Fee,
        }
    }
}

impl From<TransactionStatus> for db::TransactionStatus {
    fn from(value: TransactionStatus) -> Self {
        match value {
            TransactionStatus::Pending => Self::Pending,
            TransactionStatus::Completed => Self::Completed,
            TransactionStatus::Failed => Self::Failed,
        }
    }
}

impl From<db::TransactionStatus> for TransactionStatus {
    fn from(value: db::TransactionStatus) -> Self {
        match value {
            db::TransactionStatus::Pending => Self::Pending,
            db::TransactionStatus::Completed => Self::Completed,
            db::TransactionStatus::Failed => Self::Failed,
        }
    }
}

impl From<ExceptionStage> for db::ExceptionStage {
    fn from(value: ExceptionStage) -> Self {
        match value {
            ExceptionStage::Transfer => Self::Transfer,
            ExceptionStage::Commit => Self::Commit,
            ExceptionStage::Interrupted => Self::Interrupted,
        }
    }
}

impl From<db::ExceptionStage> for ExceptionStage {
    fn from(value: db::ExceptionStage) -> Self {
        match value {
            db::ExceptionStage::Transfer => Self::Transfer,
            db::ExceptionStage::Commit => Self::Commit,
            db::ExceptionStage::Interrupted => Self::Interrupted,
        }
    }
}

impl From<ExceptionStatus> for db::ExceptionStatus {
    fn from(value: ExceptionStatus) -> Self {
        match value {
            ExceptionStatus::Open => Self::Open,
            ExceptionStatus::Resolved => Self::Resolved,
            ExceptionStatus::Escalated => Self::Escalated,
        }
    }
}

impl From<db::ExceptionStatus> for ExceptionStatus {
    fn from(value: db::ExceptionStatus) -> Self {
        match value {
            db::ExceptionStatus::Open => Self::Open,
            db::ExceptionStatus::Resolved => Self::Resolved,
            db::ExceptionStatus::Escalated => Self::Escalated,
        }
    }
}

pub(crate) fn account(model: accounts::Model) -> Result<Account, LedgerError> {
    let currency: Currency = model.currency.parse().map_err(LedgerError::persistence)?;
    Ok(Account {
        id: AccountId::from_uuid(model.id),
        owner_id: OwnerId::from_uuid(model.owner_id),
        account_type: model.account_type.into(),
        account_key: model.account_key,
        currency,
        balance: model.balance,
        is_active: model.is_active,
        is_fundable: model.is_fundable,
        is_withdrawable: model.is_withdrawable,
        is_suspended: model.is_suspended,
        locked: model.locked,
        lock_reason: model.lock_reason,
        locked_at: model.locked_at.map(utc),
        created_at: utc(model.created_at),
        updated_at: utc(model.updated_at),
    })
}

pub(crate) fn new_account(account: &Account) -> accounts::ActiveModel {
    accounts::ActiveModel {
        id: Set(account.id.into_inner()),
        owner_id: Set(account.owner_id.into_inner()),
        account_type: Set(account.account_type.into()),
        account_key: Set(account.account_key.clone()),
        currency: Set(account.currency.code().to_string()),
        balance: Set(account.balance),
        is_active: Set(account.is_active),
        is_fundable: Set(account.is_fundable),
        is_withdrawable: Set(account.is_withdrawable),
        is_suspended: Set(account.is_suspended),
        locked: Set(account.locked),
        lock_reason: Set(account.lock_reason.clone()),
        locked_at: Set(account.locked_at.map(stamp)),
        created_at: Set(stamp(account.created_at)),
        updated_at: Set(stamp(account.updated_at)),
    }
}

pub(crate) fn virtual_account(model: virtual_accounts::Model) -> VirtualAccount {
    VirtualAccount {
        id: VirtualAccountId::from_uuid(model.id),
        account_id: AccountId::from_uuid(model.account_id),
        account_number: model.account_number,
        account_name: model.account_name,
        bank_name: model.bank_name,
        bank_code: model.bank_code,
        email: model.email,
        phone: model.phone,
        provider_reference: model.provider_reference,
        is_active: model.is_active,
        created_at: utc(model.created_at),
    }
}

pub(crate) fn new_virtual_account(link: &VirtualAccount) -> virtual_accounts::ActiveModel {
    virtual_accounts::ActiveModel {
        id: Set(link.id.into_inner()),
        account_id: Set(link.account_id.into_inner()),
        account_number: Set(link.account_number.clone()),
        account_name: Set(link.account_name.clone()),
        bank_name: Set(link.bank_name.clone()),
        bank_code: Set(link.bank_code.clone()),
        email: Set(link.email.clone()),
        phone: Set(link.phone.clone()),
        provider_reference: Set(link.provider_reference.clone()),
        is_active: Set(link.is_active),
        created_at: Set(stamp(link.created_at)),
    }
}

pub(crate) fn transaction(model: transactions::Model) -> TransactionRecord {
    TransactionRecord {
        id: TransactionId::from_uuid(model.id),
        account_id: AccountId::from_uuid(model.account_id),
        virtual_account_id: model.virtual_account_id.map(VirtualAccountId::from_uuid),
        transaction_type: model.transaction_type.into(),
        amount: model.amount,
        fee_amount: model.fee_amount,
        status: model.status.into(),
        reference: model.reference,
        description: model.description,
        completed_at: model.completed_at.map(utc),
        created_at: utc(model.created_at),
        updated_at: utc(model.updated_at),
    }
}

pub(crate) fn new_transaction(record: &TransactionRecord) -> transactions::ActiveModel {
    transactions::ActiveModel {
        id: Set(record.id.into_inner()),
        account_id: Set(record.account_id.into_inner()),
        virtual_account_id: Set(record.virtual_account_id.map(VirtualAccountId::into_inner)),
        transaction_type: Set(record.transaction_type.into()),
        amount: Set(record.amount),
        fee_amount: Set(record.fee_amount),
        status: Set(record.status.into()),
        reference: Set(record.reference.clone()),
        description: Set(record.description.clone()),
        completed_at: Set(record.completed_at.map(stamp)),
        created_at: Set(stamp(record.created_at)),
        updated_at: Set(stamp(record.updated_at)),
    }
}

pub(crate) fn exception(
    model: settlement_exceptions::Model,
) -> Result<SettlementException, LedgerError> {
    let transfer_references: Vec<String> =
        serde_json::from_value(model.transfer_references).map_err(LedgerError::persistence)?;
    Ok(SettlementException {
        id: ExceptionId::from_uuid(model.id),
        reference: model.reference,
        stage: model.stage.into(),
        reason: model.reason,
        transfer_references,
        status: model.status.into(),
        resolution: model.resolution,
        created_at: utc(model.created_at),
        updated_at: utc(model.updated_at),
    })
}

pub(crate) fn new_exception(exception: &SettlementException) -> settlement_exceptions::ActiveModel {
    settlement_exceptions::ActiveModel {
        id: Set(exception.id.into_inner()),
        reference: Set(exception.reference.clone()),
        stage: Set(exception.stage.into()),
        reason: Set(exception.reason.clone()),
        transfer_references: Set(serde_json::Value::from(
            exception.transfer_references.clone(),
        )),
        status: Set(exception.status.into()),
        resolution: Set(exception.resolution.clone()),
        created_at: Set(stamp(exception.created_at)),
        updated_at: Set(stamp(exception.updated_at)),
    }
}

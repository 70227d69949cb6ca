//! Account Mutator: the only code that changes a balance.
//!
//! The pure functions operate on an `Account` value. The `*_locked` variants
//! take the row lock inside a unit of work, apply the change, and write the
//! account back without committing; the caller owns the commit boundary.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::debug;
use vaultline_shared::types::AccountId;

use super::error::LedgerError;
use super::store::AccountStore;
use super::types::Account;

/// Credit/debit primitives enforcing the balance and gating invariants.
pub struct AccountMutator;

impl AccountMutator {
    /// True iff the account is not locked, not suspended, and fundable.
    #[must_use]
    pub fn can_credit(account: &Account) -> bool {
        Self::credit_block_reason(account).is_none()
    }

    /// True iff the account is not locked, not suspended, withdrawable, and
    /// holds at least `amount`.
    #[must_use]
    pub fn can_debit(account: &Account, amount: Decimal) -> bool {
        Self::debit_block_reason(account, amount).is_none()
    }

    fn credit_block_reason(account: &Account) -> Option<&'static str> {
        if account.locked {
            Some("account is locked")
        } else if account.is_suspended {
            Some("account is suspended")
        } else if !account.is_fundable {
            Some("account does not accept credits")
        } else {
            None
        }
    }

    fn debit_block_reason(account: &Account, amount: Decimal) -> Option<&'static str> {
        if account.locked {
            Some("account is locked")
        } else if account.is_suspended {
            Some("account is suspended")
        } else if !account.is_withdrawable {
            Some("account does not allow debits")
        } else if account.balance < amount {
            Some("insufficient balance")
        } else {
            None
        }
    }

    /// [`Self::can_credit`] as a `Result` carrying the reason.
    ///
    /// # Errors
    ///
    /// `InvalidState` naming the blocking condition.
    pub fn check_credit(account: &Account) -> Result<(), LedgerError> {
        match Self::credit_block_reason(account) {
            Some(reason) => Err(LedgerError::invalid_state(format!(
                "cannot credit account {}: {reason}",
                account.id
            ))),
            None => Ok(()),
        }
    }

    /// [`Self::can_debit`] as a `Result` carrying the reason.
    ///
    /// # Errors
    ///
    /// `InvalidState` naming the blocking condition.
    pub fn check_debit(account: &Account, amount: Decimal) -> Result<(), LedgerError> {
        match Self::debit_block_reason(account, amount) {
            Some(reason) => Err(LedgerError::invalid_state(format!(
                "cannot debit account {}: {reason}",
                account.id
            ))),
            None => Ok(()),
        }
    }

    fn ensure_positive(amount: Decimal) -> Result<(), LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::validation("amount must be greater than zero"));
        }
        Ok(())
    }

    /// Increases the balance by `amount`.
    ///
    /// # Errors
    ///
    /// `Validation` for a non-positive amount, `InvalidState` if the account
    /// cannot be credited. The account is unchanged on error.
    pub fn credit(account: &mut Account, amount: Decimal, now: DateTime<Utc>) -> Result<(), LedgerError> {
        Self::ensure_positive(amount)?;
        Self::check_credit(account)?;
        account.balance = account
            .balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::invalid_state("balance overflow"))?;
        account.updated_at = now;
        Ok(())
    }

    /// Decreases the balance by `amount`.
    ///
    /// # Errors
    ///
    /// `Validation` for a non-positive amount, `InvalidState` if the account
    /// cannot be debited (gating flags or insufficient balance). The account
    /// is unchanged on error.
    pub fn debit(account: &mut Account, amount: Decimal, now: DateTime<Utc>) -> Result<(), LedgerError> {
        Self::ensure_positive(amount)?;
        Self::check_debit(account, amount)?;
        account.balance -= amount;
        account.updated_at = now;
        Ok(())
    }

    async fn lock<S: AccountStore>(store: &S, account_id: AccountId) -> Result<Account, LedgerError> {
        store
            .lock_account(account_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))
    }

    /// Locks the row, credits it, and writes it back inside `store`'s unit of work.
    ///
    /// # Errors
    ///
    /// `AccountNotFound` plus everything [`Self::credit`] returns.
    pub async fn credit_locked<S: AccountStore>(
        store: &S,
        account_id: AccountId,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Account, LedgerError> {
        let mut account = Self::lock(store, account_id).await?;
        Self::credit(&mut account, amount, now)?;
        store.save_account(&account).await?;
        debug!(%account_id, %amount, balance = %account.balance, "account credited");
        Ok(account)
    }

    /// Locks the row, debits it, and writes it back inside `store`'s unit of work.
    ///
    /// # Errors
    ///
    /// `AccountNotFound` plus everything [`Self::debit`] returns.
    pub async fn debit_locked<S: AccountStore>(
        store: &S,
        account_id: AccountId,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Account, LedgerError> {
        let mut account = Self::lock(store, account_id).await?;
        Self::debit(&mut account, amount, now)?;
        store.save_account(&account).await?;
        debug!(%account_id, %amount, balance = %account.balance, "account debited");
        Ok(account)
    }
}

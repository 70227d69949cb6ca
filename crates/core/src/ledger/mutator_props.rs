//! Property-based tests for the Account Mutator.
//!
//! - Balance never goes negative under any sequence of credits and debits
//! - Gating flags reject every amount

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use vaultline_shared::types::{Currency, OwnerId};

use super::error::LedgerError;
use super::mutator::AccountMutator;
use super::types::{Account, AccountType};

/// Amounts from 0.01 to 10,000.00.
fn amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Credit(Decimal),
    Debit(Decimal),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![amount().prop_map(Op::Credit), amount().prop_map(Op::Debit)]
}

fn account(balance: Decimal) -> Account {
    let mut account = Account::open(
        OwnerId::new(),
        AccountType::User,
        Currency::Ngn,
        "ACC-PROP".to_string(),
        Utc::now(),
    );
    account.balance = balance;
    account
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Every debit that would overdraw is rejected and changes nothing;
    /// every accepted operation moves the balance by exactly its amount.
    #[test]
    fn prop_balance_never_negative(
        opening in amount(),
        ops in prop::collection::vec(op(), 1..40),
    ) {
        let mut acc = account(opening);
        for op in ops {
            let before = acc.balance;
            match op {
                Op::Credit(value) => {
                    AccountMutator::credit(&mut acc, value, Utc::now()).unwrap();
                    prop_assert_eq!(acc.balance, before + value);
                }
                Op::Debit(value) => {
                    let result = AccountMutator::debit(&mut acc, value, Utc::now());
                    if value > before {
                        prop_assert!(
                            matches!(result, Err(LedgerError::InvalidState(_))),
                            "overdraft accepted: {:?}",
                            result
                        );
                        prop_assert_eq!(acc.balance, before);
                    } else {
                        prop_assert!(result.is_ok());
                        prop_assert_eq!(acc.balance, before - value);
                    }
                }
            }
            prop_assert!(acc.balance >= Decimal::ZERO);
        }
    }

    /// An unfundable account rejects every credit.
    #[test]
    fn prop_unfundable_rejects_credit(opening in amount(), value in amount()) {
        let mut acc = account(opening);
        acc.is_fundable = false;
        prop_assert!(AccountMutator::credit(&mut acc, value, Utc::now()).is_err());
        prop_assert_eq!(acc.balance, opening);
    }

    /// A locked account rejects every debit, however well funded.
    #[test]
    fn prop_locked_rejects_debit(value in amount()) {
        let mut acc = account(value * Decimal::from(10));
        acc.locked = true;
        prop_assert!(!AccountMutator::can_debit(&acc, value));
        prop_assert!(AccountMutator::debit(&mut acc, value, Utc::now()).is_err());
        prop_assert_eq!(acc.balance, value * Decimal::from(10));
    }
}

//! Settlement scenarios against the in-memory store and scripted provider.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use vaultline_shared::types::{AccountId, Currency};

use super::*;
use crate::ledger::{Account, AccountType, FeePolicy, LedgerError, TransactionStatus, TransactionType};
use crate::provider::ProviderError;
use crate::testing::{MemoryStore, MockProvider, Scripted};

const BUYER: &str = "1000000001";
const SELLER: &str = "2000000002";
const PLATFORM: &str = "3000000003";

struct Fixture {
    store: Arc<MemoryStore>,
    provider: Arc<MockProvider>,
    orchestrator: SettlementOrchestrator<MemoryStore, MockProvider>,
    buyer: Account,
    seller: Account,
    platform: Account,
}

fn fixture() -> Fixture {
    fixture_with(true, dec!(500))
}

fn fixture_with(with_platform: bool, provider_balance: Decimal) -> Fixture {
    let store = Arc::new(MemoryStore::default());
    let buyer = store.seed(AccountType::User, dec!(500), BUYER);
    let seller = store.seed(AccountType::Store, Decimal::ZERO, SELLER);
    let platform = if with_platform {
        store.seed(AccountType::Platform, Decimal::ZERO, PLATFORM)
    } else {
        store.seed(AccountType::User, Decimal::ZERO, PLATFORM)
    };
    let provider = Arc::new(MockProvider::default().with_balance(BUYER, provider_balance));
    let orchestrator = SettlementOrchestrator::new(
        Arc::clone(&store),
        Arc::clone(&provider),
        FeePolicy::default(),
        Currency::Ngn,
        Duration::from_millis(100),
    );
    Fixture {
        store,
        provider,
        orchestrator,
        buyer,
        seller,
        platform,
    }
}

fn product(f: &Fixture, amount: Decimal) -> ProductPayment {
    ProductPayment {
        buyer_account_id: f.buyer.id,
        store_account_id: f.seller.id,
        product_ref: "PROD-42".to_string(),
        amount,
    }
}

impl Fixture {
    fn balances(&self) -> (Decimal, Decimal, Decimal) {
        (
            self.store.balance(self.buyer.id),
            self.store.balance(self.seller.id),
            self.store.balance(self.platform.id),
        )
    }

    fn statuses(&self) -> Vec<TransactionStatus> {
        self.store
            .snapshot()
            .transactions
            .iter()
            .map(|t| t.status)
            .collect()
    }
}

#[tokio::test]
async fn test_product_payment_moves_balances_and_fee() {
    let f = fixture();
    let result = f
        .orchestrator
        .settle_product_payment(product(&f, dec!(100)))
        .await
        .unwrap();

    assert_eq!(result.fee, dec!(1.50));
    assert_eq!(result.net_amount, dec!(98.50));
    assert_eq!(f.balances(), (dec!(400), dec!(98.50), dec!(1.50)));

    let legs = f.store.legs(&result.reference);
    assert_eq!(legs.len(), 3);
    assert!(legs.iter().all(|l| l.status == TransactionStatus::Completed));
    assert!(legs.iter().all(|l| l.completed_at.is_some()));

    let debit = legs.iter().find(|l| l.account_id == f.buyer.id).unwrap();
    assert_eq!(debit.transaction_type, TransactionType::ProductPayment);
    assert_eq!(debit.amount, dec!(100));
    assert_eq!(debit.description.as_deref(), Some("Payment for product PROD-42"));

    let credit = legs.iter().find(|l| l.account_id == f.seller.id).unwrap();
    assert_eq!(credit.transaction_type, TransactionType::Credit);
    assert_eq!(credit.amount, dec!(98.50));
    assert_eq!(credit.fee_amount, dec!(1.50));

    let fee = legs.iter().find(|l| l.account_id == f.platform.id).unwrap();
    assert_eq!(fee.transaction_type, TransactionType::Fee);
    assert_eq!(fee.amount, dec!(1.50));

    let transfers = f.provider.transfers();
    assert_eq!(transfers.len(), 2);
    assert_eq!(transfers[0].reference, format!("{}-1", result.reference));
    assert_eq!(transfers[0].to_account, SELLER);
    assert_eq!(transfers[0].amount, dec!(98.50));
    assert_eq!(transfers[1].to_account, PLATFORM);
    assert_eq!(transfers[1].amount, dec!(1.50));
}

#[tokio::test]
async fn test_fee_that_rounds_to_zero_skips_fee_leg() {
    let f = fixture();
    let result = f
        .orchestrator
        .settle_product_payment(product(&f, dec!(0.30)))
        .await
        .unwrap();

    assert_eq!(result.fee, Decimal::ZERO);
    assert_eq!(f.store.legs(&result.reference).len(), 2);
    assert_eq!(f.provider.transfers().len(), 1);
    assert_eq!(f.balances(), (dec!(499.70), dec!(0.30), Decimal::ZERO));
}

#[tokio::test]
async fn test_rejected_transfer_fails_every_leg() {
    let f = fixture();
    f.provider.script([Scripted::Reject]);

    let err = f
        .orchestrator
        .settle_product_payment(product(&f, dec!(100)))
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::ExternalProvider(ProviderError::Api { .. })));
    assert_eq!(f.balances(), (dec!(500), Decimal::ZERO, Decimal::ZERO));
    let statuses = f.statuses();
    assert_eq!(statuses.len(), 3);
    assert!(statuses.iter().all(|s| *s == TransactionStatus::Failed));
    assert!(f.store.exceptions().is_empty());
}

#[tokio::test]
async fn test_second_transfer_failure_records_exception() {
    let f = fixture();
    f.provider.script([Scripted::Succeed, Scripted::NetworkError]);

    let err = f
        .orchestrator
        .settle_product_payment(product(&f, dec!(100)))
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(f.balances(), (dec!(500), Decimal::ZERO, Decimal::ZERO));
    assert!(f.statuses().iter().all(|s| *s == TransactionStatus::Failed));

    let exceptions = f.store.exceptions();
    assert_eq!(exceptions.len(), 1);
    let exception = &exceptions[0];
    assert_eq!(exception.stage, ExceptionStage::Transfer);
    assert_eq!(exception.status, ExceptionStatus::Open);
    assert_eq!(
        exception.transfer_references,
        vec![
            format!("{}-1", exception.reference),
            format!("{}-2", exception.reference)
        ]
    );
}

#[tokio::test]
async fn test_provider_timeout_is_bounded() {
    let f = fixture();
    f.provider.script([Scripted::Hang]);

    let err = f
        .orchestrator
        .settle_product_payment(product(&f, dec!(100)))
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::ExternalProvider(ProviderError::Timeout)));
    assert!(f.statuses().iter().all(|s| *s == TransactionStatus::Failed));
    let exceptions = f.store.exceptions();
    assert_eq!(exceptions.len(), 1);
    assert_eq!(exceptions[0].transfer_references.len(), 1);
}

#[tokio::test]
async fn test_dropped_caller_still_finishes_settlement() {
    let f = fixture();
    f.provider.script([Scripted::Hang]);

    let abandoned = tokio::time::timeout(
        Duration::from_millis(20),
        f.orchestrator.settle_product_payment(product(&f, dec!(100))),
    )
    .await;
    assert!(abandoned.is_err());
    assert_eq!(f.provider.transfers().len(), 1);

    let mut waited = 0;
    while f.store.exceptions().is_empty() && waited < 200 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        waited += 1;
    }

    let statuses = f.statuses();
    assert_eq!(statuses.len(), 3);
    assert!(statuses.iter().all(|s| *s == TransactionStatus::Failed));
    let exceptions = f.store.exceptions();
    assert_eq!(exceptions.len(), 1);
    assert_eq!(
        exceptions[0].transfer_references,
        vec![format!("{}-1", exceptions[0].reference)]
    );
    assert_eq!(f.balances(), (dec!(500), Decimal::ZERO, Decimal::ZERO));
}

#[tokio::test]
async fn test_gateway_error_on_first_transfer_records_exception() {
    let f = fixture();
    f.provider.script([Scripted::GatewayError]);

    let err = f
        .orchestrator
        .settle_product_payment(product(&f, dec!(100)))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        LedgerError::ExternalProvider(ProviderError::Api { status: 502, .. })
    ));
    assert!(f.statuses().iter().all(|s| *s == TransactionStatus::Failed));
    let exceptions = f.store.exceptions();
    assert_eq!(exceptions.len(), 1);
    assert_eq!(exceptions[0].stage, ExceptionStage::Transfer);
    assert_eq!(
        exceptions[0].transfer_references,
        vec![format!("{}-1", exceptions[0].reference)]
    );
}

#[tokio::test]
async fn test_unconfirmed_transfer_is_a_failure() {
    let f = fixture();
    f.provider.script([Scripted::Pending]);

    let err = f
        .orchestrator
        .settle_product_payment(product(&f, dec!(100)))
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::ExternalProvider(_)));
    assert_eq!(f.balances(), (dec!(500), Decimal::ZERO, Decimal::ZERO));
    assert_eq!(f.store.exceptions().len(), 1);
}

#[tokio::test]
async fn test_commit_failure_after_transfers_flags_reconciliation() {
    let f = fixture();
    // Commit 1 records the legs, commit 2 applies them.
    f.store.fail_commit(2);

    let err = f
        .orchestrator
        .settle_product_payment(product(&f, dec!(100)))
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::Persistence(_)));
    assert_eq!(f.balances(), (dec!(500), Decimal::ZERO, Decimal::ZERO));
    assert!(f.statuses().iter().all(|s| *s == TransactionStatus::Failed));

    let exceptions = f.store.exceptions();
    assert_eq!(exceptions.len(), 1);
    assert_eq!(exceptions[0].stage, ExceptionStage::Commit);
    assert_eq!(exceptions[0].transfer_references.len(), 2);
}

#[tokio::test]
async fn test_insufficient_provider_balance_writes_nothing() {
    let f = fixture_with(true, dec!(50));

    let err = f
        .orchestrator
        .settle_product_payment(product(&f, dec!(100)))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        LedgerError::InsufficientFunds { available, required }
            if available == dec!(50) && required == dec!(100)
    ));
    assert_eq!(f.store.transaction_count(), 0);
    assert!(f.provider.transfers().is_empty());
}

#[tokio::test]
async fn test_insufficient_ledger_balance_is_rejected() {
    let f = fixture();

    let err = f
        .orchestrator
        .settle_product_payment(product(&f, dec!(600)))
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::InvalidState(_)));
    assert_eq!(f.store.transaction_count(), 0);
}

#[tokio::test]
async fn test_locked_buyer_cannot_pay() {
    let f = fixture();
    f.store.update_account(f.buyer.id, |a| a.locked = true);

    let err = f
        .orchestrator
        .settle_product_payment(product(&f, dec!(100)))
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::InvalidState(msg) if msg.contains("locked")));
    assert!(f.provider.transfers().is_empty());
    assert_eq!(f.store.balance(f.buyer.id), dec!(500));
}

#[tokio::test]
async fn test_missing_platform_account_is_configuration_error() {
    let f = fixture_with(false, dec!(500));

    let err = f
        .orchestrator
        .settle_product_payment(product(&f, dec!(100)))
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::AccountNotConfigured(_)));
    assert_eq!(err.http_status_code(), 500);
    assert_eq!(f.store.transaction_count(), 0);
}

#[tokio::test]
async fn test_inactive_virtual_account_is_configuration_error() {
    let f = fixture();
    f.store
        .update_virtual_account(f.seller.id, |va| va.is_active = false);

    let err = f
        .orchestrator
        .settle_product_payment(product(&f, dec!(100)))
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::AccountNotConfigured(_)));
    assert_eq!(f.store.transaction_count(), 0);
}

#[tokio::test]
async fn test_unknown_store_account_is_not_found() {
    let f = fixture();
    let unknown = AccountId::new();
    let mut payment = product(&f, dec!(10));
    payment.store_account_id = unknown;

    let err = f.orchestrator.settle_product_payment(payment).await.unwrap_err();

    assert!(matches!(err, LedgerError::AccountNotFound(id) if id == unknown.to_string()));
}

#[tokio::test]
async fn test_invalid_inputs_are_rejected_before_any_lookup() {
    let f = fixture();

    for amount in [Decimal::ZERO, dec!(-1), dec!(10.001)] {
        let err = f
            .orchestrator
            .settle_product_payment(product(&f, amount))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)), "amount {amount}");
    }

    let mut same = product(&f, dec!(10));
    same.store_account_id = same.buyer_account_id;
    assert!(matches!(
        f.orchestrator.settle_product_payment(same).await,
        Err(LedgerError::Validation(_))
    ));

    let mut unnamed = product(&f, dec!(10));
    unnamed.product_ref = "  ".to_string();
    assert!(matches!(
        f.orchestrator.settle_product_payment(unnamed).await,
        Err(LedgerError::Validation(_))
    ));
    assert_eq!(f.store.transaction_count(), 0);
}

#[tokio::test]
async fn test_subscription_payment_credits_platform() {
    let f = fixture();
    let result = f
        .orchestrator
        .settle_subscription_payment(SubscriptionPayment {
            user_account_id: f.buyer.id,
            store_ref: "STORE-7".to_string(),
            amount: dec!(200),
        })
        .await
        .unwrap();

    assert_eq!(result.fee, Decimal::ZERO);
    assert_eq!(result.net_amount, dec!(200));
    assert_eq!(f.balances(), (dec!(300), Decimal::ZERO, dec!(200)));

    let legs = f.store.legs(&result.reference);
    assert_eq!(legs.len(), 2);
    assert!(legs.iter().all(|l| l.transaction_type == TransactionType::Subscription));
    assert!(legs.iter().all(|l| l.status == TransactionStatus::Completed));
    assert_eq!(
        legs[0].description.as_deref(),
        Some("Subscription payment for store STORE-7")
    );

    let transfers = f.provider.transfers();
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0].from_account, BUYER);
    assert_eq!(transfers[0].to_account, PLATFORM);
}

#[tokio::test]
async fn test_subscription_transfer_failure_leaves_balances() {
    let f = fixture();
    f.provider.script([Scripted::Reject]);

    let err = f
        .orchestrator
        .settle_subscription_payment(SubscriptionPayment {
            user_account_id: f.buyer.id,
            store_ref: "STORE-7".to_string(),
            amount: dec!(200),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::ExternalProvider(_)));
    assert_eq!(f.balances(), (dec!(500), Decimal::ZERO, Decimal::ZERO));
    assert!(f.statuses().iter().all(|s| *s == TransactionStatus::Failed));
}

#[tokio::test]
async fn test_concurrent_payments_never_overdraw() {
    let f = fixture();
    let (a, b, c) = tokio::join!(
        f.orchestrator.settle_product_payment(product(&f, dec!(200))),
        f.orchestrator.settle_product_payment(product(&f, dec!(200))),
        f.orchestrator.settle_product_payment(product(&f, dec!(200))),
    );

    let succeeded = [a.is_ok(), b.is_ok(), c.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(succeeded, 2);
    assert_eq!(f.store.balance(f.buyer.id), dec!(100));
    assert_eq!(f.store.balance(f.seller.id), dec!(394));
}

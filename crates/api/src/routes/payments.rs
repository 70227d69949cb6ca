//! Payment routes: product purchases and store subscriptions.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::post,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;
use vaultline_core::ledger::LedgerStore;
use vaultline_core::provider::PaymentProvider;
use vaultline_core::settlement::{ProductPayment, SettlementResult, SubscriptionPayment};
use vaultline_shared::types::AccountId;

use super::owned_account;
use crate::AppState;
use crate::error::ApiError;
use crate::middleware::AuthUser;

/// Creates the payment routes.
pub fn routes<S, P>() -> Router<AppState<S, P>>
where
    S: LedgerStore + 'static,
    P: PaymentProvider + 'static,
{
    Router::new()
        .route("/payments/products/{product_ref}", post(pay_for_product::<S, P>))
        .route("/payments/subscriptions/{store_ref}", post(pay_subscription::<S, P>))
}

/// Request body for a product purchase.
#[derive(Debug, Deserialize)]
pub struct ProductPaymentRequest {
    /// Buyer's account; must belong to the caller.
    pub buyer_account_id: AccountId,
    /// Store's account.
    pub store_account_id: AccountId,
    /// Gross amount.
    pub amount: Decimal,
}

/// Request body for a subscription charge.
#[derive(Debug, Deserialize)]
pub struct SubscriptionPaymentRequest {
    /// Payer's account; must belong to the caller.
    pub user_account_id: AccountId,
    /// Amount charged.
    pub amount: Decimal,
}

/// POST /payments/products/{product_ref}
async fn pay_for_product<S, P>(
    State(state): State<AppState<S, P>>,
    user: AuthUser,
    Path(product_ref): Path<String>,
    Json(request): Json<ProductPaymentRequest>,
) -> Result<(StatusCode, Json<SettlementResult>), ApiError>
where
    S: LedgerStore + 'static,
    P: PaymentProvider + 'static,
{
    owned_account(&state, &user, request.buyer_account_id).await?;
    let result = state
        .settlement
        .settle_product_payment(ProductPayment {
            buyer_account_id: request.buyer_account_id,
            store_account_id: request.store_account_id,
            product_ref,
            amount: request.amount,
        })
        .await?;
    info!(reference = %result.reference, caller = %user.owner_id(), "product payment settled");
    Ok((StatusCode::CREATED, Json(result)))
}

/// POST /payments/subscriptions/{store_ref}
async fn pay_subscription<S, P>(
    State(state): State<AppState<S, P>>,
    user: AuthUser,
    Path(store_ref): Path<String>,
    Json(request): Json<SubscriptionPaymentRequest>,
) -> Result<(StatusCode, Json<SettlementResult>), ApiError>
where
    S: LedgerStore + 'static,
    P: PaymentProvider + 'static,
{
    owned_account(&state, &user, request.user_account_id).await?;
    let result = state
        .settlement
        .settle_subscription_payment(SubscriptionPayment {
            user_account_id: request.user_account_id,
            store_ref,
            amount: request.amount,
        })
        .await?;
    info!(reference = %result.reference, caller = %user.owner_id(), "subscription payment settled");
    Ok((StatusCode::CREATED, Json(result)))
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::Harness;
    use axum::http::StatusCode;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use serde_json::{Value, json};
    use vaultline_core::ledger::{Account, AccountType};
    use vaultline_core::testing::{MockProvider, Scripted};

    struct Parties {
        buyer: Account,
        seller: Account,
        platform: Account,
    }

    fn setup() -> (Harness, Parties) {
        let harness =
            Harness::new(MockProvider::default().with_balance("1000000001", dec!(500)));
        let parties = Parties {
            buyer: harness.store.seed(AccountType::User, dec!(500), "1000000001"),
            seller: harness.store.seed(AccountType::Store, Decimal::ZERO, "2000000002"),
            platform: harness.store.seed(AccountType::Platform, Decimal::ZERO, "3000000003"),
        };
        (harness, parties)
    }

    fn decimal(value: &Value) -> Decimal {
        value.as_str().unwrap().parse().unwrap()
    }

    #[tokio::test]
    async fn test_product_payment_settles_three_legs() {
        let (harness, parties) = setup();
        let token = harness.token(parties.buyer.owner_id);

        let (status, body) = harness
            .post_json(
                "/api/v1/payments/products/P-1",
                &token,
                &json!({
                    "buyer_account_id": parties.buyer.id,
                    "store_account_id": parties.seller.id,
                    "amount": "400.00"
                }),
            )
            .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Payment successful");
        assert_eq!(decimal(&body["fee"]), dec!(6));
        assert_eq!(decimal(&body["net_amount"]), dec!(394));
        assert_eq!(body["legs"].as_array().unwrap().len(), 3);
        assert_eq!(harness.store.balance(parties.buyer.id), dec!(100));
        assert_eq!(harness.store.balance(parties.seller.id), dec!(394));
        assert_eq!(harness.store.balance(parties.platform.id), dec!(6));
    }

    #[tokio::test]
    async fn test_cannot_spend_from_foreign_account() {
        let (harness, parties) = setup();
        let token = harness.token(parties.seller.owner_id);

        let (status, body) = harness
            .post_json(
                "/api/v1/payments/products/P-1",
                &token,
                &json!({
                    "buyer_account_id": parties.buyer.id,
                    "store_account_id": parties.seller.id,
                    "amount": "10"
                }),
            )
            .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "FORBIDDEN");
        assert_eq!(harness.store.transaction_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let (harness, _parties) = setup();

        let (status, body) = harness.get("/api/v1/accounts", None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_rejected_transfer_maps_to_bad_gateway() {
        let (harness, parties) = setup();
        harness.provider.script([Scripted::Reject]);
        let token = harness.token(parties.buyer.owner_id);

        let (status, body) = harness
            .post_json(
                "/api/v1/payments/subscriptions/S-9",
                &token,
                &json!({ "user_account_id": parties.buyer.id, "amount": "50" }),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "EXTERNAL_PROVIDER_ERROR");
        assert_eq!(harness.store.balance(parties.buyer.id), dec!(500));
        assert_eq!(harness.store.balance(parties.platform.id), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_subscription_credits_platform() {
        let (harness, parties) = setup();
        let token = harness.token(parties.buyer.owner_id);

        let (status, body) = harness
            .post_json(
                "/api/v1/payments/subscriptions/S-9",
                &token,
                &json!({ "user_account_id": parties.buyer.id, "amount": "50" }),
            )
            .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["legs"].as_array().unwrap().len(), 2);
        assert_eq!(harness.store.balance(parties.platform.id), dec!(50));
    }

    #[tokio::test]
    async fn test_non_positive_amount_is_rejected() {
        let (harness, parties) = setup();
        let token = harness.token(parties.buyer.owner_id);

        let (status, body) = harness
            .post_json(
                "/api/v1/payments/subscriptions/S-9",
                &token,
                &json!({ "user_account_id": parties.buyer.id, "amount": "0" }),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }
}

//! Transaction history routes.
//!
//! History is scoped to the caller: account listings check ownership first,
//! and a reference lookup only returns the legs on the caller's accounts.

use std::collections::HashSet;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use vaultline_core::ledger::{
    LedgerStore, TransactionFilter, TransactionRecord, TransactionStatus, TransactionSummary,
    TransactionType,
};
use vaultline_core::provider::PaymentProvider;
use vaultline_shared::AppError;
use vaultline_shared::types::{AccountId, PageRequest, PageResponse};

use super::owned_account;
use crate::AppState;
use crate::error::ApiError;
use crate::middleware::AuthUser;

/// Creates the transaction routes (requires auth middleware to be applied externally).
pub fn routes<S, P>() -> Router<AppState<S, P>>
where
    S: LedgerStore + 'static,
    P: PaymentProvider + 'static,
{
    Router::new()
        .route("/accounts/{account_id}/transactions", get(account_history::<S, P>))
        .route("/accounts/{account_id}/summary", get(account_summary::<S, P>))
        .route("/transactions", get(owner_history::<S, P>))
        .route("/transactions/{reference}", get(by_reference::<S, P>))
}

/// Query parameters for history listings.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    /// Filter by movement kind.
    #[serde(rename = "type")]
    pub transaction_type: Option<TransactionType>,
    /// Filter by status.
    pub status: Option<TransactionStatus>,
    /// Inclusive lower bound on creation time.
    pub created_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on creation time.
    pub created_to: Option<DateTime<Utc>>,
    /// Page number, from 1.
    pub page: Option<u32>,
    /// Page size.
    pub per_page: Option<u32>,
}

impl HistoryQuery {
    fn filter(&self) -> TransactionFilter {
        TransactionFilter {
            transaction_type: self.transaction_type,
            status: self.status,
            created_from: self.created_from,
            created_to: self.created_to,
        }
    }

    fn page(&self) -> PageRequest {
        let defaults = PageRequest::default();
        PageRequest::new(
            self.page.unwrap_or(defaults.page),
            self.per_page.unwrap_or(defaults.per_page),
        )
    }
}

/// Query parameters for the account summary.
#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    /// Inclusive lower bound.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound.
    pub to: Option<DateTime<Utc>>,
}

/// GET /accounts/{account_id}/transactions
async fn account_history<S, P>(
    State(state): State<AppState<S, P>>,
    user: AuthUser,
    Path(account_id): Path<AccountId>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<PageResponse<TransactionRecord>>, ApiError>
where
    S: LedgerStore + 'static,
    P: PaymentProvider + 'static,
{
    owned_account(&state, &user, account_id).await?;
    let page = state
        .ledger
        .list_for_account(account_id, &query.filter(), &query.page())
        .await?;
    Ok(Json(page))
}

/// GET /accounts/{account_id}/summary
async fn account_summary<S, P>(
    State(state): State<AppState<S, P>>,
    user: AuthUser,
    Path(account_id): Path<AccountId>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<Vec<TransactionSummary>>, ApiError>
where
    S: LedgerStore + 'static,
    P: PaymentProvider + 'static,
{
    owned_account(&state, &user, account_id).await?;
    let totals = state.ledger.summary(account_id, query.from, query.to).await?;
    Ok(Json(totals))
}

/// GET /transactions
async fn owner_history<S, P>(
    State(state): State<AppState<S, P>>,
    user: AuthUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<PageResponse<TransactionRecord>>, ApiError>
where
    S: LedgerStore + 'static,
    P: PaymentProvider + 'static,
{
    let page = state
        .ledger
        .list_for_owner(user.owner_id(), &query.filter(), &query.page())
        .await?;
    Ok(Json(page))
}

/// GET /transactions/{reference}
async fn by_reference<S, P>(
    State(state): State<AppState<S, P>>,
    user: AuthUser,
    Path(reference): Path<String>,
) -> Result<Json<Vec<TransactionRecord>>, ApiError>
where
    S: LedgerStore + 'static,
    P: PaymentProvider + 'static,
{
    let owned: HashSet<AccountId> = state
        .ledger
        .owner_accounts(user.owner_id())
        .await?
        .into_iter()
        .map(|account| account.id)
        .collect();
    let legs: Vec<TransactionRecord> = state
        .ledger
        .related(&reference)
        .await?
        .into_iter()
        .filter(|leg| owned.contains(&leg.account_id))
        .collect();
    if legs.is_empty() {
        return Err(AppError::NotFound(format!("Transaction {reference} not found")).into());
    }
    Ok(Json(legs))
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::Harness;
    use axum::http::StatusCode;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use serde_json::{Value, json};
    use vaultline_core::ledger::{Account, AccountType};
    use vaultline_core::testing::MockProvider;

    struct Fixture {
        harness: Harness,
        buyer: Account,
        seller: Account,
        reference: String,
    }

    /// Settles one 400.00 product payment through the API.
    async fn paid() -> Fixture {
        let harness =
            Harness::new(MockProvider::default().with_balance("1000000001", dec!(500)));
        let buyer = harness.store.seed(AccountType::User, dec!(500), "1000000001");
        let seller = harness.store.seed(AccountType::Store, Decimal::ZERO, "2000000002");
        harness.store.seed(AccountType::Platform, Decimal::ZERO, "3000000003");
        let token = harness.token(buyer.owner_id);
        let (status, body) = harness
            .post_json(
                "/api/v1/payments/products/P-1",
                &token,
                &json!({
                    "buyer_account_id": buyer.id,
                    "store_account_id": seller.id,
                    "amount": "400.00"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let reference = body["reference"].as_str().unwrap().to_string();
        Fixture {
            harness,
            buyer,
            seller,
            reference,
        }
    }

    fn decimal(value: &Value) -> Decimal {
        value.as_str().unwrap().parse().unwrap()
    }

    #[tokio::test]
    async fn test_account_history_lists_own_legs() {
        let fx = paid().await;
        let token = fx.harness.token(fx.buyer.owner_id);

        let (status, body) = fx
            .harness
            .get(
                &format!("/api/v1/accounts/{}/transactions?status=completed", fx.buyer.id),
                Some(&token),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["meta"]["total"], 1);
        assert_eq!(body["data"][0]["transaction_type"], "product_payment");
        assert_eq!(body["data"][0]["reference"], fx.reference.as_str());
        assert_eq!(decimal(&body["data"][0]["amount"]), dec!(400));
    }

    #[tokio::test]
    async fn test_history_type_filter_excludes_other_kinds() {
        let fx = paid().await;
        let token = fx.harness.token(fx.buyer.owner_id);

        let (status, body) = fx
            .harness
            .get(
                &format!("/api/v1/accounts/{}/transactions?type=credit", fx.buyer.id),
                Some(&token),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["meta"]["total"], 0);
        assert!(body["data"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_foreign_account_history_is_forbidden() {
        let fx = paid().await;
        let token = fx.harness.token(fx.buyer.owner_id);

        let (status, _) = fx
            .harness
            .get(
                &format!("/api/v1/accounts/{}/transactions", fx.seller.id),
                Some(&token),
            )
            .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_reference_lookup_returns_only_callers_legs() {
        let fx = paid().await;
        let uri = format!("/api/v1/transactions/{}", fx.reference);

        let buyer_token = fx.harness.token(fx.buyer.owner_id);
        let (status, body) = fx.harness.get(&uri, Some(&buyer_token)).await;
        assert_eq!(status, StatusCode::OK);
        let legs = body.as_array().unwrap();
        assert_eq!(legs.len(), 1);
        assert_eq!(legs[0]["account_id"], fx.buyer.id.to_string());

        let seller_token = fx.harness.token(fx.seller.owner_id);
        let (status, body) = fx.harness.get(&uri, Some(&seller_token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["transaction_type"], "credit");
        assert_eq!(decimal(&body[0]["fee_amount"]), dec!(6));
    }

    #[tokio::test]
    async fn test_unknown_reference_is_not_found() {
        let fx = paid().await;
        let token = fx.harness.token(fx.buyer.owner_id);

        let (status, body) = fx
            .harness
            .get("/api/v1/transactions/TXN-MISSING", Some(&token))
            .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_owner_history_spans_accounts() {
        let fx = paid().await;
        let token = fx.harness.token(fx.seller.owner_id);

        let (status, body) = fx.harness.get("/api/v1/transactions", Some(&token)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["meta"]["total"], 1);
        assert_eq!(body["meta"]["page"], 1);
    }

    #[tokio::test]
    async fn test_summary_totals_completed_legs() {
        let fx = paid().await;
        let token = fx.harness.token(fx.seller.owner_id);

        let (status, body) = fx
            .harness
            .get(&format!("/api/v1/accounts/{}/summary", fx.seller.id), Some(&token))
            .await;

        assert_eq!(status, StatusCode::OK);
        let totals = body.as_array().unwrap();
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0]["transaction_type"], "credit");
        assert_eq!(totals[0]["count"], 1);
        assert_eq!(decimal(&totals[0]["total_amount"]), dec!(394));
        assert_eq!(decimal(&totals[0]["total_fees"]), dec!(6));
    }

    #[tokio::test]
    async fn test_summary_rejects_empty_range() {
        let fx = paid().await;
        let token = fx.harness.token(fx.seller.owner_id);

        let (status, body) = fx
            .harness
            .get(
                &format!(
                    "/api/v1/accounts/{}/summary?from=2026-02-01T00:00:00Z&to=2026-01-01T00:00:00Z",
                    fx.seller.id
                ),
                Some(&token),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }
}

//! Account routes for the authenticated owner.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use vaultline_core::ledger::{Account, LedgerStore};
use vaultline_core::provider::PaymentProvider;
use vaultline_shared::types::AccountId;

use super::owned_account;
use crate::AppState;
use crate::error::ApiError;
use crate::middleware::AuthUser;

/// Creates the account routes (requires auth middleware to be applied externally).
pub fn routes<S, P>() -> Router<AppState<S, P>>
where
    S: LedgerStore + 'static,
    P: PaymentProvider + 'static,
{
    Router::new()
        .route("/accounts", get(list_accounts::<S, P>))
        .route("/accounts/{account_id}", get(get_account::<S, P>))
}

/// GET /accounts
async fn list_accounts<S, P>(
    State(state): State<AppState<S, P>>,
    user: AuthUser,
) -> Result<Json<Vec<Account>>, ApiError>
where
    S: LedgerStore + 'static,
    P: PaymentProvider + 'static,
{
    let accounts = state.ledger.owner_accounts(user.owner_id()).await?;
    Ok(Json(accounts))
}

/// GET /accounts/{account_id}
async fn get_account<S, P>(
    State(state): State<AppState<S, P>>,
    user: AuthUser,
    Path(account_id): Path<AccountId>,
) -> Result<Json<Account>, ApiError>
where
    S: LedgerStore + 'static,
    P: PaymentProvider + 'static,
{
    Ok(Json(owned_account(&state, &user, account_id).await?))
}

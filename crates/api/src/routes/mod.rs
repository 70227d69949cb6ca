//! API route definitions.

use std::sync::Arc;

use axum::{Router, middleware};
use tracing::warn;
use vaultline_core::ledger::{Account, LedgerStore};
use vaultline_core::provider::PaymentProvider;
use vaultline_shared::AppError;
use vaultline_shared::types::AccountId;

use crate::error::ApiError;
use crate::middleware::{AuthUser, auth_middleware};
use crate::AppState;

pub mod accounts;
pub mod health;
pub mod payments;
pub mod transactions;
pub mod webhooks;

/// Creates the API router.
///
/// Health and webhook routes are public; the webhook authenticates by
/// signature. Everything else requires a bearer token.
pub fn api_routes<S, P>(state: &AppState<S, P>) -> Router<AppState<S, P>>
where
    S: LedgerStore + 'static,
    P: PaymentProvider + 'static,
{
    let protected_routes = Router::new()
        .merge(accounts::routes())
        .merge(payments::routes())
        .merge(transactions::routes())
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state.jwt_service),
            auth_middleware,
        ));

    Router::new()
        .merge(health::routes())
        .merge(webhooks::routes())
        .merge(protected_routes)
}

/// Loads `id` and checks the caller owns it.
pub(crate) async fn owned_account<S, P>(
    state: &AppState<S, P>,
    user: &AuthUser,
    id: AccountId,
) -> Result<Account, ApiError>
where
    S: LedgerStore,
    P: PaymentProvider,
{
    let account = state.ledger.account(id).await?;
    if account.owner_id != user.owner_id() {
        warn!(account_id = %id, caller = %user.owner_id(), "access to foreign account refused");
        return Err(AppError::Forbidden("Account belongs to another owner".to_string()).into());
    }
    Ok(account)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header::AUTHORIZATION};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;
    use vaultline_core::testing::{MemoryStore, MockProvider};
    use vaultline_shared::JwtService;
    use vaultline_shared::config::SettlementConfig;
    use vaultline_shared::types::OwnerId;

    use crate::{AppState, create_router};

    pub(crate) const JWT_SECRET: &str = "test-jwt-secret";

    pub(crate) struct Harness {
        pub store: Arc<MemoryStore>,
        pub provider: Arc<MockProvider>,
        pub app: Router,
        jwt: JwtService,
    }

    impl Harness {
        pub fn new(provider: MockProvider) -> Self {
            let store = Arc::new(MemoryStore::default());
            let provider = Arc::new(provider);
            let state = AppState::new(
                Arc::clone(&store),
                Arc::clone(&provider),
                JwtService::new(JWT_SECRET),
                &SettlementConfig::default(),
                Duration::from_millis(200),
            )
            .unwrap();
            Self {
                store,
                provider,
                app: create_router(state),
                jwt: JwtService::new(JWT_SECRET),
            }
        }

        pub fn token(&self, owner: OwnerId) -> String {
            self.jwt
                .issue(owner, "user", chrono::Duration::minutes(5))
                .unwrap()
        }

        pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
            let mut request = Request::builder().method("GET").uri(uri);
            if let Some(token) = token {
                request = request.header(AUTHORIZATION, format!("Bearer {token}"));
            }
            self.send(request.body(Body::empty()).unwrap()).await
        }

        pub async fn post_json(&self, uri: &str, token: &str, body: &Value) -> (StatusCode, Value) {
            let request = Request::builder()
                .method("POST")
                .uri(uri)
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap();
            self.send(request).await
        }

        pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
            let response = self.app.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            (status, json)
        }
    }
}

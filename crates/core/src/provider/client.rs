//! Payment provider trait and its HTTP implementation.

use std::future::Future;

use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, warn};
use vaultline_shared::config::ProviderConfig;

use super::error::ProviderError;
use super::signature::WebhookVerifier;
use super::types::{
    CustomerProfile, Envelope, TransferReceipt, TransferRequest, TransferState,
    VirtualAccountDetails, decimal_from_json,
};

/// Operations the ledger needs from the payment provider.
pub trait PaymentProvider: Send + Sync {
    /// Issues a virtual bank account for a customer.
    fn create_virtual_account(
        &self,
        profile: &CustomerProfile,
    ) -> impl Future<Output = Result<VirtualAccountDetails, ProviderError>> + Send;

    /// Available balance of a virtual account.
    fn get_balance(
        &self,
        account_number: &str,
    ) -> impl Future<Output = Result<Decimal, ProviderError>> + Send;

    /// Moves money between two virtual accounts.
    fn transfer(
        &self,
        request: &TransferRequest,
    ) -> impl Future<Output = Result<TransferReceipt, ProviderError>> + Send;

    /// Current state of a transfer by its reference.
    fn transfer_status(
        &self,
        reference: &str,
    ) -> impl Future<Output = Result<TransferState, ProviderError>> + Send;

    /// Checks a webhook signature over the raw request body.
    fn verify_signature(&self, signature: &str, raw_body: &[u8]) -> bool;
}

/// REST client for the provider API.
#[derive(Debug, Clone)]
pub struct HttpPaymentProvider {
    base_url: String,
    secret_key: String,
    http: reqwest::Client,
    verifier: WebhookVerifier,
}

impl HttpPaymentProvider {
    /// Builds a client from explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Configuration` for an empty key or base URL.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        if config.secret_key.trim().is_empty() {
            return Err(ProviderError::Configuration(
                "provider secret key is empty".to_string(),
            ));
        }
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ProviderError::Configuration(
                "provider base URL is empty".to_string(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ProviderError::Configuration(e.to_string()))?;

        Ok(Self {
            base_url,
            secret_key: config.secret_key.clone(),
            http,
            verifier: WebhookVerifier::new(config.webhook_secret())?,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// Unwraps the provider envelope, mapping failures to `ProviderError`.
    async fn read_envelope(response: reqwest::Response) -> Result<Value, ProviderError> {
        let status = response.status();
        let text = response.text().await?;
        let envelope = serde_json::from_str::<Envelope>(&text);

        if !status.is_success() {
            let message = envelope
                .ok()
                .and_then(|e| e.message)
                .unwrap_or_else(|| text.chars().take(200).collect());
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let envelope = envelope.map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
        if !envelope.status {
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: envelope
                    .message
                    .unwrap_or_else(|| "request rejected".to_string()),
            });
        }
        Ok(envelope.data)
    }
}

fn string_field(data: &Value, field: &str) -> Result<String, ProviderError> {
    match &data[field] {
        Value::String(s) if !s.is_empty() => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(ProviderError::MalformedResponse(format!(
            "missing field `{field}`"
        ))),
    }
}

impl PaymentProvider for HttpPaymentProvider {
    async fn create_virtual_account(
        &self,
        profile: &CustomerProfile,
    ) -> Result<VirtualAccountDetails, ProviderError> {
        let response = self
            .http
            .post(self.url("virtual-account/create"))
            .bearer_auth(&self.secret_key)
            .json(profile)
            .send()
            .await?;
        let data = Self::read_envelope(response).await?;

        let details = VirtualAccountDetails {
            account_number: string_field(&data, "account_number")?,
            account_name: string_field(&data, "account_name")?,
            bank_name: string_field(&data, "bank_name")?,
            bank_code: string_field(&data, "bank_code")?,
            reference: string_field(&data, "reference")?,
        };
        debug!(account_number = %details.account_number, "virtual account created");
        Ok(details)
    }

    async fn get_balance(&self, account_number: &str) -> Result<Decimal, ProviderError> {
        let response = self
            .http
            .get(self.url(&format!("virtual-account/balance/{account_number}")))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;
        let data = Self::read_envelope(response).await?;

        decimal_from_json(&data["balance"])
            .ok_or_else(|| ProviderError::MalformedResponse("missing field `balance`".to_string()))
    }

    async fn transfer(&self, request: &TransferRequest) -> Result<TransferReceipt, ProviderError> {
        let response = self
            .http
            .post(self.url("virtual-account/transfer"))
            .bearer_auth(&self.secret_key)
            .json(request)
            .send()
            .await?;
        let data = Self::read_envelope(response).await?;

        // No status means no confirmation; the reconciliation sweep asks later.
        let state = data["status"]
            .as_str()
            .map_or(TransferState::Pending, TransferState::from_provider);
        let reference = data["reference"]
            .as_str()
            .map_or_else(|| request.reference.clone(), str::to_string);
        debug!(%reference, ?state, amount = %request.amount, "transfer submitted");
        Ok(TransferReceipt { reference, state })
    }

    async fn transfer_status(&self, reference: &str) -> Result<TransferState, ProviderError> {
        let response = self
            .http
            .get(self.url(&format!("transaction/verify/{reference}")))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(TransferState::NotFound);
        }
        let data = Self::read_envelope(response).await?;

        data["status"]
            .as_str()
            .map(TransferState::from_provider)
            .ok_or_else(|| ProviderError::MalformedResponse("missing field `status`".to_string()))
    }

    fn verify_signature(&self, signature: &str, raw_body: &[u8]) -> bool {
        let valid = self.verifier.verify(signature, raw_body);
        if !valid {
            warn!("webhook signature mismatch");
        }
        valid
    }
}

//! Provider request and response types.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use vaultline_shared::types::Currency;

/// Customer details sent when opening a virtual account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerProfile {
    /// Customer email.
    pub email: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Phone number.
    pub phone: String,
}

/// Virtual account issued by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualAccountDetails {
    /// Account number.
    pub account_number: String,
    /// Name on the account.
    pub account_name: String,
    /// Issuing bank.
    pub bank_name: String,
    /// Issuing bank code.
    pub bank_code: String,
    /// Provider reference.
    pub reference: String,
}

/// Money movement between two provider-side accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferRequest {
    /// Source account number.
    pub from_account: String,
    /// Destination account number.
    pub to_account: String,
    /// Amount in major units.
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    /// Currency.
    pub currency: Currency,
    /// Narration shown on statements.
    pub narration: String,
    /// Idempotency key for this transfer, unique per call.
    pub reference: String,
}

/// Provider-side state of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferState {
    /// Funds moved.
    Successful,
    /// Still processing.
    Pending,
    /// Rejected or reversed.
    Failed,
    /// Provider has no record of the reference.
    NotFound,
}

impl TransferState {
    /// Maps provider status strings.
    #[must_use]
    pub fn from_provider(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "success" | "successful" | "completed" => Self::Successful,
            "pending" | "processing" | "queued" => Self::Pending,
            _ => Self::Failed,
        }
    }
}

/// Result of a transfer call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    /// The transfer reference echoed back.
    pub reference: String,
    /// State reported with the response.
    pub state: TransferState,
}

/// Standard response envelope: `{"status": bool, "message": str, "data": ...}`.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    #[serde(default)]
    pub status: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Value,
}

/// Reads a decimal from a JSON string or number without going through floats.
#[must_use]
pub fn decimal_from_json(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        Value::Number(n) => {
            let raw = n.to_string();
            Decimal::from_str(&raw)
                .or_else(|_| Decimal::from_scientific(&raw))
                .ok()
        }
        _ => None,
    }
}

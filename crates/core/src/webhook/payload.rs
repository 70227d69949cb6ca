//! Deposit notification payload.

use rust_decimal::Decimal;
use serde_json::Value;

use crate::ledger::LedgerError;
use crate::provider::types::decimal_from_json;

/// A validated virtual-account deposit notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositNotice {
    /// Virtual account that received the money.
    pub account_number: String,
    /// Amount deposited, always positive.
    pub amount: Decimal,
    /// Provider reference, the idempotency key.
    pub reference: String,
}

fn malformed(msg: &str) -> LedgerError {
    LedgerError::MalformedWebhook(msg.to_string())
}

fn non_empty(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

impl DepositNotice {
    /// Parses the raw request body.
    ///
    /// Expects `{"account": {"account_number": ..}, "amount": .., "reference": ..}`.
    /// The amount may be a JSON string or number; it is never read as a float.
    ///
    /// # Errors
    ///
    /// `MalformedWebhook` naming the first missing or invalid field.
    pub fn parse(raw_body: &[u8]) -> Result<Self, LedgerError> {
        let body: Value = serde_json::from_slice(raw_body)
            .map_err(|e| LedgerError::MalformedWebhook(format!("body is not JSON: {e}")))?;
        Self::from_value(&body)
    }

    /// Validates an already parsed body.
    ///
    /// # Errors
    ///
    /// See [`Self::parse`].
    pub fn from_value(body: &Value) -> Result<Self, LedgerError> {
        let account_number = non_empty(body.pointer("/account/account_number"))
            .ok_or_else(|| malformed("missing account number"))?;

        let amount = body
            .get("amount")
            .and_then(decimal_from_json)
            .ok_or_else(|| malformed("missing or non-numeric amount"))?;
        if amount <= Decimal::ZERO {
            return Err(malformed("amount must be greater than zero"));
        }

        let reference =
            non_empty(body.get("reference")).ok_or_else(|| malformed("missing reference"))?;

        Ok(Self {
            account_number,
            amount,
            reference,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_parses_string_and_number_amounts() {
        let notice = DepositNotice::parse(
            br#"{"account":{"account_number":"1000000001"},"amount":"2500.50","reference":"BUD-1"}"#,
        )
        .unwrap();
        assert_eq!(notice.account_number, "1000000001");
        assert_eq!(notice.amount, dec!(2500.50));
        assert_eq!(notice.reference, "BUD-1");

        let notice = DepositNotice::from_value(&json!({
            "account": {"account_number": 1000000001_u64},
            "amount": 75,
            "reference": "BUD-2",
        }))
        .unwrap();
        assert_eq!(notice.account_number, "1000000001");
        assert_eq!(notice.amount, dec!(75));
    }

    #[rstest]
    #[case::no_account(json!({"amount": "10", "reference": "R"}), "account number")]
    #[case::blank_account(json!({"account": {"account_number": " "}, "amount": "10", "reference": "R"}), "account number")]
    #[case::no_amount(json!({"account": {"account_number": "1"}, "reference": "R"}), "amount")]
    #[case::text_amount(json!({"account": {"account_number": "1"}, "amount": "ten", "reference": "R"}), "amount")]
    #[case::zero_amount(json!({"account": {"account_number": "1"}, "amount": 0, "reference": "R"}), "greater than zero")]
    #[case::negative_amount(json!({"account": {"account_number": "1"}, "amount": "-5", "reference": "R"}), "greater than zero")]
    #[case::no_reference(json!({"account": {"account_number": "1"}, "amount": "10"}), "reference")]
    #[case::empty_reference(json!({"account": {"account_number": "1"}, "amount": "10", "reference": ""}), "reference")]
    fn test_rejects_invalid_fields(#[case] body: Value, #[case] expected: &str) {
        let err = DepositNotice::from_value(&body).unwrap_err();
        assert!(
            matches!(&err, LedgerError::MalformedWebhook(msg) if msg.contains(expected)),
            "{err}"
        );
    }

    #[test]
    fn test_rejects_non_json() {
        assert!(matches!(
            DepositNotice::parse(b"account=1"),
            Err(LedgerError::MalformedWebhook(_))
        ));
    }
}

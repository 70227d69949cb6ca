//! Money type with decimal precision and currency.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! This type wraps `rust_decimal::Decimal` for arbitrary precision.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Represents a monetary amount with currency.
///
/// Uses `Decimal` internally to avoid floating-point precision errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// The amount in major units (e.g., naira, dollars).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: Currency,
}

/// ISO 4217 currency codes supported by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Nigerian Naira
    Ngn,
    /// US Dollar
    Usd,
    /// Euro
    Eur,
    /// Pound Sterling
    Gbp,
    /// Kenyan Shilling
    Kes,
    /// Ghanaian Cedi
    Ghs,
    /// Japanese Yen
    Jpy,
}

impl Currency {
    /// Number of decimal places in the currency's minor unit.
    #[must_use]
    pub const fn precision(self) -> u32 {
        match self {
            Self::Jpy => 0,
            _ => 2,
        }
    }

    /// ISO code as a static string.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Ngn => "NGN",
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
            Self::Kes => "KES",
            Self::Ghs => "GHS",
            Self::Jpy => "JPY",
        }
    }

    /// Rounds `amount` to the minor unit, half away from zero.
    #[must_use]
    pub fn round_half_up(self, amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(self.precision(), RoundingStrategy::MidpointAwayFromZero)
    }

    /// Returns true if `amount` carries no digits below the minor unit.
    #[must_use]
    pub fn fits_minor_unit(self, amount: Decimal) -> bool {
        amount.normalize().scale() <= self.precision()
    }
}

impl Money {
    /// Creates a new Money instance.
    #[must_use]
    pub const fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Creates a zero amount in the specified currency.
    #[must_use]
    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Returns true if the amount is strictly positive.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let precision = self.currency.precision() as usize;
        write!(f, "{:.precision$} {}", self.amount, self.currency)
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NGN" => Ok(Self::Ngn),
            "USD" => Ok(Self::Usd),
            "EUR" => Ok(Self::Eur),
            "GBP" => Ok(Self::Gbp),
            "KES" => Ok(Self::Kes),
            "GHS" => Ok(Self::Ghs),
            "JPY" => Ok(Self::Jpy),
            _ => Err(format!("Unknown currency: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    #[test]
    fn test_money_zero() {
        let money = Money::zero(Currency::Ngn);
        assert!(money.is_zero());
        assert!(!money.is_positive());
        assert_eq!(money.currency, Currency::Ngn);
    }

    #[rstest]
    #[case(dec!(15.005), dec!(15.01))]
    #[case(dec!(15.004), dec!(15.00))]
    #[case(dec!(0.125), dec!(0.13))]
    #[case(dec!(0.135), dec!(0.14))]
    fn test_round_half_up(#[case] raw: Decimal, #[case] expected: Decimal) {
        assert_eq!(Currency::Ngn.round_half_up(raw), expected);
    }

    #[test]
    fn test_yen_has_no_minor_unit() {
        assert_eq!(Currency::Jpy.precision(), 0);
        assert_eq!(Currency::Jpy.round_half_up(dec!(14.5)), dec!(15));
        assert!(!Currency::Jpy.fits_minor_unit(dec!(1.5)));
        assert!(Currency::Jpy.fits_minor_unit(dec!(100.00)));
    }

    #[test]
    fn test_fits_minor_unit() {
        assert!(Currency::Usd.fits_minor_unit(dec!(10.10)));
        assert!(Currency::Usd.fits_minor_unit(dec!(10.1000)));
        assert!(!Currency::Usd.fits_minor_unit(dec!(10.001)));
    }

    #[test]
    fn test_currency_display_and_parse() {
        assert_eq!(Currency::Ngn.to_string(), "NGN");
        assert_eq!(Currency::from_str("ghs").unwrap(), Currency::Ghs);
        assert!(Currency::from_str("XYZ").is_err());
    }

    #[test]
    fn test_money_display_uses_precision() {
        assert_eq!(Money::new(dec!(98.5), Currency::Ngn).to_string(), "98.50 NGN");
        assert_eq!(Money::new(dec!(1200), Currency::Jpy).to_string(), "1200 JPY");
    }

    #[test]
    fn test_currency_serde() {
        let json = serde_json::to_string(&Currency::Kes).unwrap();
        assert_eq!(json, "\"KES\"");
        let parsed: Currency = serde_json::from_str("\"EUR\"").unwrap();
        assert_eq!(parsed, Currency::Eur);
    }
}

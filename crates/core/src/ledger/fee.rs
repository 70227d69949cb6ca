//! Platform fee policy.

use rust_decimal::Decimal;
use serde::Serialize;
use vaultline_shared::types::Currency;

use super::error::LedgerError;

/// Result of splitting a gross amount into fee and net.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeeSplit {
    /// Gross amount charged to the payer.
    pub gross: Decimal,
    /// Platform fee, rounded half-up to the currency's minor unit.
    pub fee: Decimal,
    /// `gross - fee`, credited to the recipient.
    pub net: Decimal,
}

/// Percentage fee charged on product payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeePolicy {
    rate: Decimal,
}

impl FeePolicy {
    /// Creates a policy.
    ///
    /// # Errors
    ///
    /// Returns `Validation` unless `0 <= rate < 1`.
    pub fn new(rate: Decimal) -> Result<Self, LedgerError> {
        if rate < Decimal::ZERO || rate >= Decimal::ONE {
            return Err(LedgerError::validation(format!(
                "fee rate must be in [0, 1), got {rate}"
            )));
        }
        Ok(Self { rate })
    }

    /// The configured rate.
    #[must_use]
    pub const fn rate(&self) -> Decimal {
        self.rate
    }

    /// Splits `gross` into fee and net.
    ///
    /// The net is derived by subtraction so `fee + net == gross` exactly.
    #[must_use]
    pub fn split(&self, gross: Decimal, currency: Currency) -> FeeSplit {
        let fee = currency.round_half_up(gross * self.rate);
        FeeSplit {
            gross,
            fee,
            net: gross - fee,
        }
    }
}

impl Default for FeePolicy {
    /// 1.5%.
    fn default() -> Self {
        Self {
            rate: Decimal::new(15, 3),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(1000.00), dec!(15.00), dec!(985.00))]
    #[case(dec!(100.00), dec!(1.50), dec!(98.50))]
    // 0.015 * 33.00 = 0.495 -> rounds up
    #[case(dec!(33.00), dec!(0.50), dec!(32.50))]
    // 0.015 * 0.30 = 0.0045 -> 0.00
    #[case(dec!(0.30), dec!(0.00), dec!(0.30))]
    fn test_default_split(#[case] gross: Decimal, #[case] fee: Decimal, #[case] net: Decimal) {
        let split = FeePolicy::default().split(gross, Currency::Ngn);
        assert_eq!(split.fee, fee);
        assert_eq!(split.net, net);
        assert_eq!(split.fee + split.net, gross);
    }

    #[test]
    fn test_yen_fee_rounds_to_whole_units() {
        let split = FeePolicy::default().split(dec!(1100), Currency::Jpy);
        // 16.5 -> 17
        assert_eq!(split.fee, dec!(17));
        assert_eq!(split.net, dec!(1083));
    }

    #[test]
    fn test_rejects_out_of_range_rate() {
        assert!(FeePolicy::new(dec!(-0.01)).is_err());
        assert!(FeePolicy::new(dec!(1)).is_err());
        assert_eq!(FeePolicy::new(dec!(0)).unwrap().rate(), dec!(0));
    }
}

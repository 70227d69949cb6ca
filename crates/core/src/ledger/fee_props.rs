//! Property-based tests for the fee split.
//!
//! - `fee + net == gross` exactly, for every currency
//! - The fee is rounded to the currency's minor unit
//! - The fee never exceeds the configured share by more than half a minor unit

use proptest::prelude::*;
use rust_decimal::Decimal;
use vaultline_shared::types::Currency;

use super::fee::FeePolicy;

fn gross() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Rates from 0.00% to 9.99%.
fn rate() -> impl Strategy<Value = Decimal> {
    (0i64..1_000i64).prop_map(|bp| Decimal::new(bp, 4))
}

fn currency() -> impl Strategy<Value = Currency> {
    prop_oneof![
        Just(Currency::Ngn),
        Just(Currency::Usd),
        Just(Currency::Kes),
        Just(Currency::Jpy),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_split_conserves_money(gross in gross(), rate in rate(), currency in currency()) {
        let gross = currency.round_half_up(gross);
        prop_assume!(gross > Decimal::ZERO);
        let split = FeePolicy::new(rate).unwrap().split(gross, currency);

        prop_assert_eq!(split.fee + split.net, gross);
        prop_assert!(split.fee >= Decimal::ZERO);
        prop_assert!(split.net >= Decimal::ZERO);
        prop_assert!(currency.fits_minor_unit(split.fee));
        prop_assert!(currency.fits_minor_unit(split.net));
    }

    #[test]
    fn prop_fee_is_nearest_minor_unit(gross in gross(), rate in rate()) {
        let split = FeePolicy::new(rate).unwrap().split(gross, Currency::Ngn);
        let exact = gross * rate;
        prop_assert!((split.fee - exact).abs() <= Decimal::new(5, 3));
    }
}

// src/billing/mod.rs

pub mod fiscal;
pub mod invoice;
pub mod receivables;

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BillingError {
    #[error("invoice must have at least one line item")]
    NoLineItems,

    #[error("line {index}: {reason}")]
    InvalidLine { index: usize, reason: &'static str },

    #[error("discount cannot be negative")]
    NegativeDiscount,

    #[error("discount {discount} exceeds subtotal {subtotal}")]
    DiscountExceedsSubtotal { discount: Decimal, subtotal: Decimal },

    #[error("{name} tax rate must be between 0 and 1 with at most 4 decimals")]
    InvalidTaxRate { name: &'static str },

    #[error("{field} is out of range or has too many decimals")]
    AmountOutOfRange { field: &'static str },

    #[error("period_end must be after period_start")]
    InvalidPeriod,

    #[error("payment amount must be positive")]
    NonPositivePayment,

    #[error("payment currency {payment} does not match invoice currency {invoice}")]
    CurrencyMismatch { payment: String, invoice: String },
}

/// Rounds a money amount to cents, half away from zero.
pub fn round_money(v: Decimal) -> Decimal {
    v.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// True when `v` fits a `NUMERIC(precision, dp)` column unchanged: no more
/// than `dp` decimals and fewer than `precision - dp` integer digits.
pub fn fits_numeric(v: Decimal, precision: u32, dp: u32) -> bool {
    let v = v.normalize();
    v.scale() <= dp && v.abs() < Decimal::from(10i64.pow(precision - dp))
}

/// Money columns are `NUMERIC(12,2)`.
pub fn is_storable_money(v: Decimal) -> bool {
    fits_numeric(v, 12, 2)
}

/// `part / whole` as a percentage with two decimals; 0 when `whole` is zero.
pub fn percent_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    (part * Decimal::ONE_HUNDRED / whole).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_fit_checks_scale_and_magnitude() {
        assert!(is_storable_money("9999999999.99".parse().unwrap()));
        assert!(is_storable_money("12.50".parse().unwrap()));
        assert!(is_storable_money("12.500".parse().unwrap()));
        assert!(!is_storable_money("12.505".parse().unwrap()));
        assert!(!is_storable_money("10000000000".parse().unwrap()));
        assert!(!is_storable_money(Decimal::MAX));
        assert!(fits_numeric("0.1613".parse().unwrap(), 6, 4));
        assert!(!fits_numeric("0.16125".parse().unwrap(), 6, 4));
    }

    #[test]
    fn percent_guards_zero_divisor() {
        assert_eq!(percent_of(Decimal::from(5), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(percent_of(Decimal::from(1), Decimal::from(3)), Decimal::new(3333, 2));
        assert_eq!(percent_of(Decimal::from(50), Decimal::from(200)), Decimal::from(25));
    }

    #[test]
    fn money_rounds_half_away_from_zero() {
        assert_eq!(round_money(Decimal::new(12345, 3)), Decimal::new(1235, 2));
        assert_eq!(round_money(Decimal::new(-12345, 3)), Decimal::new(-1235, 2));
    }
}

// src/billing/invoice.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{fits_numeric, is_storable_money, round_money, BillingError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    #[serde(default = "default_taxable")]
    pub is_taxable: bool,
}
fn default_taxable() -> bool { true }

impl LineItem {
    /// Exact `quantity × unit_price`; `None` on overflow.
    pub fn checked_total(&self) -> Option<Decimal> {
        self.quantity.checked_mul(self.unit_price)
    }
}

/// Tax rates as fractions (0.16 = 16%). Each applies to the same discounted base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaxRates {
    #[serde(default)]
    pub iva: Decimal,
    #[serde(default)]
    pub municipal: Decimal,
    #[serde(default)]
    pub service: Decimal,
}

impl TaxRates {
    pub fn validate(&self) -> Result<(), BillingError> {
        for (name, rate) in [("iva", self.iva), ("municipal", self.municipal), ("service", self.service)] {
            if rate < Decimal::ZERO || rate > Decimal::ONE || !fits_numeric(rate, 6, 4) {
                return Err(BillingError::InvalidTaxRate { name });
            }
        }
        Ok(())
    }

    pub fn combined(&self) -> Decimal {
        self.iva + self.municipal + self.service
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub subtotal_after_discount: Decimal,
    pub taxable_base: Decimal,
    pub iva_amount: Decimal,
    pub municipal_amount: Decimal,
    pub service_amount: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

pub fn validate_lines(lines: &[LineItem]) -> Result<(), BillingError> {
    if lines.is_empty() {
        return Err(BillingError::NoLineItems);
    }
    for (index, line) in lines.iter().enumerate() {
        if line.description.trim().is_empty() {
            return Err(BillingError::InvalidLine { index, reason: "description is required" });
        }
        if line.quantity <= Decimal::ZERO {
            return Err(BillingError::InvalidLine { index, reason: "quantity must be positive" });
        }
        if line.unit_price < Decimal::ZERO {
            return Err(BillingError::InvalidLine { index, reason: "unit_price cannot be negative" });
        }
        // quantity NUMERIC(12,3), unit_price NUMERIC(12,2), line_total NUMERIC(17,5)
        if !fits_numeric(line.quantity, 12, 3) {
            return Err(BillingError::InvalidLine { index, reason: "quantity allows at most 3 decimals and 9 digits" });
        }
        if !is_storable_money(line.unit_price) {
            return Err(BillingError::InvalidLine { index, reason: "unit_price allows at most 2 decimals and 10 digits" });
        }
        if !line.checked_total().is_some_and(|t| fits_numeric(t, 17, 5)) {
            return Err(BillingError::InvalidLine { index, reason: "line total is too large" });
        }
    }
    Ok(())
}

fn checked_sum<'a>(mut lines: impl Iterator<Item = &'a LineItem>) -> Result<Decimal, BillingError> {
    lines.try_fold(Decimal::ZERO, |acc, l| {
        l.checked_total()
            .and_then(|t| acc.checked_add(t))
            .ok_or(BillingError::AmountOutOfRange { field: "subtotal" })
    })
}

/// Computes subtotal, discount, per-tax amounts and total for an invoice.
///
/// The taxable base is the sum of taxable lines scaled by the discount ratio
/// `(subtotal - discount) / subtotal`, so a discount reduces tax in proportion.
/// Taxes are not compounded on one another.
pub fn compute_totals(
    lines: &[LineItem],
    discount: Decimal,
    rates: &TaxRates,
) -> Result<InvoiceTotals, BillingError> {
    validate_lines(lines)?;
    rates.validate()?;
    if discount < Decimal::ZERO {
        return Err(BillingError::NegativeDiscount);
    }
    if !is_storable_money(discount) {
        return Err(BillingError::AmountOutOfRange { field: "discount_amount" });
    }

    let subtotal = checked_sum(lines.iter())?;
    if !is_storable_money(round_money(subtotal)) {
        return Err(BillingError::AmountOutOfRange { field: "subtotal" });
    }
    if discount > subtotal {
        return Err(BillingError::DiscountExceedsSubtotal { discount, subtotal });
    }
    let after_discount = subtotal - discount;

    let taxable = checked_sum(lines.iter().filter(|l| l.is_taxable))?;
    let taxable_base = if subtotal.is_zero() {
        Decimal::ZERO
    } else {
        taxable
            .checked_mul(after_discount)
            .and_then(|v| v.checked_div(subtotal))
            .ok_or(BillingError::AmountOutOfRange { field: "taxable_base" })?
    };

    let iva_amount = round_money(taxable_base * rates.iva);
    let municipal_amount = round_money(taxable_base * rates.municipal);
    let service_amount = round_money(taxable_base * rates.service);
    let tax_amount = iva_amount + municipal_amount + service_amount;
    if !is_storable_money(round_money(after_discount) + tax_amount) {
        return Err(BillingError::AmountOutOfRange { field: "total" });
    }

    Ok(InvoiceTotals {
        subtotal: round_money(subtotal),
        discount_amount: round_money(discount),
        subtotal_after_discount: round_money(after_discount),
        taxable_base: round_money(taxable_base),
        iva_amount,
        municipal_amount,
        service_amount,
        tax_amount,
        total: round_money(after_discount) + tax_amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(qty: i64, price: &str, taxable: bool) -> LineItem {
        LineItem {
            description: "item".into(),
            quantity: Decimal::from(qty),
            unit_price: price.parse().unwrap(),
            is_taxable: taxable,
        }
    }

    fn iva(rate: &str) -> TaxRates {
        TaxRates { iva: rate.parse().unwrap(), ..TaxRates::default() }
    }

    #[test]
    fn discount_scales_the_taxable_base() {
        let lines = vec![line(1, "100", true), line(2, "50", false)];
        let t = compute_totals(&lines, Decimal::from(20), &iva("0.16")).unwrap();
        assert_eq!(t.subtotal, Decimal::from(200));
        assert_eq!(t.subtotal_after_discount, Decimal::from(180));
        assert_eq!(t.taxable_base, Decimal::from(90));
        assert_eq!(t.tax_amount, "14.4".parse::<Decimal>().unwrap());
        assert_eq!(t.total, "194.4".parse::<Decimal>().unwrap());
    }

    #[test]
    fn taxes_are_applied_to_the_same_base_not_compounded() {
        let rates = TaxRates {
            iva: "0.16".parse().unwrap(),
            municipal: "0.03".parse().unwrap(),
            service: "0.10".parse().unwrap(),
        };
        let t = compute_totals(&[line(2, "500", true)], Decimal::ZERO, &rates).unwrap();
        assert_eq!(t.iva_amount, Decimal::from(160));
        assert_eq!(t.municipal_amount, Decimal::from(30));
        assert_eq!(t.service_amount, Decimal::from(100));
        assert_eq!(t.total, Decimal::from(1290));
        assert_eq!(t.total, t.subtotal_after_discount * (Decimal::ONE + rates.combined()));
    }

    #[test]
    fn recomputing_yields_identical_totals() {
        let lines = vec![line(3, "33.33", true), line(1, "0.01", false)];
        let rates = iva("0.16");
        let a = compute_totals(&lines, "9.99".parse().unwrap(), &rates).unwrap();
        let b = compute_totals(&lines, "9.99".parse().unwrap(), &rates).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn zero_priced_invoice_has_no_tax() {
        let t = compute_totals(&[line(1, "0", true)], Decimal::ZERO, &iva("0.16")).unwrap();
        assert_eq!(t.total, Decimal::ZERO);
        assert_eq!(t.taxable_base, Decimal::ZERO);
    }

    #[test]
    fn discount_larger_than_subtotal_is_rejected() {
        let err = compute_totals(&[line(1, "50", true)], Decimal::from(60), &iva("0.16")).unwrap_err();
        assert!(matches!(err, BillingError::DiscountExceedsSubtotal { .. }));
    }

    #[test]
    fn bad_inputs_are_rejected() {
        assert_eq!(compute_totals(&[], Decimal::ZERO, &iva("0.16")), Err(BillingError::NoLineItems));
        assert_eq!(
            compute_totals(&[line(1, "10", true)], Decimal::from(-1), &iva("0.16")),
            Err(BillingError::NegativeDiscount)
        );
        assert_eq!(
            compute_totals(&[line(1, "10", true)], Decimal::ZERO, &iva("1.5")),
            Err(BillingError::InvalidTaxRate { name: "iva" })
        );
        assert!(matches!(
            compute_totals(&[line(0, "10", true)], Decimal::ZERO, &iva("0.16")),
            Err(BillingError::InvalidLine { index: 0, .. })
        ));
    }

    #[test]
    fn oversized_amounts_are_errors_not_panics() {
        let huge = LineItem {
            description: "item".into(),
            quantity: Decimal::MAX,
            unit_price: Decimal::from(2),
            is_taxable: true,
        };
        assert!(matches!(
            compute_totals(&[huge], Decimal::ZERO, &TaxRates::default()),
            Err(BillingError::InvalidLine { index: 0, .. })
        ));

        let many: Vec<LineItem> = (0..20).map(|_| line(1, "999999999.99", true)).collect();
        assert_eq!(
            compute_totals(&many, Decimal::ZERO, &iva("0.16")),
            Err(BillingError::AmountOutOfRange { field: "subtotal" })
        );

        assert_eq!(
            compute_totals(&[line(1, "10", true)], "1000000000000".parse().unwrap(), &iva("0.16")),
            Err(BillingError::AmountOutOfRange { field: "discount_amount" })
        );
    }

    #[test]
    fn totals_near_the_column_limit_include_tax() {
        let err = compute_totals(&[line(1, "9000000000", true)], Decimal::ZERO, &iva("0.16")).unwrap_err();
        assert_eq!(err, BillingError::AmountOutOfRange { field: "total" });
    }

    #[test]
    fn values_that_would_be_rounded_on_storage_are_rejected() {
        let sub_cent = LineItem {
            description: "item".into(),
            quantity: Decimal::ONE,
            unit_price: "33.335".parse().unwrap(),
            is_taxable: true,
        };
        assert!(matches!(
            compute_totals(&[sub_cent], Decimal::ZERO, &iva("0.16")),
            Err(BillingError::InvalidLine { index: 0, .. })
        ));
        assert_eq!(
            compute_totals(&[line(1, "33.33", true)], Decimal::ZERO, &iva("0.16125")),
            Err(BillingError::InvalidTaxRate { name: "iva" })
        );
        assert!(matches!(
            compute_totals(&[line(1, "10", true)], "0.005".parse().unwrap(), &iva("0.16")),
            Err(BillingError::AmountOutOfRange { field: "discount_amount" })
        ));
    }

    #[test]
    fn fractional_quantities_keep_an_exact_line_total() {
        let nights = LineItem {
            description: "late checkout".into(),
            quantity: "0.125".parse().unwrap(),
            unit_price: "80.10".parse().unwrap(),
            is_taxable: true,
        };
        assert_eq!(nights.checked_total(), Some("10.01250".parse().unwrap()));
        let t = compute_totals(&[nights], Decimal::ZERO, &iva("0.16")).unwrap();
        assert_eq!(t.subtotal, "10.01".parse::<Decimal>().unwrap());
        assert_eq!(t.iva_amount, "1.60".parse::<Decimal>().unwrap());
    }
}

// src/billing/fiscal.rs

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{percent_of, BillingError};
use crate::models::InvoiceStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaxKind {
    Iva,
    Municipal,
    Service,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxComponent {
    pub kind: TaxKind,
    pub rate: Decimal,
    pub base: Decimal,
    pub amount: Decimal,
}

/// An issued invoice as seen by fiscal reporting.
#[derive(Debug, Clone)]
pub struct FiscalInvoice {
    pub invoice_date: NaiveDate,
    pub currency: String,
    pub status: InvoiceStatus,
    pub total_amount: Decimal,
    pub taxes: Vec<TaxComponent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxLine {
    pub kind: TaxKind,
    pub rate: Decimal,
    pub base: Decimal,
    pub tax: Decimal,
    pub percent_of_tax: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrencyTotals {
    pub currency: String,
    pub invoice_count: usize,
    pub gross_revenue: Decimal,
    pub tax_total: Decimal,
    pub net_revenue: Decimal,
    pub taxes: Vec<TaxLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FiscalSummary {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub currencies: Vec<CurrencyTotals>,
}

#[derive(Default)]
struct Acc {
    count: usize,
    gross: Decimal,
    tax: Decimal,
    by_rate: BTreeMap<(TaxKind, Decimal), (Decimal, Decimal)>,
}

/// Aggregates invoices dated in `[period_start, period_end)` per currency and
/// per tax rate. Cancelled invoices are left out.
pub fn fiscal_summary(
    invoices: &[FiscalInvoice],
    period_start: NaiveDate,
    period_end: NaiveDate,
) -> Result<FiscalSummary, BillingError> {
    if period_end <= period_start {
        return Err(BillingError::InvalidPeriod);
    }

    let mut by_currency: BTreeMap<&str, Acc> = BTreeMap::new();
    for inv in invoices {
        if inv.status == InvoiceStatus::Cancelled
            || inv.invoice_date < period_start
            || inv.invoice_date >= period_end
        {
            continue;
        }
        let acc = by_currency.entry(inv.currency.as_str()).or_default();
        acc.count += 1;
        acc.gross += inv.total_amount;
        for t in &inv.taxes {
            if t.rate.is_zero() && t.amount.is_zero() {
                continue;
            }
            acc.tax += t.amount;
            let slot = acc.by_rate.entry((t.kind, t.rate.normalize())).or_default();
            slot.0 += t.base;
            slot.1 += t.amount;
        }
    }

    let currencies = by_currency
        .into_iter()
        .map(|(currency, acc)| {
            let tax_total = acc.tax;
            let taxes = acc
                .by_rate
                .into_iter()
                .map(|((kind, rate), (base, tax))| TaxLine {
                    kind,
                    rate,
                    base,
                    tax,
                    percent_of_tax: percent_of(tax, tax_total),
                })
                .collect();
            CurrencyTotals {
                currency: currency.to_string(),
                invoice_count: acc.count,
                gross_revenue: acc.gross,
                tax_total,
                net_revenue: acc.gross - tax_total,
                taxes,
            }
        })
        .collect();

    Ok(FiscalSummary { period_start, period_end, currencies })
}

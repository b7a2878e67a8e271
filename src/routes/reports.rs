// src/routes/reports.rs

use axum::{extract::{Query, State}, Json};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{query_as, FromRow};

use super::parse_text;
use crate::billing::fiscal::{fiscal_summary, FiscalInvoice, FiscalSummary, TaxComponent, TaxKind};
use crate::billing::BillingError;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Deserialize)]
pub struct FiscalQ {
    pub period_start: NaiveDate,
    /// Exclusive.
    pub period_end: NaiveDate,
}

#[derive(FromRow)]
struct FiscalRow {
    invoice_date: NaiveDate,
    currency: String,
    status: String,
    total_amount: Decimal,
    taxable_base: Decimal,
    iva_rate: Decimal,
    iva_amount: Decimal,
    municipal_rate: Decimal,
    municipal_amount: Decimal,
    service_rate: Decimal,
    service_amount: Decimal,
}

impl FiscalRow {
    fn into_fiscal(self) -> ApiResult<FiscalInvoice> {
        let base = self.taxable_base;
        let component = |kind, rate, amount| TaxComponent { kind, rate, base, amount };
        Ok(FiscalInvoice {
            invoice_date: self.invoice_date,
            currency: self.currency,
            status: parse_text(&self.status)?,
            total_amount: self.total_amount,
            taxes: vec![
                component(TaxKind::Iva, self.iva_rate, self.iva_amount),
                component(TaxKind::Municipal, self.municipal_rate, self.municipal_amount),
                component(TaxKind::Service, self.service_rate, self.service_amount),
            ],
        })
    }
}

/// GET /api/v1/reports/fiscal?period_start=YYYY-MM-DD&period_end=YYYY-MM-DD
pub async fn fiscal_report(
    State(state): State<AppState>,
    Query(q): Query<FiscalQ>,
) -> ApiResult<Json<FiscalSummary>> {
    if q.period_end <= q.period_start {
        return Err(BillingError::InvalidPeriod.into());
    }

    let rows = query_as::<_, FiscalRow>(
        r#"SELECT invoice_date, currency, status, total_amount, taxable_base,
                  iva_rate, iva_amount, municipal_rate, municipal_amount,
                  service_rate, service_amount
           FROM public.invoices
           WHERE invoice_date >= $1 AND invoice_date < $2"#,
    )
    .bind(q.period_start)
    .bind(q.period_end)
    .fetch_all(&state.pool)
    .await?;

    let invoices = rows
        .into_iter()
        .map(FiscalRow::into_fiscal)
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(Json(fiscal_summary(&invoices, q.period_start, q.period_end)?))
}

// src/routes/receivables.rs

use std::collections::HashMap;

use axum::{extract::{Query, State}, Json};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{query, query_as};

use super::parse_text;
use crate::billing::receivables::{aging_summary, receivable, AccountReceivable, AgingSummary, OpenInvoice, Settlement};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Deserialize)]
pub struct ReceivablesQ {
    /// Reference date for aging; defaults to today (UTC).
    pub as_of: Option<NaiveDate>,
    pub currency: Option<String>,
}

#[derive(Serialize)]
pub struct ReceivablesResp {
    pub as_of: NaiveDate,
    pub receivables: Vec<AccountReceivable>,
    pub summary: Vec<AgingSummary>,
}

/// GET /api/v1/receivables
///
/// Every non-cancelled invoice that still has money owed, or that was
/// overpaid and carries a credit, aged against `as_of`.
pub async fn list_receivables(
    State(state): State<AppState>,
    Query(q): Query<ReceivablesQ>,
) -> ApiResult<Json<ReceivablesResp>> {
    let as_of = q.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let currency = q.currency.map(|c| c.trim().to_uppercase());

    let invoices = query_as::<_, (i64, String, String, String, Decimal, Option<NaiveDate>)>(
        r#"SELECT i.invoice_id, i.invoice_number,
                  COALESCE(g.full_name, i.company_name, '') AS client,
                  i.currency, i.total_amount, i.due_date
           FROM public.invoices i
           LEFT JOIN public.guests g ON g.guest_id = i.guest_id
           WHERE i.status <> 'CANCELLED'
             AND i.payment_status <> 'PAID'
             AND ($1::text IS NULL OR i.currency = $1)
           ORDER BY i.due_date NULLS LAST, i.invoice_id"#,
    )
    .bind(currency.as_deref())
    .fetch_all(&state.pool)
    .await?;

    let ids: Vec<i64> = invoices.iter().map(|row| row.0).collect();
    let payment_rows = query_as::<_, (i64, Decimal, String)>(
        r#"SELECT invoice_id, amount, status FROM public.payments WHERE invoice_id = ANY($1)"#,
    )
    .bind(&ids)
    .fetch_all(&state.pool)
    .await?;

    let mut payments: HashMap<i64, Vec<Settlement>> = HashMap::new();
    for (invoice_id, amount, status) in payment_rows {
        payments
            .entry(invoice_id)
            .or_default()
            .push(Settlement { amount, status: parse_text(&status)? });
    }

    let receivables: Vec<AccountReceivable> = invoices
        .into_iter()
        .map(|(invoice_id, invoice_number, client, currency, total_amount, due_date)| {
            let open = OpenInvoice { invoice_id, invoice_number, client, currency, total_amount, due_date };
            let settled = payments.get(&invoice_id).map(Vec::as_slice).unwrap_or(&[]);
            receivable(&open, settled, as_of)
        })
        .filter(|ar| ar.balance.outstanding > Decimal::ZERO || ar.balance.credit > Decimal::ZERO)
        .collect();

    let summary = aging_summary(&receivables);
    Ok(Json(ReceivablesResp { as_of, receivables, summary }))
}

/// POST /api/v1/receivables/mark-overdue
///
/// Flags PENDING/SENT invoices past their due date, with money still owed, as OVERDUE.
pub async fn mark_overdue(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    let today = Utc::now().date_naive();
    let res = query(
        r#"UPDATE public.invoices SET status = 'OVERDUE', updated_at = now()
           WHERE status IN ('PENDING','SENT')
             AND payment_status IN ('UNPAID','PARTIAL')
             AND due_date < $1"#,
    )
    .bind(today)
    .execute(&state.pool)
    .await?;

    tracing::info!(updated = res.rows_affected(), %today, "overdue invoices flagged");
    Ok(Json(serde_json::json!({ "updated": res.rows_affected() })))
}

// src/routes/payments.rs

use axum::{extract::{Path, State}, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{query, query_as, PgExecutor, Postgres, Transaction};

use super::parse_text;
use crate::billing::receivables::{balance, payment_status, Balance, Settlement};
use crate::billing::{is_storable_money, BillingError};
use crate::error::{ApiError, ApiResult};
use crate::models::{
    Invoice, InvoicePaymentStatus, InvoiceStatus, Payment, PaymentMethod, PaymentStatus,
    StayPaymentStatus,
};
use crate::AppState;

#[derive(Deserialize)]
pub struct RecordPaymentBody {
    pub amount: Decimal,
    pub currency: Option<String>,
    pub method: String,
    /// PENDING or COMPLETED; defaults to COMPLETED.
    pub status: Option<String>,
    pub reference: Option<String>,
}

#[derive(Serialize)]
pub struct PaymentResp {
    pub payment: Payment,
    pub invoice_status: String,
    pub payment_status: InvoicePaymentStatus,
    pub balance: Balance,
}

pub(crate) async fn load_settlements<'e, E: PgExecutor<'e>>(
    ex: E,
    invoice_id: i64,
) -> ApiResult<Vec<Settlement>> {
    let rows = query_as::<_, (Decimal, String)>(
        r#"SELECT amount, status FROM public.payments WHERE invoice_id = $1"#,
    )
    .bind(invoice_id)
    .fetch_all(ex)
    .await?;
    rows.into_iter()
        .map(|(amount, status)| Ok(Settlement { amount, status: parse_text(&status)? }))
        .collect()
}

/// Reservation-level view of how far the stay's invoice is settled.
pub fn stay_payment_status(invoice: InvoicePaymentStatus, any_refunded: bool) -> StayPaymentStatus {
    match invoice {
        InvoicePaymentStatus::Unpaid if any_refunded => StayPaymentStatus::Refunded,
        InvoicePaymentStatus::Unpaid => StayPaymentStatus::Pending,
        InvoicePaymentStatus::Partial => StayPaymentStatus::Partial,
        InvoicePaymentStatus::Paid | InvoicePaymentStatus::Overpaid => StayPaymentStatus::Paid,
    }
}

/// Invoice status after settlement changes: fully settled invoices become
/// PAID; a PAID invoice that is no longer settled goes back to PENDING.
pub fn settled_invoice_status(current: InvoiceStatus, b: &Balance) -> InvoiceStatus {
    match current {
        InvoiceStatus::Cancelled => InvoiceStatus::Cancelled,
        _ if b.outstanding.is_zero() => InvoiceStatus::Paid,
        InvoiceStatus::Paid => InvoiceStatus::Pending,
        other => other,
    }
}

async fn lock_invoice(tx: &mut Transaction<'_, Postgres>, id: i64) -> ApiResult<Invoice> {
    query_as::<_, Invoice>(r#"SELECT * FROM public.invoices WHERE invoice_id = $1 FOR UPDATE"#)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("invoice {id}")))
}

/// Recomputes the invoice's payment status (and the linked reservation's)
/// from its payments. Runs inside the caller's transaction.
async fn sync_settlement(
    tx: &mut Transaction<'_, Postgres>,
    invoice: &Invoice,
) -> ApiResult<(InvoiceStatus, InvoicePaymentStatus, Balance)> {
    let settlements = load_settlements(&mut **tx, invoice.invoice_id).await?;
    let bal = balance(invoice.total_amount, &settlements);
    let pay_status = payment_status(&bal);
    let status = settled_invoice_status(parse_text(&invoice.status)?, &bal);

    query(
        r#"UPDATE public.invoices SET status = $2, payment_status = $3, updated_at = now()
           WHERE invoice_id = $1"#,
    )
    .bind(invoice.invoice_id)
    .bind(status.as_str())
    .bind(pay_status.as_str())
    .execute(&mut **tx)
    .await?;

    if let Some(reservation_id) = invoice.reservation_id {
        let any_refunded = settlements.iter().any(|s| s.status == PaymentStatus::Refunded);
        query(
            r#"UPDATE public.reservations SET payment_status = $2, updated_at = now()
               WHERE reservation_id = $1"#,
        )
        .bind(reservation_id)
        .bind(stay_payment_status(pay_status, any_refunded).as_str())
        .execute(&mut **tx)
        .await?;
    }

    if bal.credit > Decimal::ZERO {
        tracing::warn!(
            invoice_id = invoice.invoice_id,
            credit = %bal.credit,
            "invoice is overpaid"
        );
    }
    Ok((status, pay_status, bal))
}

/// POST /api/v1/invoices/:id/payments
pub async fn record_payment(
    State(state): State<AppState>,
    Path(invoice_id): Path<i64>,
    Json(b): Json<RecordPaymentBody>,
) -> ApiResult<Json<PaymentResp>> {
    if b.amount <= Decimal::ZERO {
        return Err(BillingError::NonPositivePayment.into());
    }
    if !is_storable_money(b.amount) {
        return Err(BillingError::AmountOutOfRange { field: "amount" }.into());
    }
    let method = parse_text::<PaymentMethod>(&b.method)?;
    let status = match b.status.as_deref() {
        Some(s) => parse_text::<PaymentStatus>(s)?,
        None => PaymentStatus::Completed,
    };
    if status == PaymentStatus::Refunded {
        return Err(ApiError::validation("a new payment cannot be recorded as REFUNDED"));
    }

    let mut tx = state.pool.begin().await?;
    let invoice = lock_invoice(&mut tx, invoice_id).await?;
    if parse_text::<InvoiceStatus>(&invoice.status)? == InvoiceStatus::Cancelled {
        return Err(ApiError::Conflict(format!("invoice {} is cancelled", invoice.invoice_number)));
    }
    let currency = b
        .currency
        .map(|c| c.trim().to_uppercase())
        .unwrap_or_else(|| invoice.currency.clone());
    if currency != invoice.currency {
        return Err(BillingError::CurrencyMismatch { payment: currency, invoice: invoice.currency }.into());
    }

    let payment = query_as::<_, Payment>(
        r#"
        INSERT INTO public.payments (invoice_id, amount, currency, method, status, reference)
        VALUES ($1,$2,$3,$4,$5,$6)
        RETURNING *
        "#,
    )
    .bind(invoice_id)
    .bind(b.amount)
    .bind(&currency)
    .bind(method.as_str())
    .bind(status.as_str())
    .bind(b.reference)
    .fetch_one(&mut *tx)
    .await?;

    let (invoice_status, payment_status, balance) = sync_settlement(&mut tx, &invoice).await?;
    tx.commit().await?;

    tracing::info!(
        payment_id = payment.payment_id,
        invoice_id,
        amount = %payment.amount,
        method = %method,
        outstanding = %balance.outstanding,
        "payment recorded"
    );
    Ok(Json(PaymentResp {
        payment,
        invoice_status: invoice_status.as_str().to_string(),
        payment_status,
        balance,
    }))
}

pub async fn list_payments(
    State(state): State<AppState>,
    Path(invoice_id): Path<i64>,
) -> ApiResult<Json<Vec<Payment>>> {
    let rows = query_as::<_, Payment>(
        r#"SELECT * FROM public.payments WHERE invoice_id = $1 ORDER BY paid_at, payment_id"#,
    )
    .bind(invoice_id)
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(rows))
}

async fn change_payment_status(
    state: &AppState,
    payment_id: i64,
    from: PaymentStatus,
    to: PaymentStatus,
) -> ApiResult<PaymentResp> {
    let mut tx = state.pool.begin().await?;
    let current = query_as::<_, Payment>(
        r#"SELECT * FROM public.payments WHERE payment_id = $1 FOR UPDATE"#,
    )
    .bind(payment_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| ApiError::not_found(format!("payment {payment_id}")))?;

    if parse_text::<PaymentStatus>(&current.status)? != from {
        return Err(ApiError::Conflict(format!(
            "payment {payment_id} is {}, expected {from}",
            current.status
        )));
    }

    let invoice = lock_invoice(&mut tx, current.invoice_id).await?;
    let payment = query_as::<_, Payment>(
        r#"UPDATE public.payments SET status = $2 WHERE payment_id = $1 RETURNING *"#,
    )
    .bind(payment_id)
    .bind(to.as_str())
    .fetch_one(&mut *tx)
    .await?;

    let (invoice_status, payment_status, balance) = sync_settlement(&mut tx, &invoice).await?;
    tx.commit().await?;

    tracing::info!(payment_id, invoice_id = invoice.invoice_id, from = %from, to = %to, "payment status changed");
    Ok(PaymentResp {
        payment,
        invoice_status: invoice_status.as_str().to_string(),
        payment_status,
        balance,
    })
}

/// POST /api/v1/payments/:id/complete
pub async fn complete_payment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<PaymentResp>> {
    Ok(Json(change_payment_status(&state, id, PaymentStatus::Pending, PaymentStatus::Completed).await?))
}

/// POST /api/v1/payments/:id/refund
pub async fn refund_payment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<PaymentResp>> {
    Ok(Json(change_payment_status(&state, id, PaymentStatus::Completed, PaymentStatus::Refunded).await?))
}

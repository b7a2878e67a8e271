// src/routes/invoices.rs

use axum::{extract::{Path, Query, State}, Json};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{query, query_as, Postgres, QueryBuilder, Transaction};

use super::payments::load_settlements;
use super::reservations::lock_reservation;
use super::{page, parse_text};
use crate::billing::invoice::{compute_totals, InvoiceTotals, LineItem, TaxRates};
use crate::billing::BillingError;
use crate::billing::receivables::{balance, Balance};
use crate::error::{ApiError, ApiResult};
use crate::models::{Invoice, InvoiceLine, InvoicePaymentStatus, InvoiceStatus, ReservationStatus};
use crate::AppState;

#[derive(Deserialize)]
pub struct PreviewBody {
    pub lines: Vec<LineItem>,
    #[serde(default)] pub discount_amount: Decimal,
    pub tax_rates: Option<TaxRates>,
}

#[derive(Deserialize)]
pub struct CreateInvoiceBody {
    pub guest_id: Option<i64>,
    pub company_name: Option<String>,
    pub reservation_id: Option<i64>,
    pub invoice_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub currency: Option<String>,
    #[serde(default)] pub discount_amount: Decimal,
    pub tax_rates: Option<TaxRates>,
    pub lines: Vec<LineItem>,
    pub notes: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct InvoiceReservationBody {
    pub due_date: Option<NaiveDate>,
    #[serde(default)] pub discount_amount: Decimal,
    pub tax_rates: Option<TaxRates>,
    /// Extra charges (minibar, laundry...) billed with the stay.
    #[serde(default)] pub extra_lines: Vec<LineItem>,
    pub company_name: Option<String>,
}

#[derive(Deserialize)]
pub struct ListInvoicesQ {
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub guest_id: Option<i64>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Deserialize)]
pub struct InvoiceStatusBody {
    pub status: String,
}

#[derive(Serialize)]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub lines: Vec<InvoiceLine>,
    pub balance: Balance,
}

struct NewInvoice {
    guest_id: Option<i64>,
    company_name: Option<String>,
    reservation_id: Option<i64>,
    invoice_date: Option<NaiveDate>,
    due_date: Option<NaiveDate>,
    currency: String,
    discount: Decimal,
    rates: TaxRates,
    lines: Vec<LineItem>,
    notes: Option<String>,
}

async fn insert_invoice(
    tx: &mut Transaction<'_, Postgres>,
    new: NewInvoice,
) -> ApiResult<(Invoice, Vec<InvoiceLine>)> {
    if new.guest_id.is_none() && new.company_name.as_deref().map_or(true, |c| c.trim().is_empty()) {
        return Err(ApiError::validation("invoice needs a guest_id or a company_name"));
    }
    if let (Some(issued), Some(due)) = (new.invoice_date, new.due_date) {
        if due < issued {
            return Err(ApiError::validation("due_date cannot precede invoice_date"));
        }
    }
    let totals = compute_totals(&new.lines, new.discount, &new.rates)?;

    if let Some(reservation_id) = new.reservation_id {
        let billed: Option<(String,)> = query_as(
            r#"SELECT invoice_number FROM public.invoices
               WHERE reservation_id = $1 AND status <> 'CANCELLED'"#,
        )
        .bind(reservation_id)
        .fetch_optional(&mut **tx)
        .await?;
        if let Some((number,)) = billed {
            return Err(ApiError::Conflict(format!(
                "reservation {reservation_id} is already billed on invoice {number}"
            )));
        }
    }

    let invoice = query_as::<_, Invoice>(
        r#"
        INSERT INTO public.invoices
          (guest_id, company_name, reservation_id, invoice_date, due_date, currency,
           discount_amount, iva_rate, municipal_rate, service_rate,
           subtotal, taxable_base, iva_amount, municipal_amount, service_amount,
           tax_amount, total_amount, status, payment_status, notes)
        VALUES ($1,$2,$3,COALESCE($4, CURRENT_DATE),$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,
                'PENDING','UNPAID',$18)
        RETURNING *
        "#,
    )
    .bind(new.guest_id)
    .bind(new.company_name)
    .bind(new.reservation_id)
    .bind(new.invoice_date)
    .bind(new.due_date)
    .bind(&new.currency)
    .bind(totals.discount_amount)
    .bind(new.rates.iva)
    .bind(new.rates.municipal)
    .bind(new.rates.service)
    .bind(totals.subtotal)
    .bind(totals.taxable_base)
    .bind(totals.iva_amount)
    .bind(totals.municipal_amount)
    .bind(totals.service_amount)
    .bind(totals.tax_amount)
    .bind(totals.total)
    .bind(new.notes)
    .fetch_one(&mut **tx)
    .await?;

    let mut lines = Vec::with_capacity(new.lines.len());
    for (i, l) in new.lines.iter().enumerate() {
        let line_total = l
            .checked_total()
            .ok_or(BillingError::InvalidLine { index: i, reason: "line total is too large" })?;
        let row = query_as::<_, InvoiceLine>(
            r#"
            INSERT INTO public.invoice_lines
              (invoice_id, description, quantity, unit_price, is_taxable, line_total, sort_order)
            VALUES ($1,$2,$3,$4,$5,$6,$7)
            RETURNING *
            "#,
        )
        .bind(invoice.invoice_id)
        .bind(l.description.trim())
        .bind(l.quantity)
        .bind(l.unit_price)
        .bind(l.is_taxable)
        .bind(line_total)
        .bind(i as i32)
        .fetch_one(&mut **tx)
        .await?;
        lines.push(row);
    }

    tracing::info!(
        invoice_id = invoice.invoice_id,
        invoice_number = %invoice.invoice_number,
        total = %invoice.total_amount,
        currency = %invoice.currency,
        "invoice created"
    );
    Ok((invoice, lines))
}

async fn load_detail(state: &AppState, id: i64) -> ApiResult<InvoiceDetail> {
    let invoice = query_as::<_, Invoice>(r#"SELECT * FROM public.invoices WHERE invoice_id = $1"#)
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("invoice {id}")))?;
    let lines = query_as::<_, InvoiceLine>(
        r#"SELECT * FROM public.invoice_lines WHERE invoice_id = $1 ORDER BY sort_order"#,
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await?;
    let settlements = load_settlements(&state.pool, id).await?;
    let balance = balance(invoice.total_amount, &settlements);
    Ok(InvoiceDetail { invoice, lines, balance })
}

/// POST /api/v1/invoices/preview
///
/// Computes totals without persisting anything.
pub async fn preview_invoice(
    State(state): State<AppState>,
    Json(b): Json<PreviewBody>,
) -> ApiResult<Json<InvoiceTotals>> {
    let rates = b.tax_rates.unwrap_or(state.config.default_tax_rates);
    Ok(Json(compute_totals(&b.lines, b.discount_amount, &rates)?))
}

pub async fn create_invoice(
    State(state): State<AppState>,
    Json(b): Json<CreateInvoiceBody>,
) -> ApiResult<Json<InvoiceDetail>> {
    let rates = b.tax_rates.unwrap_or(state.config.default_tax_rates);
    // Fail on bad input before opening a transaction.
    compute_totals(&b.lines, b.discount_amount, &rates)?;

    let mut tx = state.pool.begin().await?;
    let (invoice, lines) = insert_invoice(
        &mut tx,
        NewInvoice {
            guest_id: b.guest_id,
            company_name: b.company_name,
            reservation_id: b.reservation_id,
            invoice_date: b.invoice_date,
            due_date: b.due_date,
            currency: b
                .currency
                .map(|c| c.trim().to_uppercase())
                .unwrap_or_else(|| state.config.default_currency.clone()),
            discount: b.discount_amount,
            rates,
            lines: b.lines,
            notes: b.notes,
        },
    )
    .await?;
    tx.commit().await?;

    let balance = balance(invoice.total_amount, &[]);
    Ok(Json(InvoiceDetail { invoice, lines, balance }))
}

/// POST /api/v1/reservations/:id/invoice
///
/// Bills the stay as one taxable line.
pub async fn invoice_reservation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Option<Json<InvoiceReservationBody>>,
) -> ApiResult<Json<InvoiceDetail>> {
    let b = body.map(|Json(b)| b).unwrap_or_default();
    let rates = b.tax_rates.unwrap_or(state.config.default_tax_rates);

    let mut tx = state.pool.begin().await?;
    let res = lock_reservation(&mut tx, id).await?;
    if parse_text::<ReservationStatus>(&res.status)? == ReservationStatus::Cancelled {
        return Err(ApiError::Conflict(format!("reservation {id} is cancelled")));
    }
    let (room_number,): (String,) = query_as(r#"SELECT number FROM public.rooms WHERE room_id = $1"#)
        .bind(res.room_id)
        .fetch_one(&mut *tx)
        .await?;

    let mut lines = vec![LineItem {
        description: format!(
            "Room {room_number}: {} night(s) {} to {}",
            res.nights, res.check_in_date, res.check_out_date
        ),
        quantity: Decimal::from(res.nights),
        unit_price: res.room_rate,
        is_taxable: true,
    }];
    lines.extend(b.extra_lines);

    let (invoice, lines) = insert_invoice(
        &mut tx,
        NewInvoice {
            guest_id: Some(res.guest_id),
            company_name: b.company_name,
            reservation_id: Some(res.reservation_id),
            invoice_date: None,
            due_date: b.due_date,
            currency: res.currency.clone(),
            discount: b.discount_amount,
            rates,
            lines,
            notes: None,
        },
    )
    .await?;
    tx.commit().await?;

    let balance = balance(invoice.total_amount, &[]);
    Ok(Json(InvoiceDetail { invoice, lines, balance }))
}

pub async fn list_invoices(
    State(state): State<AppState>,
    Query(q): Query<ListInvoicesQ>,
) -> ApiResult<Json<Vec<Invoice>>> {
    let (limit, offset) = page(q.limit, q.offset);
    let status = q.status.as_deref().map(parse_text::<InvoiceStatus>).transpose()?;
    let payment_status = q
        .payment_status
        .as_deref()
        .map(parse_text::<InvoicePaymentStatus>)
        .transpose()?;

    let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM public.invoices WHERE TRUE");
    if let Some(s) = status {
        qb.push(" AND status = ").push_bind(s.as_str());
    }
    if let Some(p) = payment_status {
        qb.push(" AND payment_status = ").push_bind(p.as_str());
    }
    if let Some(g) = q.guest_id {
        qb.push(" AND guest_id = ").push_bind(g);
    }
    if let Some(from) = q.from {
        qb.push(" AND invoice_date >= ").push_bind(from);
    }
    if let Some(to) = q.to {
        qb.push(" AND invoice_date < ").push_bind(to);
    }
    qb.push(" ORDER BY invoice_date DESC, invoice_id DESC LIMIT ").push_bind(limit);
    qb.push(" OFFSET ").push_bind(offset);

    let rows = qb.build_query_as::<Invoice>().fetch_all(&state.pool).await?;
    Ok(Json(rows))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<InvoiceDetail>> {
    Ok(Json(load_detail(&state, id).await?))
}

/// PATCH /api/v1/invoices/:id/status
///
/// Manual PENDING/SENT/OVERDUE moves.
/// PAID follows payments and CANCELLED has its own endpoint.
pub async fn set_invoice_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(b): Json<InvoiceStatusBody>,
) -> ApiResult<Json<InvoiceDetail>> {
    let next = parse_text::<InvoiceStatus>(&b.status)?;
    if matches!(next, InvoiceStatus::Paid | InvoiceStatus::Cancelled) {
        return Err(ApiError::validation(format!("{next} cannot be set directly")));
    }

    let res = query(
        r#"UPDATE public.invoices SET status = $2, updated_at = now()
           WHERE invoice_id = $1 AND status NOT IN ('PAID','CANCELLED')"#,
    )
    .bind(id)
    .bind(next.as_str())
    .execute(&state.pool)
    .await?;
    if res.rows_affected() == 0 {
        // Either missing or closed; load_detail tells the two apart.
        let detail = load_detail(&state, id).await?;
        return Err(ApiError::Conflict(format!(
            "invoice {} is {}",
            detail.invoice.invoice_number, detail.invoice.status
        )));
    }
    Ok(Json(load_detail(&state, id).await?))
}

/// Cancellation is a status, never a delete. Invoices with settled money
/// must be refunded first.
pub async fn cancel_invoice(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<InvoiceDetail>> {
    let mut tx = state.pool.begin().await?;
    let invoice = query_as::<_, Invoice>(
        r#"SELECT * FROM public.invoices WHERE invoice_id = $1 FOR UPDATE"#,
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| ApiError::not_found(format!("invoice {id}")))?;

    if parse_text::<InvoiceStatus>(&invoice.status)? == InvoiceStatus::Cancelled {
        return Err(ApiError::Conflict(format!("invoice {} is already cancelled", invoice.invoice_number)));
    }
    let settled = balance(invoice.total_amount, &load_settlements(&mut *tx, id).await?);
    if settled.paid > Decimal::ZERO {
        return Err(ApiError::Conflict(format!(
            "invoice {} has {} in completed payments; refund them first",
            invoice.invoice_number, settled.paid
        )));
    }

    query(r#"UPDATE public.invoices SET status = 'CANCELLED', updated_at = now() WHERE invoice_id = $1"#)
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(invoice_id = id, "invoice cancelled");
    Ok(Json(load_detail(&state, id).await?))
}

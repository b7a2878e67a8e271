// src/routes/portal.rs

use axum::{extract::{Path, State}, Json};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{query_as, FromRow};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Serialize, FromRow)]
pub struct PortalReservation {
    pub confirmation_code: Uuid,
    pub guest_name: String,
    pub room_number: String,
    pub room_type: String,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub nights: i32,
    pub adults: i32,
    pub children: i32,
    pub status: String,
    pub payment_status: String,
    pub total_amount: Decimal,
    pub currency: String,
}

/// GET /api/v1/portal/reservations/:code
pub async fn get_by_confirmation_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Json<PortalReservation>> {
    let code = Uuid::parse_str(code.trim())
        .map_err(|_| ApiError::validation("malformed confirmation code"))?;

    let row = query_as::<_, PortalReservation>(
        r#"SELECT r.confirmation_code, g.full_name AS guest_name, rm.number AS room_number,
                  t.name AS room_type, r.check_in_date, r.check_out_date, r.nights,
                  r.adults, r.children, r.status, r.payment_status, r.total_amount, r.currency
           FROM public.reservations r
           JOIN public.guests g ON g.guest_id = r.guest_id
           JOIN public.rooms rm ON rm.room_id = r.room_id
           JOIN public.room_types t ON t.room_type_id = rm.room_type_id
           WHERE r.confirmation_code = $1"#,
    )
    .bind(code)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::not_found("reservation"))?;
    Ok(Json(row))
}

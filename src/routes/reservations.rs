// src/routes/reservations.rs

use axum::{extract::{Path, Query, State}, Json};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::{query, query_as, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use super::availability::{load_booked, lock_room};
use super::{page, parse_text};
use crate::error::{ApiError, ApiResult};
use crate::models::{Reservation, ReservationStatus, RoomStatus};
use crate::pricing::{self, StayRequest};
use crate::AppState;

#[derive(Deserialize)]
pub struct CreateReservationBody {
    pub guest_id: i64,
    pub room_id: i64,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub adults: i32,
    #[serde(default)] pub children: i32,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct ListReservationsQ {
    pub status: Option<String>,
    pub guest_id: Option<i64>,
    pub room_id: Option<i64>,
    /// Together with `to`, keeps reservations whose stay overlaps `[from, to)`.
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Deserialize)]
pub struct NotesBody {
    pub notes: Option<String>,
}

/// POST /api/v1/reservations
///
/// The overlap check and the insert run in one SERIALIZABLE transaction with
/// the room row locked, so two requests for the same room and nights cannot
/// both succeed. The exclusion constraint on `reservations` backs this up.
pub async fn create_reservation(
    State(state): State<AppState>,
    Json(b): Json<CreateReservationBody>,
) -> ApiResult<Json<Reservation>> {
    let req = StayRequest {
        check_in: b.check_in_date,
        check_out: b.check_out_date,
        adults: b.adults,
        children: b.children,
        room_type_id: None,
        floor: None,
    };
    pricing::validate(&req)?;

    let mut tx = state.pool.begin().await?;
    query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
        .execute(&mut *tx)
        .await?;

    let room = lock_room(&mut *tx, b.room_id).await?;
    let guest_exists: Option<(i64,)> =
        query_as(r#"SELECT guest_id FROM public.guests WHERE guest_id = $1"#)
            .bind(b.guest_id)
            .fetch_optional(&mut *tx)
            .await?;
    if guest_exists.is_none() {
        return Err(ApiError::not_found(format!("guest {}", b.guest_id)));
    }

    pricing::check_occupancy(&room, &req)?;
    let booked = load_booked(&mut *tx, req.check_in, req.check_out, Some(room.room_id)).await?;
    if booked.iter().any(|s| pricing::blocks(s, req.check_in, req.check_out)) {
        return Err(ApiError::Conflict(format!(
            "room {} is not available from {} to {}",
            room.number, req.check_in, req.check_out
        )));
    }

    let quote = pricing::quote(room.base_rate, &room.currency, req.check_in, req.check_out)?;
    let nights = i32::try_from(quote.nights)
        .map_err(|_| ApiError::validation("stay is too long"))?;

    let row = query_as::<_, Reservation>(
        r#"
        INSERT INTO public.reservations
          (confirmation_code, guest_id, room_id, check_in_date, check_out_date,
           adults, children, status, payment_status, nights, room_rate, total_amount,
           currency, notes)
        VALUES ($1,$2,$3,$4,$5,$6,$7,'CONFIRMED','PENDING',$8,$9,$10,$11,$12)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(b.guest_id)
    .bind(room.room_id)
    .bind(req.check_in)
    .bind(req.check_out)
    .bind(req.adults)
    .bind(req.children)
    .bind(nights)
    .bind(quote.nightly_rate)
    .bind(quote.total)
    .bind(&quote.currency)
    .bind(b.notes)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        reservation_id = row.reservation_id,
        room_id = row.room_id,
        nights = row.nights,
        total = %row.total_amount,
        "reservation created"
    );
    Ok(Json(row))
}

pub async fn list_reservations(
    State(state): State<AppState>,
    Query(q): Query<ListReservationsQ>,
) -> ApiResult<Json<Vec<Reservation>>> {
    let (limit, offset) = page(q.limit, q.offset);
    let status = q.status.as_deref().map(parse_text::<ReservationStatus>).transpose()?;
    if let (Some(from), Some(to)) = (q.from, q.to) {
        if to <= from {
            return Err(ApiError::validation("'to' must be after 'from'"));
        }
    }

    let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM public.reservations WHERE TRUE");
    if let Some(s) = status {
        qb.push(" AND status = ").push_bind(s.as_str());
    }
    if let Some(g) = q.guest_id {
        qb.push(" AND guest_id = ").push_bind(g);
    }
    if let Some(r) = q.room_id {
        qb.push(" AND room_id = ").push_bind(r);
    }
    if let Some(to) = q.to {
        qb.push(" AND check_in_date < ").push_bind(to);
    }
    if let Some(from) = q.from {
        qb.push(" AND check_out_date > ").push_bind(from);
    }
    qb.push(" ORDER BY check_in_date DESC, reservation_id DESC LIMIT ").push_bind(limit);
    qb.push(" OFFSET ").push_bind(offset);

    let rows = qb.build_query_as::<Reservation>().fetch_all(&state.pool).await?;
    Ok(Json(rows))
}

pub async fn get_reservation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Reservation>> {
    let row = query_as::<_, Reservation>(r#"SELECT * FROM public.reservations WHERE reservation_id = $1"#)
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("reservation {id}")))?;
    Ok(Json(row))
}

/// Notes stay editable in every status, including terminal ones.
pub async fn patch_notes(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(b): Json<NotesBody>,
) -> ApiResult<Json<Reservation>> {
    let row = query_as::<_, Reservation>(
        r#"UPDATE public.reservations SET notes = $2, updated_at = now()
           WHERE reservation_id = $1
           RETURNING *"#,
    )
    .bind(id)
    .bind(b.notes)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::not_found(format!("reservation {id}")))?;
    Ok(Json(row))
}

pub(crate) async fn lock_reservation(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
) -> ApiResult<Reservation> {
    query_as::<_, Reservation>(
        r#"SELECT * FROM public.reservations WHERE reservation_id = $1 FOR UPDATE"#,
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| ApiError::not_found(format!("reservation {id}")))
}

async fn set_room_status(
    tx: &mut Transaction<'_, Postgres>,
    room_id: i64,
    status: RoomStatus,
) -> ApiResult<()> {
    query(r#"UPDATE public.rooms SET status = $2, updated_at = now() WHERE room_id = $1"#)
        .bind(room_id)
        .bind(status.as_str())
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Moves a reservation to `next` if the status machine allows it, applying
/// the room and housekeeping side effects in the same transaction.
async fn transition(state: &AppState, id: i64, next: ReservationStatus) -> ApiResult<Reservation> {
    let mut tx = state.pool.begin().await?;
    let current = lock_reservation(&mut tx, id).await?;
    let from = parse_text::<ReservationStatus>(&current.status)?;
    if !from.can_transition_to(next) {
        return Err(ApiError::Conflict(format!(
            "reservation {id} cannot move from {from} to {next}"
        )));
    }

    let row = query_as::<_, Reservation>(
        r#"UPDATE public.reservations SET status = $2, updated_at = now()
           WHERE reservation_id = $1
           RETURNING *"#,
    )
    .bind(id)
    .bind(next.as_str())
    .fetch_one(&mut *tx)
    .await?;

    match next {
        ReservationStatus::CheckedIn => {
            set_room_status(&mut tx, row.room_id, RoomStatus::Occupied).await?;
        }
        ReservationStatus::CheckedOut => {
            set_room_status(&mut tx, row.room_id, RoomStatus::Cleaning).await?;
            query(
                r#"INSERT INTO public.housekeeping_tasks (room_id, reservation_id, task_type, status)
                   VALUES ($1, $2, 'CHECKOUT_CLEAN', 'PENDING')"#,
            )
            .bind(row.room_id)
            .bind(row.reservation_id)
            .execute(&mut *tx)
            .await?;
        }
        _ => {}
    }

    tx.commit().await?;
    tracing::info!(reservation_id = id, from = %from, to = %next, "reservation status changed");
    Ok(row)
}

/// POST /api/v1/reservations/:id/check-in
pub async fn check_in(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Reservation>> {
    Ok(Json(transition(&state, id, ReservationStatus::CheckedIn).await?))
}

/// POST /api/v1/reservations/:id/check-out
pub async fn check_out(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Reservation>> {
    Ok(Json(transition(&state, id, ReservationStatus::CheckedOut).await?))
}

pub async fn cancel(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Reservation>> {
    Ok(Json(transition(&state, id, ReservationStatus::Cancelled).await?))
}

pub async fn no_show(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Reservation>> {
    Ok(Json(transition(&state, id, ReservationStatus::NoShow).await?))
}

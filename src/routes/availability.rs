// src/routes/availability.rs

use axum::{extract::{Query, State}, Json};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{query_as, PgExecutor};

use crate::error::{ApiError, ApiResult};
use crate::models::{ReservationStatus, RoomWithType};
use crate::pricing::{self, AvailableRoom, BookedSpan, StayRequest};
use crate::AppState;

#[derive(Deserialize)]
pub struct AvailabilityQ {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub adults: Option<i32>,
    pub children: Option<i32>,
    pub room_type_id: Option<i64>,
    pub floor: Option<i32>,
}

#[derive(Serialize)]
pub struct AvailabilityResp {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub nights: i64,
    pub rooms: Vec<AvailableRoom>,
}

const ROOM_WITH_TYPE: &str = r#"
    SELECT r.room_id, r.number, r.floor, r.status, r.room_type_id,
           t.name AS room_type_name, t.max_occupancy, t.base_rate, t.currency
    FROM public.rooms r
    JOIN public.room_types t ON t.room_type_id = r.room_type_id"#;

pub(crate) async fn load_rooms<'e, E: PgExecutor<'e>>(ex: E) -> ApiResult<Vec<RoomWithType>> {
    let rows = query_as::<_, RoomWithType>(&format!("{ROOM_WITH_TYPE} ORDER BY r.number"))
        .fetch_all(ex)
        .await?;
    Ok(rows)
}

/// Loads one room and locks its row until the surrounding transaction ends.
pub(crate) async fn lock_room<'e, E: PgExecutor<'e>>(ex: E, room_id: i64) -> ApiResult<RoomWithType> {
    query_as::<_, RoomWithType>(&format!("{ROOM_WITH_TYPE} WHERE r.room_id = $1 FOR UPDATE OF r"))
        .bind(room_id)
        .fetch_optional(ex)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("room {room_id}")))
}

/// Active reservations overlapping `[check_in, check_out)`, optionally for one room.
/// The predicate is the same half-open test as `pricing::overlaps`.
pub(crate) async fn load_booked<'e, E: PgExecutor<'e>>(
    ex: E,
    check_in: NaiveDate,
    check_out: NaiveDate,
    room_id: Option<i64>,
) -> ApiResult<Vec<BookedSpan>> {
    let rows = query_as::<_, (i64, NaiveDate, NaiveDate, String)>(
        r#"SELECT room_id, check_in_date, check_out_date, status
           FROM public.reservations
           WHERE status IN ('CONFIRMED','CHECKED_IN')
             AND check_in_date < $2 AND check_out_date > $1
             AND ($3::bigint IS NULL OR room_id = $3)"#,
    )
    .bind(check_in)
    .bind(check_out)
    .bind(room_id)
    .fetch_all(ex)
    .await?;

    rows.into_iter()
        .map(|(room_id, check_in, check_out, status)| {
            let status = status
                .parse::<ReservationStatus>()
                .map_err(|e| ApiError::Internal(e.into()))?;
            Ok(BookedSpan { room_id, check_in, check_out, status })
        })
        .collect()
}

/// GET /api/v1/availability
pub async fn search_availability(
    State(state): State<AppState>,
    Query(q): Query<AvailabilityQ>,
) -> ApiResult<Json<AvailabilityResp>> {
    let req = StayRequest {
        check_in: q.check_in,
        check_out: q.check_out,
        adults: q.adults.unwrap_or(1),
        children: q.children.unwrap_or(0),
        room_type_id: q.room_type_id,
        floor: q.floor,
    };
    pricing::validate(&req)?;

    let rooms = load_rooms(&state.pool).await?;
    let booked = load_booked(&state.pool, req.check_in, req.check_out, None).await?;
    let available = pricing::find_available(&rooms, &booked, &req)?;

    tracing::debug!(
        check_in = %req.check_in,
        check_out = %req.check_out,
        candidates = rooms.len(),
        available = available.len(),
        "availability search"
    );

    Ok(Json(AvailabilityResp {
        check_in: req.check_in,
        check_out: req.check_out,
        nights: pricing::nights(req.check_in, req.check_out)?,
        rooms: available,
    }))
}

// src/routes/rooms.rs

use axum::{extract::{Path, Query, State}, Json};
use serde::Deserialize;
use sqlx::{query_as, Postgres, QueryBuilder};

use super::{page, parse_text};
use crate::error::{ApiError, ApiResult};
use crate::models::{Room, RoomStatus};
use crate::AppState;

const COLUMNS: &str = "room_id, number, room_type_id, floor, status, notes, updated_at";

#[derive(Deserialize)]
pub struct ListRoomsQ {
    pub status: Option<String>,
    pub floor: Option<i32>,
    pub room_type_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Deserialize)]
pub struct CreateRoomBody {
    pub number: String,
    pub room_type_id: i64,
    pub floor: i32,
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct PatchRoomBody {
    pub number: Option<String>,
    pub room_type_id: Option<i64>,
    pub floor: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct RoomStatusBody {
    pub status: String,
}

pub async fn list_rooms(
    State(state): State<AppState>,
    Query(q): Query<ListRoomsQ>,
) -> ApiResult<Json<Vec<Room>>> {
    let (limit, offset) = page(q.limit, q.offset);
    let status = q.status.as_deref().map(parse_text::<RoomStatus>).transpose()?;

    let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM public.rooms WHERE TRUE"));
    if let Some(s) = status {
        qb.push(" AND status = ").push_bind(s.as_str());
    }
    if let Some(f) = q.floor {
        qb.push(" AND floor = ").push_bind(f);
    }
    if let Some(t) = q.room_type_id {
        qb.push(" AND room_type_id = ").push_bind(t);
    }
    qb.push(" ORDER BY number LIMIT ").push_bind(limit);
    qb.push(" OFFSET ").push_bind(offset);

    let rows = qb.build_query_as::<Room>().fetch_all(&state.pool).await?;
    Ok(Json(rows))
}

pub async fn get_room(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Room>> {
    let row = query_as::<_, Room>(&format!("SELECT {COLUMNS} FROM public.rooms WHERE room_id = $1"))
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("room {id}")))?;
    Ok(Json(row))
}

pub async fn create_room(
    State(state): State<AppState>,
    Json(body): Json<CreateRoomBody>,
) -> ApiResult<Json<Room>> {
    if body.number.trim().is_empty() {
        return Err(ApiError::validation("room number is required"));
    }
    let status = match body.status.as_deref() {
        Some(s) => parse_text::<RoomStatus>(s)?,
        None => RoomStatus::Available,
    };

    let row = query_as::<_, Room>(&format!(
        r#"
        INSERT INTO public.rooms (number, room_type_id, floor, status, notes)
        VALUES ($1,$2,$3,$4,$5)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(body.number.trim())
    .bind(body.room_type_id)
    .bind(body.floor)
    .bind(status.as_str())
    .bind(body.notes)
    .fetch_one(&state.pool)
    .await?;
    Ok(Json(row))
}

pub async fn patch_room(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<PatchRoomBody>,
) -> ApiResult<Json<Room>> {
    let row = query_as::<_, Room>(&format!(
        r#"
        UPDATE public.rooms SET
          number       = COALESCE($2, number),
          room_type_id = COALESCE($3, room_type_id),
          floor        = COALESCE($4, floor),
          notes        = COALESCE($5, notes),
          updated_at   = now()
        WHERE room_id = $1
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(body.number)
    .bind(body.room_type_id)
    .bind(body.floor)
    .bind(body.notes)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::not_found(format!("room {id}")))?;
    Ok(Json(row))
}

/// PATCH /api/v1/rooms/:id/status
pub async fn set_room_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<RoomStatusBody>,
) -> ApiResult<Json<Room>> {
    let status = parse_text::<RoomStatus>(&body.status)?;
    let row = query_as::<_, Room>(&format!(
        r#"UPDATE public.rooms SET status = $2, updated_at = now()
           WHERE room_id = $1
           RETURNING {COLUMNS}"#
    ))
    .bind(id)
    .bind(status.as_str())
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::not_found(format!("room {id}")))?;

    tracing::info!(room_id = id, status = %status, "room status changed");
    Ok(Json(row))
}

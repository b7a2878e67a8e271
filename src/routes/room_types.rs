// src/routes/room_types.rs

use axum::{extract::{Path, State}, Json};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::query_as;

use crate::billing::is_storable_money;
use crate::error::{ApiError, ApiResult};
use crate::models::RoomType;
use crate::AppState;

const COLUMNS: &str = "room_type_id, name, description, max_occupancy, base_rate, currency, created_at";

#[derive(Deserialize)]
pub struct CreateRoomTypeBody {
    pub name: String,
    pub description: Option<String>,
    pub max_occupancy: i32,
    pub base_rate: Decimal,
    pub currency: Option<String>,
}

#[derive(Deserialize)]
pub struct PatchRoomTypeBody {
    pub name: Option<String>,
    pub description: Option<String>,
    pub max_occupancy: Option<i32>,
    pub base_rate: Option<Decimal>,
}

fn check_limits(max_occupancy: Option<i32>, base_rate: Option<Decimal>) -> ApiResult<()> {
    if max_occupancy.is_some_and(|m| m < 1) {
        return Err(ApiError::validation("max_occupancy must be at least 1"));
    }
    if base_rate.is_some_and(|r| r < Decimal::ZERO) {
        return Err(ApiError::validation("base_rate cannot be negative"));
    }
    if base_rate.is_some_and(|r| !is_storable_money(r)) {
        return Err(ApiError::validation("base_rate allows at most 2 decimals and 10 digits"));
    }
    Ok(())
}

pub async fn list_room_types(State(state): State<AppState>) -> ApiResult<Json<Vec<RoomType>>> {
    let rows = query_as::<_, RoomType>(&format!(
        "SELECT {COLUMNS} FROM public.room_types ORDER BY name"
    ))
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(rows))
}

pub async fn get_room_type(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<RoomType>> {
    let row = query_as::<_, RoomType>(&format!(
        "SELECT {COLUMNS} FROM public.room_types WHERE room_type_id = $1"
    ))
    .bind(id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::not_found(format!("room type {id}")))?;
    Ok(Json(row))
}

pub async fn create_room_type(
    State(state): State<AppState>,
    Json(body): Json<CreateRoomTypeBody>,
) -> ApiResult<Json<RoomType>> {
    check_limits(Some(body.max_occupancy), Some(body.base_rate))?;
    if body.name.trim().is_empty() {
        return Err(ApiError::validation("name is required"));
    }
    let currency = body
        .currency
        .map(|c| c.trim().to_uppercase())
        .unwrap_or_else(|| state.config.default_currency.clone());

    let row = query_as::<_, RoomType>(&format!(
        r#"
        INSERT INTO public.room_types (name, description, max_occupancy, base_rate, currency)
        VALUES ($1,$2,$3,$4,$5)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(body.name.trim())
    .bind(body.description)
    .bind(body.max_occupancy)
    .bind(body.base_rate)
    .bind(currency)
    .fetch_one(&state.pool)
    .await?;
    Ok(Json(row))
}

pub async fn patch_room_type(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<PatchRoomTypeBody>,
) -> ApiResult<Json<RoomType>> {
    check_limits(body.max_occupancy, body.base_rate)?;
    let row = query_as::<_, RoomType>(&format!(
        r#"
        UPDATE public.room_types SET
          name          = COALESCE($2, name),
          description   = COALESCE($3, description),
          max_occupancy = COALESCE($4, max_occupancy),
          base_rate     = COALESCE($5, base_rate)
        WHERE room_type_id = $1
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(body.name)
    .bind(body.description)
    .bind(body.max_occupancy)
    .bind(body.base_rate)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::not_found(format!("room type {id}")))?;
    Ok(Json(row))
}

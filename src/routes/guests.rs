// src/routes/guests.rs

use axum::{extract::{Path, Query, State}, Json};
use serde::Deserialize;
use sqlx::query_as;

use super::page;
use crate::error::{ApiError, ApiResult};
use crate::models::Guest;
use crate::AppState;

#[derive(Deserialize)]
pub struct ListGuestsQ {
    pub q: Option<String>,
    pub vip: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Deserialize)]
pub struct CreateGuestBody {
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub document_id: Option<String>,
    #[serde(default)] pub is_vip: bool,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct PatchGuestBody {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub document_id: Option<String>,
    pub is_vip: Option<bool>,
    pub notes: Option<String>,
}

pub async fn list_guests(
    State(state): State<AppState>,
    Query(q): Query<ListGuestsQ>,
) -> ApiResult<Json<Vec<Guest>>> {
    let (limit, offset) = page(q.limit, q.offset);
    let pattern = q.q.map(|s| format!("%{}%", s.trim()));

    let rows = query_as::<_, Guest>(
        r#"SELECT * FROM public.guests
           WHERE ($1::text IS NULL OR full_name ILIKE $1 OR email ILIKE $1)
             AND ($2::boolean IS NULL OR is_vip = $2)
           ORDER BY full_name
           LIMIT $3 OFFSET $4"#,
    )
    .bind(pattern)
    .bind(q.vip)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(rows))
}

pub async fn get_guest(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Guest>> {
    let row = query_as::<_, Guest>(r#"SELECT * FROM public.guests WHERE guest_id = $1"#)
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("guest {id}")))?;
    Ok(Json(row))
}

pub async fn create_guest(
    State(state): State<AppState>,
    Json(b): Json<CreateGuestBody>,
) -> ApiResult<Json<Guest>> {
    if b.full_name.trim().is_empty() {
        return Err(ApiError::validation("full_name is required"));
    }
    let row = query_as::<_, Guest>(
        r#"
        INSERT INTO public.guests (full_name, email, phone, document_id, is_vip, notes)
        VALUES ($1,$2,$3,$4,$5,$6)
        RETURNING *
        "#,
    )
    .bind(b.full_name.trim())
    .bind(b.email)
    .bind(b.phone)
    .bind(b.document_id)
    .bind(b.is_vip)
    .bind(b.notes)
    .fetch_one(&state.pool)
    .await?;
    Ok(Json(row))
}

pub async fn patch_guest(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(b): Json<PatchGuestBody>,
) -> ApiResult<Json<Guest>> {
    let row = query_as::<_, Guest>(
        r#"
        UPDATE public.guests SET
          full_name   = COALESCE($2, full_name),
          email       = COALESCE($3, email),
          phone       = COALESCE($4, phone),
          document_id = COALESCE($5, document_id),
          is_vip      = COALESCE($6, is_vip),
          notes       = COALESCE($7, notes),
          updated_at  = now()
        WHERE guest_id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(b.full_name)
    .bind(b.email)
    .bind(b.phone)
    .bind(b.document_id)
    .bind(b.is_vip)
    .bind(b.notes)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::not_found(format!("guest {id}")))?;
    Ok(Json(row))
}

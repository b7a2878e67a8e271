// src/routes/housekeeping.rs

use axum::{extract::{Path, Query, State}, Json};
use serde::Deserialize;
use sqlx::{query, query_as};

use super::{page, parse_text};
use crate::error::{ApiError, ApiResult};
use crate::models::{HousekeepingStatus, HousekeepingTask, RoomStatus};
use crate::AppState;

#[derive(Deserialize)]
pub struct CreateTaskBody {
    pub room_id: i64,
    pub reservation_id: Option<i64>,
    #[serde(default = "default_task_type")] pub task_type: String,
    pub notes: Option<String>,
}
fn default_task_type() -> String { "CLEAN".into() }

#[derive(Deserialize)]
pub struct ListTasksQ {
    pub status: Option<String>,
    pub room_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Deserialize)]
pub struct TaskStatusBody {
    pub status: String,
}

pub async fn create_task(
    State(state): State<AppState>,
    Json(b): Json<CreateTaskBody>,
) -> ApiResult<Json<HousekeepingTask>> {
    let row = query_as::<_, HousekeepingTask>(
        r#"
        INSERT INTO public.housekeeping_tasks (room_id, reservation_id, task_type, status, notes)
        VALUES ($1,$2,$3,'PENDING',$4)
        RETURNING *
        "#,
    )
    .bind(b.room_id)
    .bind(b.reservation_id)
    .bind(b.task_type.trim().to_uppercase())
    .bind(b.notes)
    .fetch_one(&state.pool)
    .await?;
    Ok(Json(row))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Query(q): Query<ListTasksQ>,
) -> ApiResult<Json<Vec<HousekeepingTask>>> {
    let (limit, offset) = page(q.limit, q.offset);
    let status = q.status.as_deref().map(parse_text::<HousekeepingStatus>).transpose()?;
    let rows = query_as::<_, HousekeepingTask>(
        r#"SELECT * FROM public.housekeeping_tasks
           WHERE ($1::text IS NULL OR status = $1)
             AND ($2::bigint IS NULL OR room_id = $2)
           ORDER BY created_at DESC, task_id DESC
           LIMIT $3 OFFSET $4"#,
    )
    .bind(status.map(|s| s.as_str()))
    .bind(q.room_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(rows))
}

/// PATCH /api/v1/housekeeping/tasks/:id/status
///
/// Finishing a task releases a room that was waiting on cleaning.
pub async fn set_task_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(b): Json<TaskStatusBody>,
) -> ApiResult<Json<HousekeepingTask>> {
    let next = parse_text::<HousekeepingStatus>(&b.status)?;
    let mut tx = state.pool.begin().await?;

    let row = query_as::<_, HousekeepingTask>(
        r#"
        UPDATE public.housekeeping_tasks SET
          status = $2,
          completed_at = CASE WHEN $2 = 'DONE' THEN now() ELSE NULL END
        WHERE task_id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(next.as_str())
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| ApiError::not_found(format!("housekeeping task {id}")))?;

    if next == HousekeepingStatus::Done {
        query(
            r#"UPDATE public.rooms SET status = $2, updated_at = now()
               WHERE room_id = $1 AND status = $3"#,
        )
        .bind(row.room_id)
        .bind(RoomStatus::Available.as_str())
        .bind(RoomStatus::Cleaning.as_str())
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    tracing::info!(task_id = id, room_id = row.room_id, status = %next, "housekeeping task updated");
    Ok(Json(row))
}

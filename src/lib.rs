// src/lib.rs

use std::sync::Arc;

use axum::{
    routing::{get, patch, post},
    Router,
};
use sqlx::{Pool, Postgres};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod billing;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod pricing;
pub mod routes;

use config::Config;

#[derive(Clone)]
pub struct AppState {
    pub pool: Pool<Postgres>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(pool: Pool<Postgres>, config: Config) -> Self {
        Self { pool, config: Arc::new(config) }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = if state.config.cors_allow_any {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    Router::new()
        // health
        .route("/health", get(routes::health::health))
        // room types
        .route(
            "/api/v1/room-types",
            post(routes::room_types::create_room_type).get(routes::room_types::list_room_types),
        )
        .route(
            "/api/v1/room-types/:id",
            get(routes::room_types::get_room_type).patch(routes::room_types::patch_room_type),
        )
        // rooms (never deleted, only status-transitioned)
        .route(
            "/api/v1/rooms",
            post(routes::rooms::create_room).get(routes::rooms::list_rooms),
        )
        .route(
            "/api/v1/rooms/:id",
            get(routes::rooms::get_room).patch(routes::rooms::patch_room),
        )
        .route("/api/v1/rooms/:id/status", patch(routes::rooms::set_room_status))
        // guests
        .route(
            "/api/v1/guests",
            post(routes::guests::create_guest).get(routes::guests::list_guests),
        )
        .route(
            "/api/v1/guests/:id",
            get(routes::guests::get_guest).patch(routes::guests::patch_guest),
        )
        // availability + reservations
        .route("/api/v1/availability", get(routes::availability::search_availability))
        .route(
            "/api/v1/reservations",
            post(routes::reservations::create_reservation)
                .get(routes::reservations::list_reservations),
        )
        .route("/api/v1/reservations/:id", get(routes::reservations::get_reservation))
        .route(
            "/api/v1/reservations/:id/notes",
            patch(routes::reservations::patch_notes),
        )
        .route(
            "/api/v1/reservations/:id/check-in",
            post(routes::reservations::check_in),
        )
        .route(
            "/api/v1/reservations/:id/check-out",
            post(routes::reservations::check_out),
        )
        .route("/api/v1/reservations/:id/cancel", post(routes::reservations::cancel))
        .route("/api/v1/reservations/:id/no-show", post(routes::reservations::no_show))
        .route(
            "/api/v1/reservations/:id/invoice",
            post(routes::invoices::invoice_reservation),
        )
        // guest portal
        .route(
            "/api/v1/portal/reservations/:code",
            get(routes::portal::get_by_confirmation_code),
        )
        // invoices + payments
        .route(
            "/api/v1/invoices",
            post(routes::invoices::create_invoice).get(routes::invoices::list_invoices),
        )
        .route("/api/v1/invoices/preview", post(routes::invoices::preview_invoice))
        .route("/api/v1/invoices/:id", get(routes::invoices::get_invoice))
        .route("/api/v1/invoices/:id/status", patch(routes::invoices::set_invoice_status))
        .route("/api/v1/invoices/:id/cancel", post(routes::invoices::cancel_invoice))
        .route(
            "/api/v1/invoices/:id/payments",
            post(routes::payments::record_payment).get(routes::payments::list_payments),
        )
        .route("/api/v1/payments/:id/complete", post(routes::payments::complete_payment))
        .route("/api/v1/payments/:id/refund", post(routes::payments::refund_payment))
        // accounts receivable + fiscal
        .route("/api/v1/receivables", get(routes::receivables::list_receivables))
        .route(
            "/api/v1/receivables/mark-overdue",
            post(routes::receivables::mark_overdue),
        )
        .route("/api/v1/reports/fiscal", get(routes::reports::fiscal_report))
        // housekeeping
        .route(
            "/api/v1/housekeeping/tasks",
            post(routes::housekeeping::create_task).get(routes::housekeeping::list_tasks),
        )
        .route(
            "/api/v1/housekeeping/tasks/:id/status",
            patch(routes::housekeeping::set_task_status),
        )
        // state & middleware
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

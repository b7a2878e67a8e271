// tests/api_test.rs
//
// Router tests for the endpoints that validate or compute before touching
// the database. The pool is lazy and never connects.

mod common;

use axum::http::StatusCode;
use common::{lazy_app, money, send};
use rust_decimal::Decimal;
use serde_json::json;

#[tokio::test]
async fn health_reports_ok() {
    let (status, body) = send(&lazy_app(), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn invoice_preview_scales_tax_by_discount() {
    let payload = json!({
        "lines": [
            { "description": "Room", "quantity": "1", "unit_price": "100", "is_taxable": true },
            { "description": "Parking", "quantity": "2", "unit_price": "50", "is_taxable": false }
        ],
        "discount_amount": "20",
        "tax_rates": { "iva": "0.16" }
    });
    let (status, body) = send(&lazy_app(), "POST", "/api/v1/invoices/preview", Some(payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(money(&body["subtotal"]), Decimal::from(200));
    assert_eq!(money(&body["subtotal_after_discount"]), Decimal::from(180));
    assert_eq!(money(&body["taxable_base"]), Decimal::from(90));
    assert_eq!(money(&body["tax_amount"]), Decimal::new(144, 1));
    assert_eq!(money(&body["total"]), Decimal::new(1944, 1));
}

#[tokio::test]
async fn invoice_preview_falls_back_to_configured_rates() {
    let payload = json!({
        "lines": [{ "description": "Suite", "quantity": "1", "unit_price": "100" }]
    });
    let (status, body) = send(&lazy_app(), "POST", "/api/v1/invoices/preview", Some(payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(money(&body["iva_amount"]), Decimal::from(16));
    assert_eq!(money(&body["total"]), Decimal::from(116));
}

#[tokio::test]
async fn invoice_preview_rejects_discount_above_subtotal() {
    let payload = json!({
        "lines": [{ "description": "Suite", "quantity": "1", "unit_price": "50" }],
        "discount_amount": "60"
    });
    let (status, body) = send(&lazy_app(), "POST", "/api/v1/invoices/preview", Some(payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("exceeds subtotal"));
}

#[tokio::test]
async fn availability_rejects_inverted_range_before_lookup() {
    let (status, body) = send(
        &lazy_app(),
        "GET",
        "/api/v1/availability?check_in=2024-06-04&check_out=2024-06-01&adults=2",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("check_out_date"));
}

#[tokio::test]
async fn booking_rejects_same_day_checkout() {
    let payload = json!({
        "guest_id": 1,
        "room_id": 1,
        "check_in_date": "2024-06-01",
        "check_out_date": "2024-06-01",
        "adults": 1
    });
    let (status, _) = send(&lazy_app(), "POST", "/api/v1/reservations", Some(payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn fiscal_report_rejects_empty_period() {
    let (status, _) = send(
        &lazy_app(),
        "GET",
        "/api/v1/reports/fiscal?period_start=2024-07-01&period_end=2024-06-01",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn portal_rejects_malformed_confirmation_code() {
    let (status, _) = send(&lazy_app(), "GET", "/api/v1/portal/reservations/not-a-code", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_room_status_is_a_validation_error() {
    let (status, body) = send(
        &lazy_app(),
        "PATCH",
        "/api/v1/rooms/1/status",
        Some(json!({ "status": "HAUNTED" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("HAUNTED"));
}

#[tokio::test]
async fn payments_must_be_positive() {
    let (status, _) = send(
        &lazy_app(),
        "POST",
        "/api/v1/invoices/1/payments",
        Some(json!({ "amount": "0", "method": "CASH" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn paid_status_cannot_be_set_by_hand() {
    let (status, _) = send(
        &lazy_app(),
        "PATCH",
        "/api/v1/invoices/1/status",
        Some(json!({ "status": "PAID" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn overflowing_party_size_is_rejected() {
    let (status, body) = send(
        &lazy_app(),
        "GET",
        "/api/v1/availability?check_in=2024-06-01&check_out=2024-06-04&adults=2147483647&children=1",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("cannot exceed"));
}

#[tokio::test]
async fn invoice_preview_rejects_amounts_that_do_not_fit() {
    let huge = json!({
        "lines": [{ "description": "Suite", "quantity": "79228162514264337593543950335", "unit_price": "2" }]
    });
    let (status, _) = send(&lazy_app(), "POST", "/api/v1/invoices/preview", Some(huge)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let sub_cent = json!({
        "lines": [{ "description": "Suite", "quantity": "1", "unit_price": "33.335" }]
    });
    let (status, body) = send(&lazy_app(), "POST", "/api/v1/invoices/preview", Some(sub_cent)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("unit_price"));
}

#[tokio::test]
async fn payment_amount_must_fit_in_cents() {
    let (status, body) = send(
        &lazy_app(),
        "POST",
        "/api/v1/invoices/1/payments",
        Some(json!({ "amount": "10.005", "method": "CASH" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("amount"));
}

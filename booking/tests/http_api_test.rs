//! HTTP API tests: the full router driven with `oneshot`.

#![allow(clippy::unwrap_used, clippy::panic)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use imaging_booking::server::{build_router, AppState};
use imaging_booking::AppointmentService;
use imaging_booking_core::providers::{AppointmentStore, GatewayError, StoreError};
use imaging_booking_runtime::metrics::local_handle;
use imaging_booking_runtime::retry::RetryPolicy;
use imaging_booking_runtime::EffectRunner;
use imaging_booking_testing::fixtures::{sign, TEST_SECRET};
use imaging_booking_testing::{test_clock, InMemoryAppointmentStore, RecordingNotifier, RecordingPaymentGateway};
use imaging_booking_web::CORRELATION_ID_HEADER;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    store: InMemoryAppointmentStore,
    gateway: Arc<RecordingPaymentGateway>,
}

fn test_app() -> TestApp {
    let store = InMemoryAppointmentStore::new();
    let shared: Arc<dyn AppointmentStore> = Arc::new(store.clone());
    let gateway = Arc::new(RecordingPaymentGateway::new(TEST_SECRET));
    let service = AppointmentService::new(
        Arc::clone(&shared),
        gateway.clone(),
        Arc::new(RecordingNotifier::new()),
        Arc::new(test_clock()),
        EffectRunner::new(Duration::from_secs(1)),
    )
    .with_retry_policy(RetryPolicy::no_retry());

    let state = AppState::new(Arc::new(service), shared, local_handle());
    TestApp {
        router: build_router(state),
        store,
        gateway,
    }
}

impl TestApp {
    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    async fn book(&self, test_type: &str, date: &str) -> Value {
        let (status, body) = self
            .send(Method::POST, "/api/appointments", Some(booking_body(test_type, date)))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }
}

fn booking_body(test_type: &str, date: &str) -> Value {
    json!({
        "name": "Asha Rao",
        "email": "asha@example.com",
        "phone": "9876543210",
        "testType": test_type,
        "appointmentDate": date,
    })
}

#[tokio::test]
async fn test_create_appointment_returns_receipt() {
    let app = test_app();

    let body = app.book("xray", "2025-03-01T09:00").await;

    assert_eq!(body["appointment"]["amount"], 1000);
    assert_eq!(body["appointment"]["status"], "pending");
    assert_eq!(body["appointment"]["paymentStatus"], "pending");
    assert_eq!(body["appointment"]["testType"], "xray");
    assert_eq!(body["order"]["amount"], 100_000);
    assert_eq!(body["order"]["currency"], "INR");
    assert_eq!(body["order"]["id"], body["appointment"]["orderId"]);
}

#[tokio::test]
async fn test_validation_errors_use_error_envelope() {
    let app = test_app();

    let mut missing_name = booking_body("xray", "2025-03-01T09:00");
    missing_name["name"] = json!("   ");
    let (status, body) = app.send(Method::POST, "/api/appointments", Some(missing_name)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"code": "VALIDATION_ERROR", "message": "name is required"}));

    let (status, body) = app
        .send(Method::POST, "/api/appointments", Some(booking_body("x-ray", "2025-03-01T09:00")))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "invalid test type");

    assert!(app.store.is_empty());
}

#[tokio::test]
async fn test_mistyped_field_gets_its_validation_message() {
    let app = test_app();
    let mut body = booking_body("xray", "2025-03-01T09:00");
    body["phone"] = json!(9_876_543_210_u64);

    let (status, body) = app.send(Method::POST, "/api/appointments", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"code": "VALIDATION_ERROR", "message": "invalid phone"}));
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn test_malformed_json_is_a_validation_error() {
    let app = test_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/appointments")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["message"], "malformed JSON body");
}

#[tokio::test]
async fn test_double_booking_is_a_conflict() {
    let app = test_app();
    app.book("mri", "2025-03-01T09:00").await;

    let (status, body) = app
        .send(Method::POST, "/api/appointments", Some(booking_body("mri", "2025-03-01T09:00")))
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, json!({"code": "CONFLICT", "message": "slot already booked"}));
}

#[tokio::test]
async fn test_gateway_failure_is_bad_gateway_without_details() {
    let app = test_app();
    app.gateway.fail_next(GatewayError::Http {
        status: 401,
        message: "invalid key rzp_secret".to_string(),
    });

    let (status, body) = app
        .send(Method::POST, "/api/appointments", Some(booking_body("xray", "2025-03-01T09:00")))
        .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "BAD_GATEWAY");
    assert!(!body["message"].as_str().unwrap().contains("rzp_secret"));
}

#[tokio::test]
async fn test_store_failure_is_internal_error() {
    let app = test_app();
    app.store.fail_next(StoreError::Database("password authentication failed".to_string()));

    let (status, body) = app.send(Method::GET, "/api/appointments", None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "An internal error occurred");
}

#[tokio::test]
async fn test_verify_payment_flow() {
    let app = test_app();
    let booked = app.book("xray", "2025-03-01T09:00").await;
    let order_id = booked["order"]["id"].as_str().unwrap().to_string();

    let forged = json!({"orderId": order_id, "paymentId": "pay_1", "signature": "00".repeat(32)});
    let (status, body) = app
        .send(Method::POST, "/api/appointments/verify-payment", Some(forged))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_SIGNATURE");

    let signed = json!({
        "orderId": order_id,
        "paymentId": "pay_1",
        "signature": sign(TEST_SECRET, &order_id, "pay_1"),
    });
    let (status, body) = app
        .send(Method::POST, "/api/appointments/verify-payment", Some(signed))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "confirmed");
    assert_eq!(body["paymentStatus"], "completed");
    assert_eq!(body["paymentId"], "pay_1");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/appointments/verify-payment",
            Some(json!({"orderId": order_id, "paymentId": "pay_1"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "signature is required");
}

#[tokio::test]
async fn test_get_cancel_and_delete() {
    let app = test_app();
    let booked = app.book("ultrasound", "2025-03-01T09:00").await;
    let id = booked["appointment"]["id"].as_str().unwrap().to_string();

    let (status, body) = app.send(Method::GET, &format!("/api/appointments/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id.as_str());

    let (status, body) = app
        .send(Method::PATCH, &format!("/api/appointments/{id}/cancel"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");

    let (status, body) = app
        .send(Method::PATCH, &format!("/api/appointments/{id}/cancel"), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "appointment already cancelled");

    let (status, body) = app.send(Method::DELETE, &format!("/api/appointments/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Appointment deleted successfully"}));

    let (status, body) = app.send(Method::DELETE, &format!("/api/appointments/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_malformed_id_is_not_found() {
    let app = test_app();

    let (status, body) = app.send(Method::GET, "/api/appointments/12345", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_list_pagination_shape() {
    let app = test_app();
    for day in 1..=12 {
        app.book("xray", &format!("2025-03-{day:02}T09:00")).await;
    }

    let (status, body) = app
        .send(Method::GET, "/api/appointments?page=2&limit=5&testType=xray", None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appointments"].as_array().unwrap().len(), 5);
    assert_eq!(
        body["pagination"],
        json!({"currentPage": 2, "totalPages": 3, "totalAppointments": 12, "limit": 5})
    );

    let (status, body) = app.send(Method::GET, "/api/appointments?status=archived", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "invalid status");
}

#[tokio::test]
async fn test_catalogue_and_operational_endpoints() {
    let app = test_app();

    let (status, body) = app.send(Method::GET, "/api/test-types", None).await;
    assert_eq!(status, StatusCode::OK);
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 10);
    assert_eq!(entries[0], json!({"key": "xray", "name": "X-Ray", "price": 1000}));

    let (status, body) = app.send(Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = app.send(Method::GET, "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");

    let (status, _) = app.send(Method::GET, "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_responses_carry_correlation_id() {
    let app = test_app();
    let request = Request::builder()
        .uri("/api/test-types")
        .header(CORRELATION_ID_HEADER, "4c1ef9a4-54a7-4bb3-9d1c-0a1f1c3c2c6e")
        .body(Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(
        response.headers().get(CORRELATION_ID_HEADER).unwrap(),
        "4c1ef9a4-54a7-4bb3-9d1c-0a1f1c3c2c6e"
    );
}

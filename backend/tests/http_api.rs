use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header::CONTENT_TYPE},
};
use backend::{
    axum_http::http_serve,
    config::config_model::BackendServer,
    usecases::{
        bookings::BookingUseCase,
        payments::{PaymentGateway, PaymentUseCase},
    },
};
use hms::{
    infra::memory::{InMemoryBookingStore, InMemoryCatalog, InMemoryPaymentStore},
    notifications::{DispatchPolicy, NotificationDispatcher},
};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

struct StubGateway;

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_session(&self, tran_id: &str, _amount: Decimal) -> Result<String> {
        Ok(format!("https://sandbox.example/checkout/{tran_id}"))
    }
}

struct TestApp {
    router: Router,
    catalog: InMemoryCatalog,
}

impl TestApp {
    async fn new() -> Self {
        let bookings = Arc::new(InMemoryBookingStore::new());
        let payments = Arc::new(InMemoryPaymentStore::new());
        let catalog = InMemoryCatalog::new();
        let (dispatcher, _worker) =
            NotificationDispatcher::spawn(Vec::new(), DispatchPolicy::default());
        let publisher = Arc::new(dispatcher);

        let bookings_usecase = BookingUseCase::new(
            Arc::clone(&bookings),
            Arc::new(catalog.clone()),
            Arc::clone(&publisher),
        );
        let payments_usecase = PaymentUseCase::new(
            payments,
            bookings,
            Arc::new(StubGateway),
            publisher,
            Duration::from_secs(10),
        );
        let server = BackendServer {
            port: 0,
            body_limit: 1,
            timeout: 10,
        };
        let router = http_serve::app(bookings_usecase, payments_usecase, &server).unwrap();

        Self { router, catalog }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, body)
    }

    async fn json(&self, method: Method, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    async fn callback(&self, outcome: &str, form: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("/payments/{outcome}"))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .unwrap();
        self.send(request).await
    }
}

#[tokio::test]
async fn health_check_and_fallback() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/health-check").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".to_string()));

    let (status, _) = app.get("/no-such-route").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn room_booking_conflict_is_409() {
    let app = TestApp::new().await;
    let patient = app.catalog.add_patient().await;
    let room = app.catalog.add_room("101", Decimal::new(1200, 0), true).await;

    let request = |check_in: &str, check_out: &str| {
        json!({
            "booking_type": "room",
            "patient_id": patient.id,
            "room_id": room.id,
            "check_in_date": check_in,
            "check_out_date": check_out,
        })
    };

    let (status, body) = app
        .json(Method::POST, "/bookings/create", request("2024-05-01T12:00:00Z", "2024-05-03T12:00:00Z"))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["booking_type"], "room");
    assert_eq!(body["total_price"], 2400.0);
    assert!(body.get("service_id").is_none());

    let (status, body) = app
        .json(Method::POST, "/bookings/create", request("2024-05-02T12:00:00Z", "2024-05-04T12:00:00Z"))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 409);

    let (status, _) = app
        .json(Method::POST, "/bookings/create", request("2024-05-03T12:00:00Z", "2024-05-04T12:00:00Z"))
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn bad_input_is_400() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/bookings/get/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);

    let (status, body) = app
        .json(Method::POST, "/bookings/create", json!({ "booking_type": "spa" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);

    let (status, _) = app.get(&format!("/bookings/get/{}", Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn status_update_and_delete() {
    let app = TestApp::new().await;
    let patient = app.catalog.add_patient().await;
    let service = app.catalog.add_service("Dental", Decimal::new(700, 0)).await;

    let (_, booking) = app
        .json(
            Method::POST,
            "/bookings/create",
            json!({
                "booking_type": "service",
                "patient_id": patient.id,
                "service_id": service.id,
                "scheduled_at": "2024-05-10T09:00:00Z",
            }),
        )
        .await;
    assert_eq!(booking["serial_number"], 1);
    let id = booking["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .json(Method::PUT, &format!("/bookings/{id}/status"), json!({ "status": "completed" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .json(Method::PUT, &format!("/bookings/{id}/status"), json!({ "status": "canceled" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "canceled");

    let request = Request::builder()
        .method(Method::DELETE)
        .uri(format!("/bookings/delete/{id}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&format!("/bookings/get/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, all) = app.get("/bookings/get-all").await;
    assert_eq!(all, json!([]));
}

#[tokio::test]
async fn payment_settlement_flow() {
    let app = TestApp::new().await;
    let patient = app.catalog.add_patient().await;
    let service = app.catalog.add_service("MRI", Decimal::new(9000, 0)).await;

    let (_, booking) = app
        .json(
            Method::POST,
            "/bookings/create",
            json!({
                "booking_type": "service",
                "patient_id": patient.id,
                "service_id": service.id,
                "scheduled_at": "2024-05-11T10:00:00Z",
            }),
        )
        .await;
    let booking_id = booking["id"].as_str().unwrap().to_string();

    let (status, session) = app
        .json(Method::POST, "/payments/init", json!({ "booking_id": booking_id }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let tran_id = session["tran_id"].as_str().unwrap().to_string();
    assert_eq!(
        session["redirect_url"],
        format!("https://sandbox.example/checkout/{tran_id}")
    );

    let form = format!(
        "tran_id={tran_id}&bank_tran_id=B-77&amount=9000.00&card_type=VISA&val_id=V-1&tran_date=2024-05-11+10%3A05%3A00&status=VALID&risk_level=0"
    );
    let (status, ack) = app.callback("success", &form).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["outcome"], "applied");

    let (_, booking) = app.get(&format!("/bookings/get/{booking_id}")).await;
    assert_eq!(booking["status"], "confirmed");

    let (status, ack) = app.callback("success", &form).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["outcome"], "already_applied");

    let (status, ack) = app.callback("fail", &format!("tran_id={tran_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["outcome"], "ignored");

    let (status, payments) = app.get("/payments/get-all").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payments[0]["status"], "success");
    assert_eq!(payments[0]["method"], "VISA");
    assert_eq!(payments[0]["bank_tran_id"], "B-77");
    assert_eq!(payments[0]["amount"], 9000.0);

    let (status, body) = app
        .json(Method::POST, "/payments/init", json!({ "booking_id": booking_id }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
}

#[tokio::test]
async fn callbacks_always_answer_200() {
    let app = TestApp::new().await;

    let (status, ack) = app.callback("success", "tran_id=unknown").await;
    assert_eq!(status, StatusCode::OK);
    assert!(ack["error"].as_str().unwrap().contains("not found"));

    let (status, ack) = app.callback("fail", "tran_id=unknown").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["outcome"], "ignored");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/payments/cancel")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let (status, ack) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["error"], "malformed callback");
}

#[tokio::test]
async fn init_for_unknown_booking_is_404() {
    let app = TestApp::new().await;
    let (status, body) = app
        .json(Method::POST, "/payments/init", json!({ "booking_id": Uuid::new_v4() }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "booking not found");
}

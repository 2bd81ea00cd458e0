//! HTTP adapters against local fakes of the external services.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::{
    Form, Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use raffle_core::providers::{PaymentGateway, SessionRequest, UserDirectory};
use raffle_core::{Money, PaymentId, RaffleError, UserId};
use raffle_server::directory::HttpUserDirectory;
use raffle_server::stripe::StripeGateway;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Captured = Arc<Mutex<Vec<(Option<String>, HashMap<String, String>)>>>;

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn fake_stripe(status: StatusCode, body: Value) -> (String, Captured) {
    let captured: Captured = Arc::default();
    let app = Router::new()
        .route(
            "/v1/checkout/sessions",
            post(
                move |State(captured): State<Captured>,
                      headers: HeaderMap,
                      Form(form): Form<HashMap<String, String>>| {
                    let body = body.clone();
                    async move {
                        let auth = headers
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .map(ToString::to_string);
                        captured.lock().unwrap().push((auth, form));
                        (status, Json(body))
                    }
                },
            ),
        )
        .with_state(Arc::clone(&captured));
    (serve(app).await, captured)
}

fn session_request() -> SessionRequest {
    SessionRequest {
        reference: PaymentId::new(),
        unit_amount: Money::from_minor(15_000),
        quantity: 2,
        currency: "COP".to_string(),
        success_url: "https://raffles.example/ok".to_string(),
        cancel_url: "https://raffles.example/cancel".to_string(),
    }
}

#[tokio::test]
async fn test_stripe_opens_session() {
    let (base, captured) = fake_stripe(
        StatusCode::OK,
        json!({ "id": "cs_test_123", "url": "https://checkout.stripe.com/c/cs_test_123" }),
    )
    .await;
    let gateway = StripeGateway::new(base, "sk_test_key", Duration::from_secs(5)).unwrap();
    let request = session_request();

    let session = gateway.open_session(&request).await.unwrap();
    assert_eq!(session.session_id, "cs_test_123");
    assert_eq!(session.session_url, "https://checkout.stripe.com/c/cs_test_123");

    let calls = captured.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let (auth, form) = &calls[0];
    assert_eq!(auth.as_deref(), Some("Bearer sk_test_key"));
    assert_eq!(form["line_items[0][quantity]"], "2");
    assert_eq!(form["line_items[0][price_data][unit_amount]"], "15000");
    assert_eq!(form["client_reference_id"], request.reference.to_string());
}

#[tokio::test]
async fn test_stripe_error_is_gateway_failure() {
    let (base, _) = fake_stripe(
        StatusCode::PAYMENT_REQUIRED,
        json!({ "error": { "message": "card declined" } }),
    )
    .await;
    let gateway = StripeGateway::new(base, "sk_test_key", Duration::from_secs(5)).unwrap();

    let err = gateway.open_session(&session_request()).await.unwrap_err();
    assert!(matches!(err, RaffleError::GatewayFailure(ref msg) if msg.contains("402")));
}

#[tokio::test]
async fn test_stripe_session_without_url_is_rejected() {
    let (base, _) = fake_stripe(StatusCode::OK, json!({ "id": "cs_test_1", "url": null })).await;
    let gateway = StripeGateway::new(base, "sk_test_key", Duration::from_secs(5)).unwrap();

    let err = gateway.open_session(&session_request()).await.unwrap_err();
    assert!(matches!(err, RaffleError::GatewayFailure(_)));
}

#[tokio::test]
async fn test_unreachable_stripe_is_gateway_failure() {
    // Bind and drop to get a port nobody listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let gateway =
        StripeGateway::new(format!("http://{addr}"), "sk", Duration::from_secs(2)).unwrap();
    let err = gateway.open_session(&session_request()).await.unwrap_err();
    assert!(matches!(err, RaffleError::GatewayFailure(_)));
}

#[tokio::test]
async fn test_directory_resolves_and_reports_missing_users() {
    let known = uuid::Uuid::new_v4();
    let app = Router::new().route(
        "/users/:id",
        get(move |Path(id): Path<uuid::Uuid>| async move {
            if id == known {
                Ok(Json(json!({
                    "id": id,
                    "firstName": "Alice",
                    "lastName": "Arias",
                    "email": "alice@example.com"
                })))
            } else {
                Err(StatusCode::NOT_FOUND)
            }
        }),
    );
    let base = serve(app).await;
    let directory = HttpUserDirectory::new(format!("{base}/"), Duration::from_secs(5)).unwrap();

    let info = directory
        .basic_info(UserId::from_uuid(known))
        .await
        .unwrap();
    assert_eq!(info.full_name(), "Alice Arias");
    assert_eq!(info.email, "alice@example.com");

    let err = directory
        .basic_info(UserId::from_uuid(uuid::Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(matches!(err, RaffleError::NotFound { .. }));
}

#[tokio::test]
async fn test_directory_server_error_is_storage_failure() {
    let app = Router::new().route(
        "/users/:id",
        get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
    );
    let base = serve(app).await;
    let directory = HttpUserDirectory::new(base, Duration::from_secs(5)).unwrap();

    let err = directory
        .basic_info(UserId::from_uuid(uuid::Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(matches!(err, RaffleError::StorageFailure(_)));
}

//! Router tests over the in-memory providers.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use chrono::{Duration, Utc};
use raffle_core::mocks::{InMemoryStore, MockPaymentGateway, MockUserDirectory, RecordingNotifier};
use raffle_core::services::{PaymentLifecycle, Provisioner, TicketService, WinnerEngine};
use raffle_core::{Payment, PaymentConfig, PaymentStatus, Raffle, Ticket, UserId, Winner};
use raffle_web::webhook::{compute_signature, format_signature_header};
use raffle_web::{AppState, build_router};
use serde_json::{Value, json};
use std::sync::Arc;

const SECRET: &str = "whsec_test";

struct TestApp {
    server: TestServer,
    store: Arc<InMemoryStore>,
    gateway: Arc<MockPaymentGateway>,
    directory: Arc<MockUserDirectory>,
    creator: UserId,
}

fn app(webhook_secret: Option<&str>) -> TestApp {
    let store = Arc::new(InMemoryStore::new());
    let gateway = Arc::new(MockPaymentGateway::new());
    let directory = Arc::new(MockUserDirectory::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let creator = directory.add("Carla", "Creator", "carla@example.com");

    let mut state = AppState::new(
        Provisioner::new(store.clone(), "COP"),
        TicketService::new(store.clone(), store.clone()),
        PaymentLifecycle::new(
            store.clone(),
            store.clone(),
            store.clone(),
            gateway.clone(),
            PaymentConfig::default(),
        ),
        WinnerEngine::new(
            store.clone(),
            store.clone(),
            store.clone(),
            directory.clone(),
            notifier,
        ),
    );
    if let Some(secret) = webhook_secret {
        state = state.with_webhook_secret(secret);
    }

    TestApp {
        server: TestServer::new(build_router(state)).unwrap(),
        store,
        gateway,
        directory,
        creator,
    }
}

fn user_header(id: UserId) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-user-id"),
        HeaderValue::from_str(&id.to_string()).unwrap(),
    )
}

fn completed_event(session_id: &str) -> String {
    json!({
        "type": "checkout.session.completed",
        "data": { "object": { "id": session_id } }
    })
    .to_string()
}

impl TestApp {
    async fn create_raffle(&self, ticket_count: u32) -> Raffle {
        let (name, value) = user_header(self.creator);
        let response = self
            .server
            .post("/raffles")
            .add_header(name, value)
            .json(&json!({
                "name": "Motorbike",
                "description": "Red, 150cc",
                "price": 15000,
                "ticketCount": ticket_count,
                "initDate": Utc::now() - Duration::minutes(1),
                "endDate": Utc::now() + Duration::days(30)
            }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        response.json::<Raffle>()
    }

    async fn tickets(&self, raffle: &Raffle, available: bool) -> Vec<Ticket> {
        self.server
            .get(&format!("/raffles/{}/tickets?available={available}", raffle.id))
            .await
            .json::<Vec<Ticket>>()
    }

    async fn claim(&self, ticket: &Ticket, owner: UserId) -> axum_test::TestResponse {
        self.server
            .patch(&format!("/tickets/{}", ticket.id))
            .json(&json!({ "ownerId": owner }))
            .await
    }

    async fn pay(&self, raffle: &Raffle, tickets: &[&Ticket]) -> Value {
        let ids: Vec<_> = tickets.iter().map(|t| t.id).collect();
        let amount = raffle.price.minor() * ids.len() as u64;
        let response = self
            .server
            .post("/payments")
            .json(&json!({ "raffleId": raffle.id, "ticketIds": ids, "amount": amount }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        response.json::<Value>()
    }
}

#[tokio::test]
async fn test_health() {
    let app = app(None);
    let response = app.server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.text(), "ok");
}

#[tokio::test]
async fn test_full_purchase_and_draw() {
    let app = app(None);
    let raffle = app.create_raffle(10).await;
    assert_eq!(raffle.tickets_created, 10);
    assert_eq!(raffle.currency, "COP");

    let pool = app.tickets(&raffle, false).await;
    assert_eq!(pool.len(), 10);

    let alice = app.directory.add("Alice", "Arias", "alice@example.com");
    let claimed = app.claim(&pool[2], alice).await;
    assert_eq!(claimed.status_code(), StatusCode::OK);
    assert_eq!(claimed.json::<Ticket>().owner_id, Some(alice));
    assert_eq!(app.tickets(&raffle, true).await.len(), 9);

    let checkout = app.pay(&raffle, &[&pool[2]]).await;
    let session_id = checkout["payment"]["gatewaySessionId"].as_str().unwrap().to_string();
    let payment_id = checkout["payment"]["id"].as_str().unwrap().to_string();
    assert!(checkout["redirectUrl"].as_str().unwrap().contains(&session_id));
    assert_eq!(app.gateway.requests().len(), 1);

    let ack = app
        .server
        .post("/payments/webhook")
        .text(completed_event(&session_id))
        .await;
    assert_eq!(ack.status_code(), StatusCode::OK);

    let payment = app
        .server
        .get(&format!("/payments/{payment_id}"))
        .await
        .json::<Payment>();
    assert_eq!(payment.status, PaymentStatus::Completed);

    let (name, value) = user_header(app.creator);
    let drawn = app
        .server
        .post("/winners")
        .add_header(name, value)
        .json(&json!({ "raffleId": raffle.id }))
        .await;
    assert_eq!(drawn.status_code(), StatusCode::CREATED);
    let winner = drawn.json::<Winner>();
    assert_eq!(winner.ticket_number, 3);
    assert_eq!(winner.user_id, alice);

    let fetched = app
        .server
        .get(&format!("/winners/{}", raffle.id))
        .await
        .json::<Winner>();
    assert_eq!(fetched, winner);
    assert_eq!(app.server.get("/winners").await.json::<Vec<Winner>>().len(), 1);

    let closed = app
        .server
        .get(&format!("/raffles/{}", raffle.id))
        .await
        .json::<Raffle>();
    assert!(!closed.is_active);
}

#[tokio::test]
async fn test_admin_routes_require_actor() {
    let app = app(None);
    let response = app
        .server
        .post("/raffles")
        .json(&json!({ "name": "x", "price": 1, "ticketCount": 10 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["code"], "UNAUTHORIZED");

    let raffle = app.create_raffle(10).await;
    let response = app
        .server
        .post("/winners")
        .add_header(
            HeaderName::from_static("x-user-id"),
            HeaderValue::from_static("not-a-uuid"),
        )
        .json(&json!({ "raffleId": raffle.id }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_raffle_is_bad_request() {
    let app = app(None);
    let (name, value) = user_header(app.creator);
    let response = app
        .server
        .post("/raffles")
        .add_header(name, value)
        .json(&json!({
            "name": "Tiny",
            "price": 1000,
            "ticketCount": 3,
            "initDate": Utc::now(),
            "endDate": Utc::now() + Duration::days(1)
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_double_claim_conflicts() {
    let app = app(None);
    let raffle = app.create_raffle(10).await;
    let pool = app.tickets(&raffle, false).await;
    let first = UserId::from_uuid(uuid::Uuid::new_v4());
    let second = UserId::from_uuid(uuid::Uuid::new_v4());

    assert_eq!(app.claim(&pool[0], first).await.status_code(), StatusCode::OK);
    let response = app.claim(&pool[0], second).await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["code"], "CONFLICT");
}

#[tokio::test]
async fn test_unknown_resources_are_not_found() {
    let app = app(None);
    let id = uuid::Uuid::new_v4();
    for path in [
        format!("/raffles/{id}"),
        format!("/raffles/{id}/tickets"),
        format!("/payments/{id}"),
        format!("/winners/{id}"),
    ] {
        let response = app.server.get(&path).await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND, "{path}");
    }
}

#[tokio::test]
async fn test_gateway_failure_is_bad_gateway() {
    let app = app(None);
    let raffle = app.create_raffle(10).await;
    let pool = app.tickets(&raffle, false).await;
    let owner = UserId::from_uuid(uuid::Uuid::new_v4());
    app.claim(&pool[0], owner).await;
    app.gateway.set_should_fail(true);

    let response = app
        .server
        .post("/payments")
        .json(&json!({
            "raffleId": raffle.id,
            "ticketIds": [pool[0].id],
            "amount": raffle.price.minor()
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);
    let body = response.json::<Value>();
    assert_eq!(body["code"], "GATEWAY_FAILURE");
    assert_eq!(body["message"], "Payment provider unavailable");
}

#[tokio::test]
async fn test_cancel_payment_releases_ticket() {
    let app = app(None);
    let raffle = app.create_raffle(10).await;
    let pool = app.tickets(&raffle, false).await;
    let owner = UserId::from_uuid(uuid::Uuid::new_v4());
    app.claim(&pool[0], owner).await;
    let checkout = app.pay(&raffle, &[&pool[0]]).await;
    let payment_id = checkout["payment"]["id"].as_str().unwrap();

    let cancelled = app
        .server
        .post(&format!("/payments/{payment_id}/cancel"))
        .await;
    assert_eq!(cancelled.status_code(), StatusCode::OK);
    assert_eq!(cancelled.json::<Payment>().status, PaymentStatus::Failed);
    assert_eq!(app.tickets(&raffle, true).await.len(), 10);
}

#[tokio::test]
async fn test_sweep_with_nothing_expired() {
    let app = app(None);
    let raffle = app.create_raffle(10).await;
    let pool = app.tickets(&raffle, false).await;
    app.claim(&pool[0], UserId::from_uuid(uuid::Uuid::new_v4())).await;
    app.pay(&raffle, &[&pool[0]]).await;

    let response = app.server.post("/payments/sweep").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>(), json!({ "swept": 0 }));
}

#[tokio::test]
async fn test_webhook_acknowledges_unknown_sessions() {
    let app = app(None);
    let response = app
        .server
        .post("/payments/webhook")
        .text(completed_event("cs_unknown"))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>(), json!({ "received": true }));
}

#[tokio::test]
async fn test_webhook_signature_enforced_when_configured() {
    let app = app(Some(SECRET));
    let raffle = app.create_raffle(10).await;
    let pool = app.tickets(&raffle, false).await;
    app.claim(&pool[0], UserId::from_uuid(uuid::Uuid::new_v4())).await;
    let checkout = app.pay(&raffle, &[&pool[0]]).await;
    let session_id = checkout["payment"]["gatewaySessionId"].as_str().unwrap();
    let payment_id = checkout["payment"]["id"].as_str().unwrap();
    let body = completed_event(session_id);

    let unsigned = app.server.post("/payments/webhook").text(body.clone()).await;
    assert_eq!(unsigned.status_code(), StatusCode::BAD_REQUEST);

    let ts = Utc::now().timestamp();
    let signature = compute_signature(body.as_bytes(), ts, SECRET.as_bytes()).unwrap();
    let signed = app
        .server
        .post("/payments/webhook")
        .add_header(
            HeaderName::from_static("stripe-signature"),
            HeaderValue::from_str(&format_signature_header(ts, &signature)).unwrap(),
        )
        .text(body)
        .await;
    assert_eq!(signed.status_code(), StatusCode::OK);

    let payment = app
        .server
        .get(&format!("/payments/{payment_id}"))
        .await
        .json::<Payment>();
    assert_eq!(payment.status, PaymentStatus::Completed);
}

#[tokio::test]
async fn test_cancelled_raffle_cannot_be_drawn() {
    let app = app(None);
    let raffle = app.create_raffle(10).await;
    let (name, value) = user_header(app.creator);

    let cancelled = app
        .server
        .post(&format!("/raffles/{}/cancel", raffle.id))
        .add_header(name.clone(), value.clone())
        .await;
    assert_eq!(cancelled.status_code(), StatusCode::OK);
    assert!(!cancelled.json::<Raffle>().is_active);

    let again = app
        .server
        .post(&format!("/raffles/{}/cancel", raffle.id))
        .add_header(name.clone(), value.clone())
        .await;
    assert_eq!(again.status_code(), StatusCode::BAD_REQUEST);

    let draw = app
        .server
        .post("/winners")
        .add_header(name, value)
        .json(&json!({ "raffleId": raffle.id }))
        .await;
    assert_eq!(draw.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_raffle_window_is_validated() {
    let app = app(None);
    let (name, value) = user_header(app.creator);
    let response = app
        .server
        .post("/raffles")
        .add_header(name, value)
        .json(&json!({
            "name": "Expired",
            "price": 1000,
            "ticketCount": 10,
            "initDate": Utc::now() - Duration::days(2),
            "endDate": Utc::now() - Duration::days(1)
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_claim_before_window_opens_is_rejected() {
    let app = app(None);
    let (name, value) = user_header(app.creator);
    let raffle = app
        .server
        .post("/raffles")
        .add_header(name, value)
        .json(&json!({
            "name": "Next week",
            "price": 1000,
            "ticketCount": 10,
            "initDate": Utc::now() + Duration::days(7),
            "endDate": Utc::now() + Duration::days(14)
        }))
        .await
        .json::<Raffle>();
    let pool = app.tickets(&raffle, false).await;

    let response = app.claim(&pool[0], UserId::from_uuid(uuid::Uuid::new_v4())).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "INVALID_STATE");
}

#[tokio::test]
async fn test_list_raffles_filters_by_state_and_name() {
    let app = app(None);
    let open = app.create_raffle(10).await;
    let closed = app.create_raffle(10).await;
    let (name, value) = user_header(app.creator);
    app.server
        .post(&format!("/raffles/{}/cancel", closed.id))
        .add_header(name, value)
        .await;

    let active = app
        .server
        .get("/raffles?isActive=true")
        .await
        .json::<Vec<Raffle>>();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, open.id);

    let by_name = app
        .server
        .get(&format!("/raffles?name=motor&createdBy={}", app.creator))
        .await
        .json::<Vec<Raffle>>();
    assert_eq!(by_name.len(), 2);

    let page = app.server.get("/raffles?limit=1&page=2").await.json::<Vec<Raffle>>();
    assert_eq!(page.len(), 1);

    let bad = app.server.get("/raffles?limit=0").await;
    assert_eq!(bad.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_raffle() {
    let app = app(None);
    let raffle = app.create_raffle(10).await;
    let (name, value) = user_header(app.creator);
    let end_date = raffle.end_date + Duration::days(3);

    let response = app
        .server
        .patch(&format!("/raffles/{}", raffle.id))
        .add_header(name.clone(), value.clone())
        .json(&json!({ "name": "Scooter", "endDate": end_date }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let updated = response.json::<Raffle>();
    assert_eq!(updated.name, "Scooter");
    assert_eq!(updated.end_date, end_date);
    assert_eq!(updated.price, raffle.price);

    let price = app
        .server
        .patch(&format!("/raffles/{}", raffle.id))
        .add_header(name.clone(), value.clone())
        .json(&json!({ "price": 1 }))
        .await;
    assert_eq!(price.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

    let backwards = app
        .server
        .patch(&format!("/raffles/{}", raffle.id))
        .add_header(name, value)
        .json(&json!({ "endDate": raffle.init_date - Duration::days(1) }))
        .await;
    assert_eq!(backwards.status_code(), StatusCode::BAD_REQUEST);

    let anonymous = app
        .server
        .patch(&format!("/raffles/{}", raffle.id))
        .json(&json!({ "name": "Nobody" }))
        .await;
    assert_eq!(anonymous.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_list_payments_filters_by_status() {
    let app = app(None);
    let raffle = app.create_raffle(10).await;
    let pool = app.tickets(&raffle, false).await;
    for ticket in &pool[..2] {
        app.claim(ticket, UserId::from_uuid(uuid::Uuid::new_v4())).await;
    }
    let first = app.pay(&raffle, &[&pool[0]]).await;
    app.pay(&raffle, &[&pool[1]]).await;
    let session_id = first["payment"]["gatewaySessionId"].as_str().unwrap();
    app.server
        .post("/payments/webhook")
        .text(completed_event(session_id))
        .await;

    let completed = app
        .server
        .get(&format!("/payments?raffleId={}&status=completed", raffle.id))
        .await
        .json::<Vec<Payment>>();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].gateway_session_id, session_id);

    let pending = app
        .server
        .get("/payments?status=pending")
        .await
        .json::<Vec<Payment>>();
    assert_eq!(pending.len(), 1);

    let by_session = app
        .server
        .get(&format!("/payments?sessionId={session_id}"))
        .await
        .json::<Vec<Payment>>();
    assert_eq!(by_session.len(), 1);

    let bad = app.server.get("/payments?status=refunded").await;
    assert_eq!(bad.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_webhook_storage_failure_is_redelivered() {
    let app = app(None);
    let raffle = app.create_raffle(10).await;
    let pool = app.tickets(&raffle, false).await;
    app.claim(&pool[0], UserId::from_uuid(uuid::Uuid::new_v4())).await;
    let checkout = app.pay(&raffle, &[&pool[0]]).await;
    let session_id = checkout["payment"]["gatewaySessionId"].as_str().unwrap();
    let payment_id = checkout["payment"]["id"].as_str().unwrap();

    app.store.fail_next_ticket_write();
    let failed = app
        .server
        .post("/payments/webhook")
        .text(completed_event(session_id))
        .await;
    assert_eq!(failed.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    let payment = app
        .server
        .get(&format!("/payments/{payment_id}"))
        .await
        .json::<Payment>();
    assert_eq!(payment.status, PaymentStatus::Pending);

    let redelivered = app
        .server
        .post("/payments/webhook")
        .text(completed_event(session_id))
        .await;
    assert_eq!(redelivered.status_code(), StatusCode::OK);
    let payment = app
        .server
        .get(&format!("/payments/{payment_id}"))
        .await
        .json::<Payment>();
    assert_eq!(payment.status, PaymentStatus::Completed);
    assert!(app.tickets(&raffle, false).await[0].is_paid);
}

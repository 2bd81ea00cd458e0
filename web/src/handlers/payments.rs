//! Payment endpoints.
//!
//! - `POST /payments` - open a checkout for claimed tickets
//! - `GET /payments` - list payments by raffle, status or gateway session
//! - `GET /payments/:id` - payment status
//! - `POST /payments/:id/cancel` - abandon a pending payment
//! - `POST /payments/webhook` - gateway confirmation
//! - `POST /payments/sweep` - fail payments pending past the timeout
//!
//! # Webhook contract
//!
//! The gateway retries any delivery that does not get a 2xx. The webhook
//! answers 200 for unknown sessions and for payments that can no longer
//! complete, 400 for a bad signature or payload, and 5xx when storage fails
//! so the gateway redelivers.

use crate::WebResult;
use crate::error::AppError;
use crate::extractors::CorrelationId;
use crate::state::AppState;
use crate::webhook::{GatewayEvent, SIGNATURE_HEADER, verify_signature};
use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use chrono::Utc;
use raffle_core::services::CheckoutSession;
use raffle_core::{
    Money, Page, Payment, PaymentFilter, PaymentId, PaymentStatus, RaffleError, RaffleId,
    TicketId,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of a payment request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    /// Raffle the tickets belong to
    pub raffle_id: Uuid,
    /// Claimed tickets to pay for
    pub ticket_ids: Vec<Uuid>,
    /// Total in minor units; must equal price times ticket count
    pub amount: Money,
}

/// Query parameters for payment listings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentQuery {
    /// Only payments of this raffle
    pub raffle_id: Option<Uuid>,
    /// `pending`, `completed` or `failed`
    pub status: Option<String>,
    /// Gateway checkout session id
    pub session_id: Option<String>,
    /// Page size
    pub limit: Option<u32>,
    /// 1-based page number
    pub page: Option<u32>,
}

impl PaymentQuery {
    fn into_filter(self) -> WebResult<PaymentFilter> {
        let status = self
            .status
            .map(|s| {
                PaymentStatus::parse(&s)
                    .ok_or_else(|| AppError::bad_request(format!("Unknown payment status: {s}")))
            })
            .transpose()?;
        Ok(PaymentFilter {
            raffle_id: self.raffle_id.map(RaffleId::from_uuid),
            status,
            gateway_session_id: self.session_id,
            page: Page::new(self.limit, self.page)?,
        })
    }
}

/// Acknowledgement returned to the gateway.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookAck {
    /// Always true once the delivery is accepted
    pub received: bool,
}

/// Result of a sweep.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SweepResponse {
    /// Payments moved to failed by this run
    pub swept: u64,
}

/// `POST /payments`
///
/// # Errors
///
/// 400 on invalid tickets or amount, 404 for an unknown raffle or ticket,
/// 409 when another pending payment covers a ticket, 502 if the gateway
/// cannot open a session.
pub async fn create_payment(
    State(state): State<AppState>,
    CorrelationId(correlation_id): CorrelationId,
    Json(request): Json<CreatePaymentRequest>,
) -> WebResult<(StatusCode, Json<CheckoutSession>)> {
    let ticket_ids: Vec<TicketId> = request
        .ticket_ids
        .into_iter()
        .map(TicketId::from_uuid)
        .collect();

    tracing::debug!(%correlation_id, tickets = ticket_ids.len(), "Creating payment");
    let checkout = state
        .payments
        .create(RaffleId::from_uuid(request.raffle_id), &ticket_ids, request.amount)
        .await?;

    Ok((StatusCode::CREATED, Json(checkout)))
}

/// `GET /payments?raffleId=&status=&sessionId=&limit=&page=`
///
/// # Errors
///
/// 400 for an unknown status or a bad page.
pub async fn list_payments(
    State(state): State<AppState>,
    Query(query): Query<PaymentQuery>,
) -> WebResult<Json<Vec<Payment>>> {
    let payments = state.payments.list(&query.into_filter()?).await?;
    Ok(Json(payments))
}

/// `GET /payments/:id`
///
/// # Errors
///
/// 404 if the payment does not exist.
pub async fn get_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<Json<Payment>> {
    let payment = state.payments.get(PaymentId::from_uuid(id)).await?;
    Ok(Json(payment))
}

/// `POST /payments/:id/cancel`
///
/// # Errors
///
/// 404 if the payment does not exist, 400 if it already completed.
pub async fn cancel_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<Json<Payment>> {
    let payment = state.payments.cancel(PaymentId::from_uuid(id)).await?;
    Ok(Json(payment))
}

/// `POST /payments/webhook`
///
/// # Errors
///
/// 400 when a webhook secret is configured and the signature is missing or
/// invalid, or when the body is not a gateway event. 503 when the
/// confirmation could not be stored; nothing changed and a redelivery
/// applies it.
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> WebResult<Json<WebhookAck>> {
    if let Some(secret) = &state.webhook_secret {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !verify_signature(&body, signature, secret.as_bytes(), Utc::now()) {
            tracing::warn!("Rejected webhook with invalid signature");
            return Err(AppError::bad_request("Invalid webhook signature"));
        }
    }

    let event: GatewayEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::bad_request(format!("Malformed webhook payload: {e}")))?;

    let Some(session_id) = event.completed_session() else {
        tracing::debug!(kind = %event.kind, "Ignoring webhook event");
        return Ok(Json(WebhookAck { received: true }));
    };

    match state.payments.complete_by_session(session_id).await {
        Ok(Some(payment)) => {
            tracing::info!(payment_id = %payment.id, status = %payment.status, "Webhook processed");
        }
        Ok(None) => {}
        Err(e @ (RaffleError::InvalidState(_) | RaffleError::NotFound { .. })) => {
            // A redelivery would hit the same state.
            tracing::warn!(session_id, error = %e, "Webhook confirmation not applied");
        }
        Err(e) => {
            tracing::error!(session_id, error = %e, "Webhook confirmation failed");
            return Err(e.into());
        }
    }

    Ok(Json(WebhookAck { received: true }))
}

/// `POST /payments/sweep`
///
/// Fails every payment still pending after the configured timeout.
///
/// # Errors
///
/// 503 if storage is unavailable.
pub async fn sweep_payments(State(state): State<AppState>) -> WebResult<Json<SweepResponse>> {
    let swept = state.payments.sweep_expired_now().await?;
    Ok(Json(SweepResponse { swept }))
}

//! Stripe Checkout payment gateway.
//!
//! Opens a hosted checkout session per payment. Completion arrives later
//! through the webhook handled in `raffle-web`.

use async_trait::async_trait;
use raffle_core::providers::{GatewaySession, PaymentGateway, SessionRequest};
use raffle_core::{RaffleError, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Stripe Checkout client.
#[derive(Clone)]
pub struct StripeGateway {
    client: Client,
    api_base: String,
    secret_key: String,
}

/// Fields of a created session this gateway uses.
#[derive(Debug, Deserialize)]
struct CheckoutSessionResponse {
    id: String,
    url: Option<String>,
}

impl StripeGateway {
    /// Create a gateway client.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::GatewayFailure`] if the HTTP client cannot be
    /// built.
    pub fn new(
        api_base: impl Into<String>,
        secret_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RaffleError::GatewayFailure(format!("HTTP client error: {e}")))?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        })
    }
}

/// Form fields for `POST /v1/checkout/sessions`.
///
/// One line item priced per ticket, with the ticket count as quantity.
#[must_use]
pub fn session_form(request: &SessionRequest) -> Vec<(&'static str, String)> {
    vec![
        ("mode", "payment".to_string()),
        ("success_url", request.success_url.clone()),
        ("cancel_url", request.cancel_url.clone()),
        ("client_reference_id", request.reference.to_string()),
        ("metadata[payment_id]", request.reference.to_string()),
        (
            "line_items[0][price_data][currency]",
            request.currency.to_lowercase(),
        ),
        (
            "line_items[0][price_data][product_data][name]",
            "Raffle tickets".to_string(),
        ),
        (
            "line_items[0][price_data][unit_amount]",
            request.unit_amount.minor().to_string(),
        ),
        ("line_items[0][quantity]", request.quantity.to_string()),
    ]
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn open_session(&self, request: &SessionRequest) -> Result<GatewaySession> {
        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&session_form(request))
            .send()
            .await
            .map_err(|e| RaffleError::GatewayFailure(format!("Stripe request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RaffleError::GatewayFailure(format!(
                "Stripe returned {status}: {body}"
            )));
        }

        let session: CheckoutSessionResponse = response
            .json()
            .await
            .map_err(|e| RaffleError::GatewayFailure(format!("Invalid Stripe response: {e}")))?;

        let session_url = session.url.ok_or_else(|| {
            RaffleError::GatewayFailure(format!("Stripe session {} has no URL", session.id))
        })?;

        tracing::debug!(payment_id = %request.reference, session_id = %session.id, "Checkout session opened");
        Ok(GatewaySession {
            session_id: session.id,
            session_url,
        })
    }
}

//! Payment gateway trait.

use crate::error::Result;
use crate::types::{Money, PaymentId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Checkout session request.
///
/// Sent as a single line item: `quantity` tickets at `unit_amount` each.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRequest {
    /// Internal payment id, attached to the session as a reference
    pub reference: PaymentId,
    /// Price of one ticket
    pub unit_amount: Money,
    /// Number of tickets
    pub quantity: u32,
    /// ISO 4217 currency code
    pub currency: String,
    /// Redirect after a successful checkout
    pub success_url: String,
    /// Redirect after an abandoned checkout
    pub cancel_url: String,
}

impl SessionRequest {
    /// Total charged for the session.
    #[must_use]
    pub fn total(&self) -> Option<Money> {
        self.unit_amount.checked_mul(u64::from(self.quantity))
    }
}

/// Session opened by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewaySession {
    /// Gateway-assigned session id, echoed back by the confirmation webhook
    pub session_id: String,
    /// Checkout page the participant is redirected to
    pub session_url: String,
}

/// Payment gateway.
///
/// Abstraction over hosted checkout providers like Stripe Checkout.
/// Confirmation arrives asynchronously through a webhook, not through
/// this trait.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a checkout session.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::GatewayFailure`](crate::RaffleError::GatewayFailure)
    /// if the gateway rejects the request or is unreachable.
    async fn open_session(&self, request: &SessionRequest) -> Result<GatewaySession>;
}

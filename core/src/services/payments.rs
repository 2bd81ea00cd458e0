//! Payment lifecycle.
//!
//! ```text
//!            complete()
//! pending ──────────────▶ completed   (tickets settled)
//!    │
//!    │ sweep_expired() / cancel()
//!    ▼
//!  failed                              (tickets released)
//! ```
//!
//! Every transition is a conditional write on `status = 'pending'` that
//! carries its ticket side effect in the same unit of work. Concurrent
//! completions, sweeps and cancellations never double-settle or
//! double-release, and a completed payment always has settled tickets.

use crate::config::PaymentConfig;
use crate::error::{RaffleError, Result};
use crate::metrics;
use crate::providers::{
    GatewaySession, PaymentGateway, PaymentRepository, RaffleRepository, SessionRequest,
    TicketStore,
};
use crate::types::{Money, Payment, PaymentFilter, PaymentId, PaymentStatus, RaffleId, TicketId};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// A pending payment and where to send the participant to pay it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    /// The persisted pending payment
    pub payment: Payment,
    /// Gateway checkout page
    pub redirect_url: String,
}

/// Creates, completes, cancels and expires payments.
#[derive(Clone)]
pub struct PaymentLifecycle {
    raffles: Arc<dyn RaffleRepository>,
    tickets: Arc<dyn TicketStore>,
    payments: Arc<dyn PaymentRepository>,
    gateway: Arc<dyn PaymentGateway>,
    config: PaymentConfig,
}

impl PaymentLifecycle {
    /// Create a payment lifecycle manager.
    #[must_use]
    pub fn new(
        raffles: Arc<dyn RaffleRepository>,
        tickets: Arc<dyn TicketStore>,
        payments: Arc<dyn PaymentRepository>,
        gateway: Arc<dyn PaymentGateway>,
        config: PaymentConfig,
    ) -> Self {
        Self {
            raffles,
            tickets,
            payments,
            gateway,
            config,
        }
    }

    /// Configured pending payment timeout.
    #[must_use]
    pub const fn pending_timeout(&self) -> Duration {
        self.config.pending_timeout
    }

    /// Open a gateway session for claimed tickets and record a pending payment.
    ///
    /// All validation happens before the gateway is contacted. When the
    /// gateway fails or times out nothing is persisted.
    ///
    /// # Errors
    ///
    /// - [`RaffleError::Validation`] for an empty or duplicated ticket list,
    ///   a non-positive amount, or an amount that does not match the price
    /// - [`RaffleError::NotFound`] if the raffle or a ticket does not exist
    /// - [`RaffleError::InvalidState`] if the raffle is closed or a ticket is
    ///   unclaimed, already paid, or belongs to another raffle
    /// - [`RaffleError::Conflict`] if a ticket is covered by another pending payment
    /// - [`RaffleError::GatewayFailure`] if the session could not be opened
    pub async fn create(
        &self,
        raffle_id: RaffleId,
        ticket_ids: &[TicketId],
        amount: Money,
    ) -> Result<CheckoutSession> {
        if amount.is_zero() {
            return Err(RaffleError::Validation("amount must be positive".to_string()));
        }
        if ticket_ids.is_empty() {
            return Err(RaffleError::Validation("at least one ticket is required".to_string()));
        }
        let unique: HashSet<TicketId> = ticket_ids.iter().copied().collect();
        if unique.len() != ticket_ids.len() {
            return Err(RaffleError::Validation("duplicate ticket ids".to_string()));
        }

        let raffle = self
            .raffles
            .get(raffle_id)
            .await?
            .ok_or_else(|| RaffleError::not_found("raffle", raffle_id))?;
        if !raffle.is_active {
            return Err(RaffleError::InvalidState(format!("Raffle {raffle_id} is not active")));
        }

        let found = self.tickets.get_many(ticket_ids).await?;
        for id in ticket_ids {
            let ticket = found
                .iter()
                .find(|t| t.id == *id)
                .ok_or_else(|| RaffleError::not_found("ticket", id))?;
            if ticket.raffle_id != raffle_id {
                return Err(RaffleError::InvalidState(format!(
                    "Ticket {id} does not belong to raffle {raffle_id}"
                )));
            }
            if ticket.owner_id.is_none() {
                return Err(RaffleError::InvalidState(format!("Ticket {id} has not been claimed")));
            }
            if ticket.is_paid {
                return Err(RaffleError::InvalidState(format!("Ticket {id} is already paid")));
            }
        }

        let quantity = u32::try_from(ticket_ids.len())
            .map_err(|_| RaffleError::Validation("too many tickets".to_string()))?;
        let expected = raffle
            .price
            .checked_mul(u64::from(quantity))
            .ok_or_else(|| RaffleError::Validation("amount overflow".to_string()))?;
        if amount != expected {
            return Err(RaffleError::Validation(format!(
                "amount {amount} does not match {quantity} ticket(s) at {}",
                raffle.price
            )));
        }

        if self.payments.has_pending_for(ticket_ids).await? {
            return Err(RaffleError::Conflict(
                "a ticket is already covered by a pending payment".to_string(),
            ));
        }

        let payment_id = PaymentId::new();
        let request = SessionRequest {
            reference: payment_id,
            unit_amount: raffle.price,
            quantity,
            currency: raffle.currency.clone(),
            success_url: self.config.success_url.clone(),
            cancel_url: self.config.cancel_url.clone(),
        };
        let session = self.open_session(&request).await?;

        let now = Utc::now();
        let payment = Payment {
            id: payment_id,
            raffle_id,
            tickets: ticket_ids.to_vec(),
            amount,
            currency: raffle.currency,
            status: PaymentStatus::Pending,
            gateway_session_id: session.session_id,
            created_at: now,
            updated_at: now,
        };
        self.payments.insert(&payment).await?;

        metrics::record_payment_created();
        info!(
            payment_id = %payment.id,
            raffle_id = %raffle_id,
            tickets = payment.tickets.len(),
            amount = payment.amount.minor(),
            session_id = %payment.gateway_session_id,
            "Pending payment created"
        );

        Ok(CheckoutSession {
            payment,
            redirect_url: session.session_url,
        })
    }

    async fn open_session(&self, request: &SessionRequest) -> Result<GatewaySession> {
        let timeout = self.config.gateway_timeout;
        match tokio::time::timeout(timeout, self.gateway.open_session(request)).await {
            Ok(Ok(session)) => Ok(session),
            Ok(Err(err)) => {
                error!(payment_id = %request.reference, error = %err, "Gateway rejected session");
                Err(match err {
                    RaffleError::GatewayFailure(_) => err,
                    other => RaffleError::GatewayFailure(other.to_string()),
                })
            }
            Err(_) => {
                error!(payment_id = %request.reference, ?timeout, "Gateway timed out");
                Err(RaffleError::GatewayFailure(format!(
                    "no response within {}ms",
                    timeout.as_millis()
                )))
            }
        }
    }

    /// Mark a payment completed and settle its tickets.
    ///
    /// The status change and the settlement are one unit of work, so a
    /// failure leaves the payment pending and a retry settles it.
    /// Idempotent: completing an already completed payment returns the
    /// stored record without touching tickets.
    ///
    /// # Errors
    ///
    /// - [`RaffleError::NotFound`] if the payment does not exist
    /// - [`RaffleError::InvalidState`] if the payment already failed
    /// - [`RaffleError::StorageFailure`] if the unit of work fails; nothing changed
    pub async fn complete(&self, id: PaymentId) -> Result<Payment> {
        let payment = self.get(id).await?;
        match payment.status {
            PaymentStatus::Completed => return Ok(payment),
            PaymentStatus::Failed => return Err(not_pending(id)),
            PaymentStatus::Pending => {}
        }

        let resolution = match self.payments.complete(id, Utc::now()).await {
            Ok(Some(resolution)) => resolution,
            Ok(None) => {
                let current = self.get(id).await?;
                warn!(payment_id = %id, status = %current.status, "Completion lost a race");
                return match current.status {
                    PaymentStatus::Completed => Ok(current),
                    _ => Err(not_pending(id)),
                };
            }
            Err(err) => {
                error!(payment_id = %id, error = %err, "Failed to complete payment");
                return Err(err);
            }
        };

        metrics::record_payment_completed(resolution.payment.amount.minor());
        info!(payment_id = %id, settled = resolution.tickets, "Payment completed");

        Ok(resolution.payment)
    }

    /// Complete the payment behind a gateway session.
    ///
    /// Returns `None` when no payment carries that session id.
    ///
    /// # Errors
    ///
    /// Same as [`PaymentLifecycle::complete`].
    pub async fn complete_by_session(&self, session_id: &str) -> Result<Option<Payment>> {
        let Some(payment) = self.payments.get_by_session(session_id).await? else {
            warn!(session_id, "Confirmation for unknown session");
            return Ok(None);
        };
        self.complete(payment.id).await.map(Some)
    }

    /// Fail a pending payment on request and release its tickets.
    ///
    /// Cancelling an already failed payment returns it unchanged.
    ///
    /// # Errors
    ///
    /// - [`RaffleError::NotFound`] if the payment does not exist
    /// - [`RaffleError::InvalidState`] if the payment already completed
    /// - [`RaffleError::StorageFailure`] if the unit of work fails; nothing changed
    pub async fn cancel(&self, id: PaymentId) -> Result<Payment> {
        let payment = self.get(id).await?;
        match payment.status {
            PaymentStatus::Failed => return Ok(payment),
            PaymentStatus::Completed => return Err(already_completed(id)),
            PaymentStatus::Pending => {}
        }

        let Some(resolution) = self.payments.fail(id, Utc::now()).await? else {
            let current = self.get(id).await?;
            return match current.status {
                PaymentStatus::Failed => Ok(current),
                _ => Err(already_completed(id)),
            };
        };

        metrics::record_payment_failed("cancelled", resolution.tickets);
        info!(payment_id = %id, released = resolution.tickets, "Payment cancelled");

        Ok(resolution.payment)
    }

    /// Fail every payment still pending `timeout` after creation and
    /// release its tickets.
    ///
    /// Returns how many payments this call failed. Payments failed or
    /// completed concurrently by another caller are not counted. Each
    /// payment is its own unit of work; payments failed before a storage
    /// error stay failed and the rest are picked up by the next sweep.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if a query or write fails.
    pub async fn sweep_expired(&self, now: DateTime<Utc>, timeout: Duration) -> Result<u64> {
        let cutoff = now - timeout;
        let expired = self.payments.list_expired_pending(cutoff).await?;
        if expired.is_empty() {
            debug!(%cutoff, "No expired pending payments");
            return Ok(0);
        }

        let mut swept = 0;
        for payment in expired {
            let Some(resolution) = self.payments.fail(payment.id, now).await? else {
                debug!(payment_id = %payment.id, "Payment resolved concurrently, skipping");
                continue;
            };

            metrics::record_payment_failed("expired", resolution.tickets);
            info!(
                payment_id = %payment.id,
                released = resolution.tickets,
                "Marked expired payment as failed"
            );
            swept += 1;
        }

        Ok(swept)
    }

    /// [`PaymentLifecycle::sweep_expired`] at the current time with the
    /// configured timeout.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if a query or write fails.
    pub async fn sweep_expired_now(&self) -> Result<u64> {
        self.sweep_expired(Utc::now(), self.config.pending_timeout).await
    }

    /// Fetch a payment.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::NotFound`] if the payment does not exist.
    pub async fn get(&self, id: PaymentId) -> Result<Payment> {
        self.payments
            .get(id)
            .await?
            .ok_or_else(|| RaffleError::not_found("payment", id))
    }

    /// Payments matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the query fails.
    pub async fn list(&self, filter: &PaymentFilter) -> Result<Vec<Payment>> {
        self.payments.list(filter).await
    }
}

fn not_pending(id: PaymentId) -> RaffleError {
    RaffleError::InvalidState(format!("Payment {id} is not pending"))
}

fn already_completed(id: PaymentId) -> RaffleError {
    RaffleError::InvalidState(format!("Payment {id} is already completed"))
}

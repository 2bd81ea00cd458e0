//! Payment repository trait.

use crate::error::Result;
use crate::types::{Payment, PaymentFilter, PaymentId, TicketId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A status change that landed, with its effect on the ticket pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The payment as stored after the change
    pub payment: Payment,
    /// Tickets settled or released by the same unit of work
    pub tickets: u64,
}

/// Payment persistence.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Insert a new payment.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::Conflict`](crate::RaffleError::Conflict) if the
    /// gateway session id is already recorded, or a storage failure.
    async fn insert(&self, payment: &Payment) -> Result<()>;

    /// Fetch a payment.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the query fails.
    async fn get(&self, id: PaymentId) -> Result<Option<Payment>>;

    /// Fetch a payment by its gateway session id.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the query fails.
    async fn get_by_session(&self, session_id: &str) -> Result<Option<Payment>>;

    /// Move a pending payment to completed and settle its tickets in one
    /// unit of work.
    ///
    /// Returns `None`, writing nothing, when the payment is absent or no
    /// longer pending. If the ticket update fails the status change is
    /// rolled back with it.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if either write fails.
    async fn complete(&self, id: PaymentId, at: DateTime<Utc>) -> Result<Option<Resolution>>;

    /// Move a pending payment to failed and release its unpaid tickets in
    /// one unit of work.
    ///
    /// Same contract as [`PaymentRepository::complete`].
    ///
    /// # Errors
    ///
    /// Returns a storage failure if either write fails.
    async fn fail(&self, id: PaymentId, at: DateTime<Utc>) -> Result<Option<Resolution>>;

    /// Whether any pending payment covers one of `ticket_ids`.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the query fails.
    async fn has_pending_for(&self, ticket_ids: &[TicketId]) -> Result<bool>;

    /// Pending payments created strictly before `cutoff`.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the query fails.
    async fn list_expired_pending(&self, cutoff: DateTime<Utc>) -> Result<Vec<Payment>>;

    /// Payments matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the query fails.
    async fn list(&self, filter: &PaymentFilter) -> Result<Vec<Payment>>;
}

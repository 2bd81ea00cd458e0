//! Ticket store trait.

use crate::error::Result;
use crate::types::{RaffleId, Ticket, TicketId, UserId};
use async_trait::async_trait;

/// Ticket persistence and reservation primitives.
///
/// `claim` is the only way a ticket becomes owned. `settle` and `release`
/// are idempotent bulk writes driven by the payment lifecycle.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Take ownership of an available ticket.
    ///
    /// Implemented as a single conditional write, so of two concurrent
    /// claims exactly one succeeds.
    ///
    /// # Errors
    ///
    /// - [`RaffleError::NotFound`](crate::RaffleError::NotFound) if the ticket does not exist
    /// - [`RaffleError::Conflict`](crate::RaffleError::Conflict) if it is already owned
    /// - [`RaffleError::StorageFailure`](crate::RaffleError::StorageFailure) if the write fails
    async fn claim(&self, ticket_id: TicketId, owner_id: UserId) -> Result<Ticket>;

    /// Mark owned tickets as paid. Unowned ids are skipped.
    ///
    /// Returns the number of rows touched.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the write fails.
    async fn settle(&self, ticket_ids: &[TicketId]) -> Result<u64>;

    /// Return unpaid tickets to the pool. Paid tickets are left untouched.
    ///
    /// Returns the number of rows touched.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the write fails.
    async fn release(&self, ticket_ids: &[TicketId]) -> Result<u64>;

    /// Owned and paid tickets of a raffle, ordered by ticket number.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the query fails.
    async fn list_eligible_for_draw(&self, raffle_id: RaffleId) -> Result<Vec<Ticket>>;

    /// Fetch one ticket.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the query fails.
    async fn get(&self, ticket_id: TicketId) -> Result<Option<Ticket>>;

    /// Fetch several tickets. Missing ids are absent from the result.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the query fails.
    async fn get_many(&self, ticket_ids: &[TicketId]) -> Result<Vec<Ticket>>;

    /// Tickets of a raffle ordered by number, optionally only available ones.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the query fails.
    async fn list(&self, raffle_id: RaffleId, available_only: bool) -> Result<Vec<Ticket>>;

    /// Distinct owners of tickets in a raffle.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the query fails.
    async fn participants(&self, raffle_id: RaffleId) -> Result<Vec<UserId>>;

    /// Number of tickets in a raffle's pool.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the query fails.
    async fn count(&self, raffle_id: RaffleId) -> Result<u64>;
}

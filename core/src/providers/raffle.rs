//! Raffle repository trait.

use crate::error::Result;
use crate::types::{Raffle, RaffleFilter, RaffleId, Ticket, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Raffle persistence.
#[async_trait]
pub trait RaffleRepository: Send + Sync {
    /// Insert a raffle together with its whole ticket pool.
    ///
    /// Either every row lands or none does.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::StorageFailure`](crate::RaffleError::StorageFailure)
    /// if the unit of work fails.
    async fn insert_with_pool(&self, raffle: &Raffle, tickets: &[Ticket]) -> Result<()>;

    /// Fetch a raffle.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the query fails.
    async fn get(&self, id: RaffleId) -> Result<Option<Raffle>>;

    /// Deactivate a raffle that is still active.
    ///
    /// Returns `false` when the raffle was already inactive or absent.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the update fails.
    async fn deactivate(&self, id: RaffleId, actor: UserId, at: DateTime<Utc>) -> Result<bool>;

    /// Overwrite the editable fields of a raffle that is still active:
    /// name, description, claim window, `updated_by` and `updated_at`.
    ///
    /// Returns `false` when the raffle was already inactive or absent.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the update fails.
    async fn update(&self, raffle: &Raffle) -> Result<bool>;

    /// Raffles matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the query fails.
    async fn list(&self, filter: &RaffleFilter) -> Result<Vec<Raffle>>;
}

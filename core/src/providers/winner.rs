//! Winner repository trait.

use crate::error::Result;
use crate::types::{RaffleId, Winner};
use async_trait::async_trait;

/// Winner persistence.
#[async_trait]
pub trait WinnerRepository: Send + Sync {
    /// Record the winner and deactivate the raffle in one unit of work.
    ///
    /// The raffle's `updated_by` becomes `winner.drawn_by`.
    ///
    /// # Errors
    ///
    /// - [`RaffleError::Conflict`](crate::RaffleError::Conflict) if a winner already
    ///   exists for the raffle (unique constraint)
    /// - [`RaffleError::InvalidState`](crate::RaffleError::InvalidState) if the raffle
    ///   was closed in the meantime; nothing is written
    /// - [`RaffleError::StorageFailure`](crate::RaffleError::StorageFailure) otherwise
    async fn record(&self, winner: &Winner) -> Result<()>;

    /// Winner of a raffle, if drawn.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the query fails.
    async fn get_by_raffle(&self, raffle_id: RaffleId) -> Result<Option<Winner>>;

    /// All winners, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the query fails.
    async fn list(&self) -> Result<Vec<Winner>>;
}

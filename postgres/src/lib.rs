//! `PostgreSQL` storage for the raffle platform.
//!
//! Implements the repository traits from `raffle-core` on top of a shared
//! [`PgPool`]. Every state change that must not race (claiming a ticket,
//! moving a payment out of `pending`, recording a winner) is a single
//! conditional statement or a short transaction, so concurrent callers see
//! exactly one winner.
//!
//! # Example
//!
//! ```ignore
//! use raffle_postgres::{run_migrations, PostgresTicketStore};
//! use sqlx::postgres::PgPoolOptions;
//!
//! let pool = PgPoolOptions::new().connect("postgres://localhost/raffle").await?;
//! run_migrations(&pool).await?;
//! let tickets = PostgresTicketStore::new(pool.clone());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod payments;
mod raffles;
mod tickets;
mod winners;

pub use payments::PostgresPaymentRepository;
pub use raffles::PostgresRaffleRepository;
pub use tickets::PostgresTicketStore;
pub use winners::PostgresWinnerRepository;

use raffle_core::{RaffleError, Result};
use sqlx::PgPool;

/// Run the bundled schema migrations.
///
/// # Errors
///
/// Returns [`RaffleError::StorageFailure`] if a migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| RaffleError::StorageFailure(format!("Migration failed: {e}")))?;
    tracing::info!("Database migrations applied");
    Ok(())
}

/// Map a driver error into a storage failure with context.
pub(crate) fn db_error(action: &str, e: &sqlx::Error) -> RaffleError {
    RaffleError::StorageFailure(format!("Failed to {action}: {e}"))
}

/// Whether a driver error is a unique constraint violation.
pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

pub(crate) fn to_i32(value: u32, field: &str) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| RaffleError::StorageFailure(format!("{field} out of range: {value}")))
}

pub(crate) fn to_i64(value: u64, field: &str) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| RaffleError::StorageFailure(format!("{field} out of range: {value}")))
}

pub(crate) fn from_i32(value: i32, field: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| RaffleError::StorageFailure(format!("Invalid {field} in database: {value}")))
}

pub(crate) fn from_i64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| RaffleError::StorageFailure(format!("Invalid {field} in database: {value}")))
}

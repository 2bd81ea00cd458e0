//! Error types for raffle operations.

use thiserror::Error;

/// Result type alias for raffle operations.
pub type Result<T> = std::result::Result<T, RaffleError>;

/// Error taxonomy shared by every component.
///
/// Each variant has a stable code (see [`RaffleError::kind`]) that the HTTP
/// layer forwards to clients.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RaffleError {
    /// Referenced entity does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity kind ("raffle", "ticket", ...)
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// A concurrent writer got there first. Safe to retry with fresh input.
    #[error("{0}")]
    Conflict(String),

    /// The entity exists but is in the wrong state for the operation.
    #[error("{0}")]
    InvalidState(String),

    /// Input rejected before any side effect.
    #[error("{0}")]
    Validation(String),

    /// Payment gateway errored or timed out.
    #[error("Payment gateway failure: {0}")]
    GatewayFailure(String),

    /// Persistence layer errored.
    #[error("Storage failure: {0}")]
    StorageFailure(String),
}

impl RaffleError {
    /// Builds a [`RaffleError::NotFound`].
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// The draw was already performed for this raffle.
    #[must_use]
    pub fn winner_already_drawn(raffle_id: impl std::fmt::Display) -> Self {
        Self::InvalidState(format!("Raffle {raffle_id} already has a winner"))
    }

    /// Stable machine-readable code.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::GatewayFailure(_) => "GATEWAY_FAILURE",
            Self::StorageFailure(_) => "STORAGE_FAILURE",
        }
    }

    /// Whether retrying the same call may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Conflict(_) | Self::GatewayFailure(_) | Self::StorageFailure(_)
        )
    }

    /// Whether the caller caused the error.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::Conflict(_) | Self::InvalidState(_) | Self::Validation(_)
        )
    }
}

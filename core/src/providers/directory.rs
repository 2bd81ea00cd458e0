//! Identity directory trait.

use crate::error::Result;
use crate::types::{UserId, UserInfo};
use async_trait::async_trait;

/// Read-only view of the user service.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Name and email of a user.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::NotFound`](crate::RaffleError::NotFound) for
    /// unknown users, or a storage failure if the directory is unreachable.
    async fn basic_info(&self, user_id: UserId) -> Result<UserInfo>;
}

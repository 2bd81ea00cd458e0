//! Mock user directory for testing.

use crate::error::{RaffleError, Result};
use crate::providers::UserDirectory;
use crate::types::{UserId, UserInfo};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Mock user directory.
///
/// Uses in-memory storage; unknown ids resolve to `NotFound`.
#[derive(Debug, Clone, Default)]
pub struct MockUserDirectory {
    users: Arc<Mutex<HashMap<UserId, UserInfo>>>,
}

impl MockUserDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user and return its id.
    pub fn add(&self, first_name: &str, last_name: &str, email: &str) -> UserId {
        let id = UserId::from_uuid(uuid::Uuid::new_v4());
        self.insert(UserInfo {
            id,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
        });
        id
    }

    /// Register a user.
    pub fn insert(&self, user: UserInfo) {
        if let Ok(mut users) = self.users.lock() {
            users.insert(user.id, user);
        }
    }
}

#[async_trait]
impl UserDirectory for MockUserDirectory {
    async fn basic_info(&self, user_id: UserId) -> Result<UserInfo> {
        self.users
            .lock()
            .map_err(|_| RaffleError::StorageFailure("mock directory poisoned".to_string()))?
            .get(&user_id)
            .cloned()
            .ok_or_else(|| RaffleError::not_found("user", user_id))
    }
}

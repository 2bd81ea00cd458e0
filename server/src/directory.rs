//! HTTP client for the identity directory.

use async_trait::async_trait;
use raffle_core::providers::UserDirectory;
use raffle_core::{RaffleError, Result, UserId, UserInfo};
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Resolves users with `GET {base}/users/{id}`.
///
/// The directory answers `{ id, firstName, lastName, email }`.
#[derive(Clone)]
pub struct HttpUserDirectory {
    client: Client,
    base_url: String,
}

impl HttpUserDirectory {
    /// Create a directory client.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::StorageFailure`] if the HTTP client cannot be
    /// built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RaffleError::StorageFailure(format!("HTTP client error: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl UserDirectory for HttpUserDirectory {
    async fn basic_info(&self, user_id: UserId) -> Result<UserInfo> {
        let response = self
            .client
            .get(format!("{}/users/{user_id}", self.base_url))
            .send()
            .await
            .map_err(|e| RaffleError::StorageFailure(format!("User directory unreachable: {e}")))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(RaffleError::not_found("user", user_id)),
            status if !status.is_success() => Err(RaffleError::StorageFailure(format!(
                "User directory returned {status}"
            ))),
            _ => response.json::<UserInfo>().await.map_err(|e| {
                RaffleError::StorageFailure(format!("Invalid user directory response: {e}"))
            }),
        }
    }
}

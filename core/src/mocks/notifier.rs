//! Recording notifier for testing.

use crate::error::{RaffleError, Result};
use crate::providers::Notifier;
use crate::types::Notification;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Notifier that stores what it was asked to send.
///
/// Addresses registered with [`RecordingNotifier::fail_for`] are rejected.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<(String, Notification)>>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl RecordingNotifier {
    /// Create an empty notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject deliveries to `email`.
    pub fn fail_for(&self, email: &str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(email.to_string());
        }
    }

    /// Delivered notifications as `(recipient, notification)` pairs.
    #[must_use]
    pub fn sent(&self) -> Vec<(String, Notification)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, to: &str, notification: &Notification) -> Result<()> {
        let rejected = self
            .failing
            .lock()
            .map(|f| f.contains(to))
            .unwrap_or_default();
        if rejected {
            return Err(RaffleError::GatewayFailure(format!("mailbox {to} unavailable")));
        }

        self.sent
            .lock()
            .map_err(|_| RaffleError::StorageFailure("recording notifier poisoned".to_string()))?
            .push((to.to_string(), notification.clone()));
        Ok(())
    }
}

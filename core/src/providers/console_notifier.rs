//! Console notifier for development.

use crate::error::Result;
use crate::providers::Notifier;
use crate::types::Notification;
use async_trait::async_trait;
use tracing::info;

/// Logs notifications instead of delivering them.
#[derive(Clone, Debug, Default)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    /// Create a new console notifier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn send(&self, to: &str, notification: &Notification) -> Result<()> {
        let payload = serde_json::to_string(notification).unwrap_or_default();
        info!(
            to = %to,
            template = notification.template(),
            subject = %notification.subject(),
            payload = %payload,
            "Notification (development mode)"
        );
        Ok(())
    }
}

//! Notification dispatcher trait.

use crate::error::Result;
use crate::types::Notification;
use async_trait::async_trait;

/// Notification dispatcher.
///
/// Rendering the message body is the dispatcher's concern; callers only
/// hand over the template data.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification to one recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be built or delivered.
    async fn send(&self, to: &str, notification: &Notification) -> Result<()>;
}

//! Application state shared across HTTP handlers.

use raffle_core::services::{PaymentLifecycle, Provisioner, TicketService, WinnerEngine};
use std::sync::Arc;

/// Services and settings every handler can reach.
///
/// Cloning is cheap: services sit behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Raffle creation and cancellation
    pub provisioner: Arc<Provisioner>,
    /// Ticket claims and listings
    pub tickets: Arc<TicketService>,
    /// Payment lifecycle
    pub payments: Arc<PaymentLifecycle>,
    /// Winner draws
    pub winners: Arc<WinnerEngine>,
    /// Shared secret for gateway webhook signatures; unchecked when `None`
    pub webhook_secret: Option<Arc<str>>,
}

impl AppState {
    /// Bundle the services into shared state.
    #[must_use]
    pub fn new(
        provisioner: Provisioner,
        tickets: TicketService,
        payments: PaymentLifecycle,
        winners: WinnerEngine,
    ) -> Self {
        Self {
            provisioner: Arc::new(provisioner),
            tickets: Arc::new(tickets),
            payments: Arc::new(payments),
            winners: Arc::new(winners),
            webhook_secret: None,
        }
    }

    /// Require webhook deliveries to carry a valid signature.
    #[must_use]
    pub fn with_webhook_secret(mut self, secret: impl Into<Arc<str>>) -> Self {
        self.webhook_secret = Some(secret.into());
        self
    }
}

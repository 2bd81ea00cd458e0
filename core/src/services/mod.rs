//! Raffle services.
//!
//! Each service holds its collaborators as trait objects and keeps no state
//! between calls. All synchronization happens in the store.

pub mod payments;
pub mod provisioner;
pub mod tickets;
pub mod winners;

pub use payments::{CheckoutSession, PaymentLifecycle};
pub use provisioner::{Provisioner, build_pool};
pub use tickets::TicketService;
pub use winners::{DrawOutcome, NotificationReport, WinnerEngine, pick_uniform};

//! Raffle providers.
//!
//! This module defines traits for every external dependency of the raffle
//! services: persistence, the payment gateway, the identity directory and
//! the notification dispatcher. Services hold them as `Arc<dyn Trait>` so
//! the binary can wire PostgreSQL and Stripe while tests wire the in-memory
//! mocks.
//!
//! # Storage contract
//!
//! The relational store is the only synchronization point. Every state
//! transition is a conditional write that reports whether it landed:
//!
//! ```text
//! claim       UPDATE tickets  SET owner_id = ?       WHERE id = ? AND owner_id IS NULL
//! complete    UPDATE payments SET status = 'completed' WHERE id = ? AND status = 'pending'
//!             + UPDATE tickets SET is_paid = TRUE ...  (same transaction)
//! fail        UPDATE payments SET status = 'failed'  WHERE id = ? AND status = 'pending'
//!             + UPDATE tickets SET owner_id = NULL ... (same transaction)
//! record      INSERT INTO winners ...                 (unique raffle_id)
//! ```
//!
//! A payment status and the tickets it covers always change together.

pub mod console_notifier;
pub mod directory;
pub mod gateway;
pub mod notifier;
pub mod payment;
pub mod raffle;
pub mod ticket;
pub mod winner;

pub use console_notifier::ConsoleNotifier;
pub use directory::UserDirectory;
pub use gateway::{GatewaySession, PaymentGateway, SessionRequest};
pub use notifier::Notifier;
pub use payment::{PaymentRepository, Resolution};
pub use raffle::RaffleRepository;
pub use ticket::TicketStore;
pub use winner::WinnerRepository;

//! # Raffle Core
//!
//! Ticket reservation, payment settlement and winner selection for raffles.
//!
//! A raffle owns a fixed pool of numbered tickets. Participants claim
//! tickets, pay for them through an external gateway, and once the raffle
//! closes exactly one owned and paid ticket is drawn as the winner.
//!
//! ## Components
//!
//! - [`services::Provisioner`]: creates a raffle and its ticket pool atomically
//! - [`providers::TicketStore`]: claim, settle and release primitives
//! - [`services::PaymentLifecycle`]: pending → completed | failed, plus the expiry sweep
//! - [`services::WinnerEngine`]: the single irrevocable draw and its notifications
//!
//! ## Data Flow
//!
//! ```text
//! provision ──▶ claim ──▶ create payment ──▶ webhook ──▶ complete ──▶ settle
//!                                  │
//!                                  └──▶ sweep / cancel ──▶ release
//!
//! settled tickets ──▶ draw ──▶ winner + raffle closed ──▶ notifications (background)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use raffle_core::mocks::{InMemoryStore, MockPaymentGateway};
//! use raffle_core::services::{PaymentLifecycle, Provisioner};
//!
//! let store = Arc::new(InMemoryStore::new());
//! let raffle = Provisioner::new(store.clone(), "COP").provision(input, creator).await?;
//! let lifecycle = PaymentLifecycle::new(store.clone(), store.clone(), store.clone(),
//!     Arc::new(MockPaymentGateway::new()), PaymentConfig::default());
//! let checkout = lifecycle.create(raffle.id, &[ticket_id], raffle.price).await?;
//! ```

pub mod config;
pub mod error;
pub mod metrics;
pub mod providers;
pub mod services;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

pub use config::PaymentConfig;
pub use error::{RaffleError, Result};
pub use types::{
    Money, NewRaffle, Notification, Page, Payment, PaymentFilter, PaymentId, PaymentStatus, Raffle,
    RaffleFilter, RaffleId, RaffleUpdate, Ticket, TicketId, UserId, UserInfo, Winner, WinnerId,
};

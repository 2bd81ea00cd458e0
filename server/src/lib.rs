//! Raffle platform server.
//!
//! Production adapters for the `raffle-core` provider traits and the wiring
//! that turns environment configuration into a running HTTP service.
//!
//! - [`stripe::StripeGateway`]: Stripe Checkout sessions over `reqwest`
//! - [`directory::HttpUserDirectory`]: identity lookups over HTTP
//! - [`smtp::SmtpNotifier`]: winner emails over SMTP
//! - [`app`]: builds the shared [`raffle_web::AppState`]

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod app;
pub mod config;
pub mod directory;
pub mod smtp;
pub mod stripe;

pub use config::{Config, ConfigError};

//! HTTP surface for the raffle platform.
//!
//! Thin axum handlers over the `raffle-core` services. Handlers parse the
//! request, call one service operation and map [`raffle_core::RaffleError`]
//! to a status code through [`AppError`]; no business rule lives here.
//!
//! # Example
//!
//! ```ignore
//! use raffle_web::{build_router, AppState};
//!
//! let state = AppState::new(provisioner, tickets, payments, winners)
//!     .with_webhook_secret(secret);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, build_router(state)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;
pub mod webhook;

pub use error::AppError;
pub use extractors::{Actor, CorrelationId, USER_ID_HEADER};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};
pub use router::build_router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;

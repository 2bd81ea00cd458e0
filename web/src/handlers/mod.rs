//! HTTP request handlers, one module per resource.

pub mod health;
pub mod payments;
pub mod raffles;
pub mod tickets;
pub mod winners;

pub use health::health_check;

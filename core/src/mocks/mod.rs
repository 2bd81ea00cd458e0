//! Mock provider implementations for testing.
//!
//! This module provides simple, in-memory implementations of all provider
//! traits for use in unit and integration tests and for running the server
//! without external services.

pub mod directory;
pub mod gateway;
pub mod notifier;
pub mod store;

pub use directory::MockUserDirectory;
pub use gateway::MockPaymentGateway;
pub use notifier::RecordingNotifier;
pub use store::InMemoryStore;

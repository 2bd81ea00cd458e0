//! Payment and provisioning configuration.
//!
//! Values are supplied by the application at startup, see
//! `raffle-server`'s `Config::from_env`.

use chrono::Duration;

/// Smallest ticket pool a raffle may be created with.
pub const MIN_TICKETS: u32 = 10;

/// Largest ticket pool a raffle may be created with.
pub const MAX_TICKETS: u32 = 100_000;

/// Maximum raffle name length in characters.
pub const MAX_NAME_LEN: usize = 100;

/// Maximum raffle description length in characters.
pub const MAX_DESCRIPTION_LEN: usize = 255;

/// Rows per page when a listing does not ask for a size.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Largest page a listing may ask for.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Payment lifecycle configuration.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Age after which a pending payment is swept to failed.
    ///
    /// Default: 60 minutes
    pub pending_timeout: Duration,

    /// Upper bound for a single gateway call.
    ///
    /// Default: 10 seconds
    pub gateway_timeout: std::time::Duration,

    /// Currency used when a raffle does not name one.
    ///
    /// Default: `COP`
    pub default_currency: String,

    /// Where the gateway sends the participant after paying.
    pub success_url: String,

    /// Where the gateway sends the participant after abandoning checkout.
    pub cancel_url: String,
}

impl PaymentConfig {
    /// Create a configuration with the given redirect URLs.
    #[must_use]
    pub const fn new(success_url: String, cancel_url: String) -> Self {
        Self {
            pending_timeout: Duration::minutes(60),
            gateway_timeout: std::time::Duration::from_secs(10),
            default_currency: String::new(),
            success_url,
            cancel_url,
        }
    }

    /// Set the pending payment timeout.
    #[must_use]
    pub const fn with_pending_timeout(mut self, timeout: Duration) -> Self {
        self.pending_timeout = timeout;
        self
    }

    /// Set the gateway call timeout.
    #[must_use]
    pub const fn with_gateway_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.gateway_timeout = timeout;
        self
    }

    /// Set the default currency.
    #[must_use]
    pub fn with_default_currency(mut self, currency: impl Into<String>) -> Self {
        self.default_currency = currency.into();
        self
    }

    /// Currency to use, falling back to `COP` when unset.
    #[must_use]
    pub fn currency(&self) -> &str {
        if self.default_currency.is_empty() {
            "COP"
        } else {
            &self.default_currency
        }
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            pending_timeout: Duration::minutes(60),
            gateway_timeout: std::time::Duration::from_secs(10),
            default_currency: "COP".to_string(),
            success_url: "http://localhost:3000/payments/success".to_string(),
            cancel_url: "http://localhost:3000/payments/cancel".to_string(),
        }
    }
}

//! Service wiring.
//!
//! Turns a [`Config`] and a database pool into the shared [`AppState`].
//! Every collaborator is chosen here once; services never look at
//! configuration themselves.

use crate::config::{Config, GatewayKind, NotifierConfig};
use crate::directory::HttpUserDirectory;
use crate::smtp::SmtpNotifier;
use crate::stripe::StripeGateway;
use raffle_core::providers::{ConsoleNotifier, Notifier, PaymentGateway, UserDirectory};
use raffle_core::services::{PaymentLifecycle, Provisioner, TicketService, WinnerEngine};
use raffle_core::{PaymentConfig, Result};
use raffle_postgres::{
    PostgresPaymentRepository, PostgresRaffleRepository, PostgresTicketStore,
    PostgresWinnerRepository,
};
use raffle_web::AppState;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

/// External collaborators, built from configuration.
pub struct Providers {
    /// Payment gateway
    pub gateway: Arc<dyn PaymentGateway>,
    /// Identity directory
    pub directory: Arc<dyn UserDirectory>,
    /// Notification dispatcher
    pub notifier: Arc<dyn Notifier>,
}

impl Providers {
    /// Build the collaborators selected by `config`.
    ///
    /// # Errors
    ///
    /// Fails if an HTTP client cannot be constructed, or if the mock gateway
    /// is selected in a build without the `mock-gateway` feature.
    pub fn from_config(config: &Config) -> Result<Self> {
        let gateway: Arc<dyn PaymentGateway> = match &config.payments.gateway {
            GatewayKind::Stripe {
                secret_key,
                api_base,
            } => Arc::new(StripeGateway::new(
                api_base.clone(),
                secret_key.clone(),
                config.payments.gateway_timeout,
            )?),
            GatewayKind::Mock => mock_gateway()?,
        };

        let notifier: Arc<dyn Notifier> = match &config.notifier {
            NotifierConfig::Smtp(smtp) => Arc::new(SmtpNotifier::new(smtp)),
            NotifierConfig::Console => Arc::new(ConsoleNotifier::new()),
        };

        Ok(Self {
            gateway,
            directory: Arc::new(HttpUserDirectory::new(
                config.directory_url.clone(),
                Duration::from_secs(10),
            )?),
            notifier,
        })
    }
}

#[cfg(feature = "mock-gateway")]
#[allow(clippy::unnecessary_wraps)]
fn mock_gateway() -> Result<Arc<dyn PaymentGateway>> {
    tracing::warn!("Using mock payment gateway; no real charges are made");
    Ok(Arc::new(raffle_core::mocks::MockPaymentGateway::new()))
}

#[cfg(not(feature = "mock-gateway"))]
fn mock_gateway() -> Result<Arc<dyn PaymentGateway>> {
    Err(raffle_core::RaffleError::Validation(
        "PAYMENT_GATEWAY=mock requires the mock-gateway feature".to_string(),
    ))
}

/// Payment lifecycle settings derived from configuration.
#[must_use]
pub fn payment_config(config: &Config) -> PaymentConfig {
    PaymentConfig::new(
        config.payments.success_url.clone(),
        config.payments.cancel_url.clone(),
    )
    .with_pending_timeout(chrono::Duration::minutes(config.payments.pending_timeout_minutes))
    .with_gateway_timeout(config.payments.gateway_timeout)
    .with_default_currency(config.payments.currency.clone())
}

/// Assemble the HTTP state over `PostgreSQL` storage.
#[must_use]
pub fn build_state(config: &Config, pool: &PgPool, providers: Providers) -> AppState {
    let raffles = Arc::new(PostgresRaffleRepository::new(pool.clone()));
    let tickets = Arc::new(PostgresTicketStore::new(pool.clone()));
    let payments = Arc::new(PostgresPaymentRepository::new(pool.clone()));
    let winners = Arc::new(PostgresWinnerRepository::new(pool.clone()));

    let state = AppState::new(
        Provisioner::new(raffles.clone(), config.payments.currency.clone()),
        TicketService::new(raffles.clone(), tickets.clone()),
        PaymentLifecycle::new(
            raffles.clone(),
            tickets.clone(),
            payments,
            providers.gateway,
            payment_config(config),
        ),
        WinnerEngine::new(
            raffles,
            tickets,
            winners,
            providers.directory,
            providers.notifier,
        ),
    );

    match &config.payments.webhook_secret {
        Some(secret) => state.with_webhook_secret(secret.as_str()),
        None => state,
    }
}

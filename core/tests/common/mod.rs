//! Shared wiring for core integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use raffle_core::mocks::{InMemoryStore, MockPaymentGateway, MockUserDirectory, RecordingNotifier};
use raffle_core::services::{PaymentLifecycle, Provisioner, TicketService, WinnerEngine};
use raffle_core::{Money, NewRaffle, PaymentConfig, Raffle, Ticket, UserId};
use chrono::{Duration, Utc};
use std::sync::Arc;

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub gateway: Arc<MockPaymentGateway>,
    pub directory: Arc<MockUserDirectory>,
    pub notifier: Arc<RecordingNotifier>,
    pub provisioner: Provisioner,
    pub tickets: TicketService,
    pub payments: PaymentLifecycle,
    pub winners: WinnerEngine,
    pub creator: UserId,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(MockPaymentGateway::new());
        let directory = Arc::new(MockUserDirectory::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let creator = directory.add("Carla", "Creator", "carla@example.com");

        Self {
            provisioner: Provisioner::new(store.clone(), "COP"),
            tickets: TicketService::new(store.clone(), store.clone()),
            payments: PaymentLifecycle::new(
                store.clone(),
                store.clone(),
                store.clone(),
                gateway.clone(),
                PaymentConfig::default(),
            ),
            winners: WinnerEngine::new(
                store.clone(),
                store.clone(),
                store.clone(),
                directory.clone(),
                notifier.clone(),
            ),
            store,
            gateway,
            directory,
            notifier,
            creator,
        }
    }

    /// Provision a raffle priced 15000 per ticket and return it with its pool.
    pub async fn raffle(&self, ticket_count: u32) -> (Raffle, Vec<Ticket>) {
        let raffle = self
            .provisioner
            .provision(
                NewRaffle {
                    name: "Motorbike".to_string(),
                    description: "Red, 150cc".to_string(),
                    price: Money::from_minor(15_000),
                    currency: None,
                    ticket_count,
                    init_date: Utc::now() - Duration::minutes(1),
                    end_date: Utc::now() + Duration::days(30),
                },
                self.creator,
            )
            .await
            .unwrap();
        let pool = self.tickets.list(raffle.id, false).await.unwrap();
        (raffle, pool)
    }

    /// Claim, pay and complete one ticket for `owner`.
    pub async fn buy(&self, raffle: &Raffle, ticket: &Ticket, owner: UserId) {
        self.tickets.claim(ticket.id, owner).await.unwrap();
        let checkout = self
            .payments
            .create(raffle.id, &[ticket.id], raffle.price)
            .await
            .unwrap();
        self.payments.complete(checkout.payment.id).await.unwrap();
    }
}

//! Ticket browsing and claiming.

use crate::error::{RaffleError, Result};
use crate::metrics;
use crate::providers::{RaffleRepository, TicketStore};
use crate::types::{RaffleId, Ticket, TicketId, UserId};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

/// Participant-facing ticket operations.
#[derive(Clone)]
pub struct TicketService {
    raffles: Arc<dyn RaffleRepository>,
    tickets: Arc<dyn TicketStore>,
}

impl TicketService {
    /// Create a ticket service.
    #[must_use]
    pub fn new(raffles: Arc<dyn RaffleRepository>, tickets: Arc<dyn TicketStore>) -> Self {
        Self { raffles, tickets }
    }

    /// Claim an available ticket for `owner_id`.
    ///
    /// # Errors
    ///
    /// - [`RaffleError::NotFound`] if the ticket does not exist
    /// - [`RaffleError::InvalidState`] if its raffle is closed or outside
    ///   its claim window
    /// - [`RaffleError::Conflict`] if someone else holds it
    pub async fn claim(&self, ticket_id: TicketId, owner_id: UserId) -> Result<Ticket> {
        let ticket = self
            .tickets
            .get(ticket_id)
            .await?
            .ok_or_else(|| RaffleError::not_found("ticket", ticket_id))?;

        let raffle = self
            .raffles
            .get(ticket.raffle_id)
            .await?
            .ok_or_else(|| RaffleError::not_found("raffle", ticket.raffle_id))?;
        if !raffle.is_active {
            return Err(RaffleError::InvalidState(format!(
                "Raffle {} is not active",
                raffle.id
            )));
        }
        if !raffle.accepts_claims_at(Utc::now()) {
            return Err(RaffleError::InvalidState(format!(
                "Raffle {} accepts claims between {} and {}",
                raffle.id, raffle.init_date, raffle.end_date
            )));
        }

        match self.tickets.claim(ticket_id, owner_id).await {
            Ok(claimed) => {
                metrics::record_ticket_claimed();
                info!(
                    ticket_id = %ticket_id,
                    ticket_number = claimed.ticket_number,
                    owner_id = %owner_id,
                    "Ticket claimed"
                );
                Ok(claimed)
            }
            Err(err @ RaffleError::Conflict(_)) => {
                metrics::record_claim_conflict();
                warn!(ticket_id = %ticket_id, owner_id = %owner_id, "Ticket already claimed");
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Fetch a ticket.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::NotFound`] if the ticket does not exist.
    pub async fn get(&self, ticket_id: TicketId) -> Result<Ticket> {
        self.tickets
            .get(ticket_id)
            .await?
            .ok_or_else(|| RaffleError::not_found("ticket", ticket_id))
    }

    /// Tickets of a raffle, optionally only the available ones.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::NotFound`] if the raffle does not exist.
    pub async fn list(&self, raffle_id: RaffleId, available_only: bool) -> Result<Vec<Ticket>> {
        if self.raffles.get(raffle_id).await?.is_none() {
            return Err(RaffleError::not_found("raffle", raffle_id));
        }
        self.tickets.list(raffle_id, available_only).await
    }
}

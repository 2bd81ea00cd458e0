//! Winner selection.
//!
//! A draw is a single irrevocable event per raffle. The engine checks for
//! an existing winner up front, but the unique constraint on the winner
//! table is what actually guarantees one winner under concurrent draws.
//! After the commit, notifications are handed to a background task whose
//! failures never undo the draw.

use crate::error::{RaffleError, Result};
use crate::metrics;
use crate::providers::{Notifier, RaffleRepository, TicketStore, UserDirectory, WinnerRepository};
use crate::types::{Notification, Raffle, RaffleId, Ticket, UserId, Winner, WinnerId};
use chrono::Utc;
use futures::future::join_all;
use rand::Rng;
use rand::seq::SliceRandom;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Delivery summary of a draw's notifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotificationReport {
    /// Messages handed to the dispatcher successfully
    pub sent: usize,
    /// Messages that could not be resolved or delivered
    pub failed: usize,
}

/// Result of a successful draw.
#[derive(Debug)]
pub struct DrawOutcome {
    /// The persisted winner
    pub winner: Winner,
    /// Background notification task
    pub notifications: JoinHandle<NotificationReport>,
}

/// Draws winners and announces them.
#[derive(Clone)]
pub struct WinnerEngine {
    raffles: Arc<dyn RaffleRepository>,
    tickets: Arc<dyn TicketStore>,
    winners: Arc<dyn WinnerRepository>,
    directory: Arc<dyn UserDirectory>,
    notifier: Arc<dyn Notifier>,
}

impl WinnerEngine {
    /// Create a winner engine.
    #[must_use]
    pub fn new(
        raffles: Arc<dyn RaffleRepository>,
        tickets: Arc<dyn TicketStore>,
        winners: Arc<dyn WinnerRepository>,
        directory: Arc<dyn UserDirectory>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            raffles,
            tickets,
            winners,
            directory,
            notifier,
        }
    }

    /// Draw a uniformly random eligible ticket, record it as the winner and
    /// close the raffle.
    ///
    /// Must be called from within a Tokio runtime; notifications are
    /// spawned on it.
    ///
    /// # Errors
    ///
    /// - [`RaffleError::NotFound`] if the raffle does not exist
    /// - [`RaffleError::InvalidState`] if the raffle already has a winner,
    ///   was closed, or has no owned and paid tickets
    /// - [`RaffleError::StorageFailure`] if persistence fails
    pub async fn draw(&self, raffle_id: RaffleId, actor: UserId) -> Result<DrawOutcome> {
        let raffle = self
            .raffles
            .get(raffle_id)
            .await?
            .ok_or_else(|| RaffleError::not_found("raffle", raffle_id))?;

        if self.winners.get_by_raffle(raffle_id).await?.is_some() {
            return Err(RaffleError::winner_already_drawn(raffle_id));
        }
        if !raffle.is_active {
            return Err(RaffleError::InvalidState(format!("Raffle {raffle_id} is not active")));
        }

        let eligible = self.tickets.list_eligible_for_draw(raffle_id).await?;
        let drawn = {
            let mut rng = rand::thread_rng();
            pick_uniform(&eligible, &mut rng).cloned()
        };
        let Some(ticket) = drawn else {
            return Err(RaffleError::InvalidState(format!(
                "Raffle {raffle_id} has no eligible tickets"
            )));
        };
        let Some(user_id) = ticket.owner_id else {
            return Err(RaffleError::StorageFailure(format!(
                "eligible ticket {} has no owner",
                ticket.id
            )));
        };

        let winner = Winner {
            id: WinnerId::new(),
            raffle_id,
            ticket_id: ticket.id,
            ticket_number: ticket.ticket_number,
            user_id,
            drawn_by: actor,
            created_at: Utc::now(),
        };

        match self.winners.record(&winner).await {
            Ok(()) => {}
            Err(RaffleError::Conflict(_)) => {
                warn!(raffle_id = %raffle_id, "Concurrent draw already recorded a winner");
                return Err(RaffleError::winner_already_drawn(raffle_id));
            }
            Err(err) => {
                error!(raffle_id = %raffle_id, error = %err, "Failed to record winner");
                return Err(err);
            }
        }

        metrics::record_winner_drawn();
        info!(
            raffle_id = %raffle_id,
            ticket_number = winner.ticket_number,
            user_id = %winner.user_id,
            eligible = eligible.len(),
            drawn_by = %actor,
            "Winner drawn"
        );

        let notifications = tokio::spawn(announce(
            Arc::clone(&self.tickets),
            Arc::clone(&self.directory),
            Arc::clone(&self.notifier),
            raffle,
            winner.clone(),
        ));

        Ok(DrawOutcome {
            winner,
            notifications,
        })
    }

    /// Winner of a raffle.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::NotFound`] if no winner has been drawn.
    pub async fn get_winner(&self, raffle_id: RaffleId) -> Result<Winner> {
        self.winners
            .get_by_raffle(raffle_id)
            .await?
            .ok_or_else(|| RaffleError::not_found("winner for raffle", raffle_id))
    }

    /// All winners, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the query fails.
    pub async fn list_winners(&self) -> Result<Vec<Winner>> {
        self.winners.list().await
    }
}

/// Pick one ticket with equal probability, independent of order or id.
pub fn pick_uniform<'a, R: Rng + ?Sized>(tickets: &'a [Ticket], rng: &mut R) -> Option<&'a Ticket> {
    tickets.choose(rng)
}

async fn announce(
    tickets: Arc<dyn TicketStore>,
    directory: Arc<dyn UserDirectory>,
    notifier: Arc<dyn Notifier>,
    raffle: Raffle,
    winner: Winner,
) -> NotificationReport {
    let mut report = NotificationReport::default();

    let creator = match directory.basic_info(raffle.created_by).await {
        Ok(creator) => creator,
        Err(err) => {
            error!(
                raffle_id = %raffle.id,
                creator_id = %raffle.created_by,
                error = %err,
                "Cannot resolve raffle creator, skipping winner notifications"
            );
            metrics::record_notification_failed("WINNER_NOTIFICATION");
            report.failed += 1;
            return report;
        }
    };

    match directory.basic_info(winner.user_id).await {
        Ok(user) => {
            let notification = Notification::WinnerNotification {
                user_full_name: user.full_name(),
                raffle_name: raffle.name.clone(),
                raffle_description: raffle.description.clone(),
                winning_number: winner.ticket_number,
                creator_full_name: creator.full_name(),
                creator_email: creator.email.clone(),
            };
            deliver(notifier.as_ref(), &user.email, &notification, &mut report).await;
        }
        Err(err) => {
            warn!(user_id = %winner.user_id, error = %err, "Cannot resolve winner");
            metrics::record_notification_failed("WINNER_NOTIFICATION");
            report.failed += 1;
        }
    }

    let participants = match tickets.participants(raffle.id).await {
        Ok(participants) => participants,
        Err(err) => {
            error!(raffle_id = %raffle.id, error = %err, "Cannot list participants");
            return report;
        }
    };

    let announcement = Notification::WinnerAnnouncement {
        raffle_name: raffle.name.clone(),
        winning_number: winner.ticket_number,
        creator_full_name: creator.full_name(),
        creator_email: creator.email,
    };

    let recipients = participants
        .into_iter()
        .filter(|id| *id != winner.user_id)
        .map(|id| {
            let directory = Arc::clone(&directory);
            async move { (id, directory.basic_info(id).await) }
        });

    for (id, resolved) in join_all(recipients).await {
        match resolved {
            Ok(user) => deliver(notifier.as_ref(), &user.email, &announcement, &mut report).await,
            Err(err) => {
                warn!(user_id = %id, error = %err, "Cannot resolve participant");
                metrics::record_notification_failed(announcement.template());
                report.failed += 1;
            }
        }
    }

    info!(
        raffle_id = %raffle.id,
        sent = report.sent,
        failed = report.failed,
        "Winner notifications dispatched"
    );

    report
}

async fn deliver(
    notifier: &dyn Notifier,
    to: &str,
    notification: &Notification,
    report: &mut NotificationReport,
) {
    match notifier.send(to, notification).await {
        Ok(()) => report.sent += 1,
        Err(err) => {
            warn!(
                to = %to,
                template = notification.template(),
                error = %err,
                "Failed to send notification"
            );
            metrics::record_notification_failed(notification.template());
            report.failed += 1;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::TicketId;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashMap;

    fn eligible_pool(n: u32) -> Vec<Ticket> {
        let raffle_id = RaffleId::new();
        (1..=n)
            .map(|number| Ticket {
                id: TicketId::new(),
                raffle_id,
                ticket_number: number,
                owner_id: Some(UserId::from_uuid(uuid::Uuid::new_v4())),
                is_paid: true,
            })
            .collect()
    }

    #[test]
    fn test_pick_uniform_empty() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(pick_uniform(&[], &mut rng).is_none());
    }

    #[test]
    fn test_pick_uniform_single() {
        let pool = eligible_pool(1);
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(pick_uniform(&pool, &mut rng).unwrap().ticket_number, 1);
    }

    #[test]
    fn test_pick_uniform_covers_every_ticket_evenly() {
        let pool = eligible_pool(4);
        let mut rng = StdRng::seed_from_u64(42);
        let mut hits: HashMap<u32, u32> = HashMap::new();

        for _ in 0..8_000 {
            let ticket = pick_uniform(&pool, &mut rng).unwrap();
            *hits.entry(ticket.ticket_number).or_default() += 1;
        }

        assert_eq!(hits.len(), 4);
        // Expected 2000 each; allow a generous band.
        assert!(hits.values().all(|&count| (1_700..=2_300).contains(&count)));
    }
}

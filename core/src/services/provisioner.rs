//! Raffle ticket provisioning.
//!
//! A raffle is created together with its whole ticket pool, numbered
//! `1..=ticket_count`, in a single unit of work. Its claim window runs from
//! `init_date` (inclusive) to `end_date` (exclusive).

use crate::config::{MAX_DESCRIPTION_LEN, MAX_NAME_LEN, MAX_TICKETS, MIN_TICKETS};
use crate::error::{RaffleError, Result};
use crate::metrics;
use crate::providers::RaffleRepository;
use crate::types::{NewRaffle, Raffle, RaffleFilter, RaffleId, RaffleUpdate, Ticket, UserId};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

/// Creates raffles and their ticket pools.
#[derive(Clone)]
pub struct Provisioner {
    raffles: Arc<dyn RaffleRepository>,
    default_currency: String,
}

impl Provisioner {
    /// Create a provisioner.
    #[must_use]
    pub fn new(raffles: Arc<dyn RaffleRepository>, default_currency: impl Into<String>) -> Self {
        Self {
            raffles,
            default_currency: default_currency.into(),
        }
    }

    /// Validate the input, then persist the raffle with `ticket_count`
    /// unowned, unpaid tickets.
    ///
    /// # Errors
    ///
    /// - [`RaffleError::Validation`] for bad input; nothing is persisted
    /// - [`RaffleError::StorageFailure`] if the unit of work fails; nothing is persisted
    pub async fn provision(&self, input: NewRaffle, actor: UserId) -> Result<Raffle> {
        let now = Utc::now();
        validate(&input, now)?;

        let currency = input
            .currency
            .map_or_else(|| self.default_currency.clone(), |c| c.to_ascii_uppercase());

        let raffle = Raffle {
            id: RaffleId::new(),
            name: input.name.trim().to_string(),
            description: input.description,
            price: input.price,
            currency,
            tickets_created: input.ticket_count,
            init_date: input.init_date,
            end_date: input.end_date,
            is_active: true,
            created_by: actor,
            updated_by: actor,
            created_at: now,
            updated_at: now,
        };

        let pool = build_pool(raffle.id, raffle.tickets_created);
        self.raffles.insert_with_pool(&raffle, &pool).await?;

        metrics::record_raffle_created(raffle.tickets_created);
        info!(
            raffle_id = %raffle.id,
            tickets = raffle.tickets_created,
            created_by = %actor,
            "Raffle provisioned"
        );

        Ok(raffle)
    }

    /// Fetch a raffle.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::NotFound`] if the raffle does not exist.
    pub async fn get(&self, id: RaffleId) -> Result<Raffle> {
        self.raffles
            .get(id)
            .await?
            .ok_or_else(|| RaffleError::not_found("raffle", id))
    }

    /// Close a raffle without drawing a winner.
    ///
    /// # Errors
    ///
    /// - [`RaffleError::NotFound`] if the raffle does not exist
    /// - [`RaffleError::InvalidState`] if it is already closed
    pub async fn cancel(&self, id: RaffleId, actor: UserId) -> Result<Raffle> {
        let raffle = self.get(id).await?;
        if !raffle.is_active {
            return Err(RaffleError::InvalidState(format!("Raffle {id} is not active")));
        }

        let now = Utc::now();
        if !self.raffles.deactivate(id, actor, now).await? {
            warn!(raffle_id = %id, "Raffle closed concurrently");
            return Err(RaffleError::InvalidState(format!("Raffle {id} is not active")));
        }

        info!(raffle_id = %id, cancelled_by = %actor, "Raffle cancelled");

        Ok(Raffle {
            is_active: false,
            updated_by: actor,
            updated_at: now,
            ..raffle
        })
    }

    /// Edit the name, description or claim window of an active raffle.
    ///
    /// A moved `init_date` may not lie in the past, and the resulting window
    /// must still end in the future.
    ///
    /// # Errors
    ///
    /// - [`RaffleError::NotFound`] if the raffle does not exist
    /// - [`RaffleError::InvalidState`] if it is closed
    /// - [`RaffleError::Validation`] for bad input; nothing is changed
    pub async fn update(
        &self,
        id: RaffleId,
        changes: RaffleUpdate,
        actor: UserId,
    ) -> Result<Raffle> {
        let raffle = self.get(id).await?;
        if !raffle.is_active {
            return Err(RaffleError::InvalidState(format!("Raffle {id} is not active")));
        }

        let now = Utc::now();
        if let Some(name) = &changes.name {
            validate_name(name)?;
        }
        if let Some(description) = &changes.description {
            validate_description(description)?;
        }
        if changes.init_date.is_some_and(|init| init < now) {
            return Err(RaffleError::Validation(
                "init date may not be in the past".to_string(),
            ));
        }

        let mut updated = raffle;
        if let Some(name) = changes.name {
            updated.name = name.trim().to_string();
        }
        if let Some(description) = changes.description {
            updated.description = description;
        }
        updated.init_date = changes.init_date.unwrap_or(updated.init_date);
        updated.end_date = changes.end_date.unwrap_or(updated.end_date);
        updated.updated_by = actor;
        updated.updated_at = now;
        validate_window(updated.init_date, updated.end_date, now)?;

        if !self.raffles.update(&updated).await? {
            warn!(raffle_id = %id, "Raffle closed concurrently");
            return Err(RaffleError::InvalidState(format!("Raffle {id} is not active")));
        }

        info!(raffle_id = %id, updated_by = %actor, "Raffle updated");

        Ok(updated)
    }

    /// Raffles matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the query fails.
    pub async fn list(&self, filter: &RaffleFilter) -> Result<Vec<Raffle>> {
        self.raffles.list(filter).await
    }
}

/// Tickets `1..=count` for a raffle, all available.
#[must_use]
pub fn build_pool(raffle_id: RaffleId, count: u32) -> Vec<Ticket> {
    (1..=count)
        .map(|number| Ticket::available(raffle_id, number))
        .collect()
}

fn validate(input: &NewRaffle, now: DateTime<Utc>) -> Result<()> {
    validate_name(&input.name)?;
    validate_description(&input.description)?;
    validate_window(input.init_date, input.end_date, now)?;

    if input.price.is_zero() {
        return Err(RaffleError::Validation("price must be positive".to_string()));
    }

    if !(MIN_TICKETS..=MAX_TICKETS).contains(&input.ticket_count) {
        return Err(RaffleError::Validation(format!(
            "ticket count must be between {MIN_TICKETS} and {MAX_TICKETS}"
        )));
    }

    // Total revenue of a sold-out raffle must be representable.
    if input.price.checked_mul(u64::from(input.ticket_count)).is_none() {
        return Err(RaffleError::Validation("price is too large".to_string()));
    }

    if let Some(currency) = &input.currency {
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(RaffleError::Validation(
                "currency must be a 3-letter ISO code".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_name(name: &str) -> Result<()> {
    let name_len = name.trim().chars().count();
    if name_len == 0 || name_len > MAX_NAME_LEN {
        return Err(RaffleError::Validation(format!(
            "name must be between 1 and {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<()> {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(RaffleError::Validation(format!(
            "description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_window(
    init_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<()> {
    if end_date <= init_date {
        return Err(RaffleError::Validation(
            "end date must be after init date".to_string(),
        ));
    }
    if end_date < now {
        return Err(RaffleError::Validation(
            "end date may not be in the past".to_string(),
        ));
    }
    Ok(())
}

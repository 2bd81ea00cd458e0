//! Ticket pool storage.
//!
//! Ownership changes are single `UPDATE` statements guarded by the current
//! ownership state, so the database arbitrates concurrent claims. Settling
//! and releasing run on any executor so payment resolution can include them
//! in its transaction.

use crate::{db_error, from_i32, from_i64};
use async_trait::async_trait;
use raffle_core::providers::TicketStore;
use raffle_core::{RaffleError, RaffleId, Result, Ticket, TicketId, UserId};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

/// `PostgreSQL` ticket store.
#[derive(Clone)]
pub struct PostgresTicketStore {
    pool: PgPool,
}

impl PostgresTicketStore {
    /// Create a store over an existing pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct TicketRow {
    id: Uuid,
    raffle_id: Uuid,
    ticket_number: i32,
    owner_id: Option<Uuid>,
    is_paid: bool,
}

impl TryFrom<TicketRow> for Ticket {
    type Error = RaffleError;

    fn try_from(row: TicketRow) -> Result<Self> {
        Ok(Self {
            id: TicketId::from_uuid(row.id),
            raffle_id: RaffleId::from_uuid(row.raffle_id),
            ticket_number: from_i32(row.ticket_number, "ticket_number")?,
            owner_id: row.owner_id.map(UserId::from_uuid),
            is_paid: row.is_paid,
        })
    }
}

fn to_tickets(rows: Vec<TicketRow>) -> Result<Vec<Ticket>> {
    rows.into_iter().map(Ticket::try_from).collect()
}

fn uuids(ids: &[TicketId]) -> Vec<Uuid> {
    ids.iter().map(|id| *id.as_uuid()).collect()
}

/// Mark claimed, unpaid tickets as paid.
pub(crate) async fn settle_tickets<'e, E: PgExecutor<'e>>(
    executor: E,
    ticket_ids: &[TicketId],
) -> Result<u64> {
    let result = sqlx::query(
        r"
        UPDATE tickets
        SET is_paid = TRUE, updated_at = now()
        WHERE id = ANY($1) AND owner_id IS NOT NULL AND NOT is_paid
        ",
    )
    .bind(uuids(ticket_ids))
    .execute(executor)
    .await
    .map_err(|e| db_error("settle tickets", &e))?;

    Ok(result.rows_affected())
}

/// Return claimed, unpaid tickets to the pool.
pub(crate) async fn release_tickets<'e, E: PgExecutor<'e>>(
    executor: E,
    ticket_ids: &[TicketId],
) -> Result<u64> {
    let result = sqlx::query(
        r"
        UPDATE tickets
        SET owner_id = NULL, is_paid = FALSE, updated_at = now()
        WHERE id = ANY($1) AND owner_id IS NOT NULL AND NOT is_paid
        ",
    )
    .bind(uuids(ticket_ids))
    .execute(executor)
    .await
    .map_err(|e| db_error("release tickets", &e))?;

    Ok(result.rows_affected())
}

#[async_trait]
impl TicketStore for PostgresTicketStore {
    async fn claim(&self, ticket_id: TicketId, owner_id: UserId) -> Result<Ticket> {
        let claimed = sqlx::query_as::<_, TicketRow>(
            r"
            UPDATE tickets
            SET owner_id = $2, updated_at = now()
            WHERE id = $1 AND owner_id IS NULL
            RETURNING id, raffle_id, ticket_number, owner_id, is_paid
            ",
        )
        .bind(ticket_id.as_uuid())
        .bind(owner_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("claim ticket", &e))?;

        if let Some(row) = claimed {
            return Ticket::try_from(row);
        }

        // Nothing updated: either the ticket is gone or someone holds it.
        let number: Option<i32> =
            sqlx::query_scalar("SELECT ticket_number FROM tickets WHERE id = $1")
                .bind(ticket_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("look up ticket", &e))?;

        match number {
            Some(number) => Err(RaffleError::Conflict(format!(
                "Ticket {number} is already claimed"
            ))),
            None => Err(RaffleError::not_found("ticket", ticket_id)),
        }
    }

    async fn settle(&self, ticket_ids: &[TicketId]) -> Result<u64> {
        settle_tickets(&self.pool, ticket_ids).await
    }

    async fn release(&self, ticket_ids: &[TicketId]) -> Result<u64> {
        release_tickets(&self.pool, ticket_ids).await
    }

    async fn list_eligible_for_draw(&self, raffle_id: RaffleId) -> Result<Vec<Ticket>> {
        let rows = sqlx::query_as::<_, TicketRow>(
            r"
            SELECT id, raffle_id, ticket_number, owner_id, is_paid
            FROM tickets
            WHERE raffle_id = $1 AND owner_id IS NOT NULL AND is_paid
            ORDER BY ticket_number
            ",
        )
        .bind(raffle_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list eligible tickets", &e))?;

        to_tickets(rows)
    }

    async fn get(&self, ticket_id: TicketId) -> Result<Option<Ticket>> {
        sqlx::query_as::<_, TicketRow>(
            "SELECT id, raffle_id, ticket_number, owner_id, is_paid FROM tickets WHERE id = $1",
        )
        .bind(ticket_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("get ticket", &e))?
        .map(Ticket::try_from)
        .transpose()
    }

    async fn get_many(&self, ticket_ids: &[TicketId]) -> Result<Vec<Ticket>> {
        let rows = sqlx::query_as::<_, TicketRow>(
            r"
            SELECT id, raffle_id, ticket_number, owner_id, is_paid
            FROM tickets
            WHERE id = ANY($1)
            ORDER BY ticket_number
            ",
        )
        .bind(uuids(ticket_ids))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("get tickets", &e))?;

        to_tickets(rows)
    }

    async fn list(&self, raffle_id: RaffleId, available_only: bool) -> Result<Vec<Ticket>> {
        let rows = sqlx::query_as::<_, TicketRow>(
            r"
            SELECT id, raffle_id, ticket_number, owner_id, is_paid
            FROM tickets
            WHERE raffle_id = $1 AND (NOT $2 OR owner_id IS NULL)
            ORDER BY ticket_number
            ",
        )
        .bind(raffle_id.as_uuid())
        .bind(available_only)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list tickets", &e))?;

        to_tickets(rows)
    }

    async fn participants(&self, raffle_id: RaffleId) -> Result<Vec<UserId>> {
        let owners: Vec<Uuid> = sqlx::query_scalar(
            r"
            SELECT DISTINCT owner_id
            FROM tickets
            WHERE raffle_id = $1 AND owner_id IS NOT NULL
            ORDER BY owner_id
            ",
        )
        .bind(raffle_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list participants", &e))?;

        Ok(owners.into_iter().map(UserId::from_uuid).collect())
    }

    async fn count(&self, raffle_id: RaffleId) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tickets WHERE raffle_id = $1")
            .bind(raffle_id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("count tickets", &e))?;

        from_i64(count, "ticket count")
    }
}

//! Winner records.
//!
//! Recording a winner and closing its raffle happen in one transaction; the
//! unique index on `winners.raffle_id` is what makes the draw irrevocable.

use crate::{db_error, from_i32, is_unique_violation, to_i32};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use raffle_core::providers::WinnerRepository;
use raffle_core::{RaffleError, RaffleId, Result, TicketId, UserId, Winner, WinnerId};
use sqlx::PgPool;
use uuid::Uuid;

/// `PostgreSQL` winner repository.
#[derive(Clone)]
pub struct PostgresWinnerRepository {
    pool: PgPool,
}

impl PostgresWinnerRepository {
    /// Create a repository over an existing pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct WinnerRow {
    id: Uuid,
    raffle_id: Uuid,
    ticket_id: Uuid,
    ticket_number: i32,
    user_id: Uuid,
    drawn_by: Uuid,
    created_at: DateTime<Utc>,
}

impl TryFrom<WinnerRow> for Winner {
    type Error = RaffleError;

    fn try_from(row: WinnerRow) -> Result<Self> {
        Ok(Self {
            id: WinnerId::from_uuid(row.id),
            raffle_id: RaffleId::from_uuid(row.raffle_id),
            ticket_id: TicketId::from_uuid(row.ticket_id),
            ticket_number: from_i32(row.ticket_number, "ticket_number")?,
            user_id: UserId::from_uuid(row.user_id),
            drawn_by: UserId::from_uuid(row.drawn_by),
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl WinnerRepository for PostgresWinnerRepository {
    async fn record(&self, winner: &Winner) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin transaction", &e))?;

        sqlx::query(
            r"
            INSERT INTO winners
                (id, raffle_id, ticket_id, ticket_number, user_id, drawn_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(winner.id.as_uuid())
        .bind(winner.raffle_id.as_uuid())
        .bind(winner.ticket_id.as_uuid())
        .bind(to_i32(winner.ticket_number, "ticket_number")?)
        .bind(winner.user_id.as_uuid())
        .bind(winner.drawn_by.as_uuid())
        .bind(winner.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return RaffleError::Conflict(format!(
                    "A winner has already been selected for raffle {}",
                    winner.raffle_id
                ));
            }
            db_error("insert winner", &e)
        })?;

        let closed = sqlx::query(
            r"
            UPDATE raffles
            SET is_active = FALSE, updated_by = $2, updated_at = $3
            WHERE id = $1 AND is_active
            ",
        )
        .bind(winner.raffle_id.as_uuid())
        .bind(winner.drawn_by.as_uuid())
        .bind(winner.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("close raffle", &e))?
        .rows_affected();

        if closed == 0 {
            tx.rollback()
                .await
                .map_err(|e| db_error("roll back winner", &e))?;
            return Err(RaffleError::InvalidState(format!(
                "Raffle {} is not active",
                winner.raffle_id
            )));
        }

        tx.commit()
            .await
            .map_err(|e| db_error("commit winner", &e))?;

        Ok(())
    }

    async fn get_by_raffle(&self, raffle_id: RaffleId) -> Result<Option<Winner>> {
        sqlx::query_as::<_, WinnerRow>(
            r"
            SELECT id, raffle_id, ticket_id, ticket_number, user_id, drawn_by, created_at
            FROM winners
            WHERE raffle_id = $1
            ",
        )
        .bind(raffle_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("get winner", &e))?
        .map(Winner::try_from)
        .transpose()
    }

    async fn list(&self) -> Result<Vec<Winner>> {
        let rows = sqlx::query_as::<_, WinnerRow>(
            r"
            SELECT id, raffle_id, ticket_id, ticket_number, user_id, drawn_by, created_at
            FROM winners
            ORDER BY created_at DESC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list winners", &e))?;

        rows.into_iter().map(Winner::try_from).collect()
    }
}

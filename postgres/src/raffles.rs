//! Raffle rows and atomic pool creation.

use crate::{db_error, from_i32, from_i64, to_i32, to_i64};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use raffle_core::providers::RaffleRepository;
use raffle_core::{Money, Raffle, RaffleError, RaffleFilter, RaffleId, Result, Ticket, UserId};
use sqlx::PgPool;
use uuid::Uuid;

/// `PostgreSQL` raffle repository.
#[derive(Clone)]
pub struct PostgresRaffleRepository {
    pool: PgPool,
}

const RAFFLE_COLUMNS: &str = "id, name, description, price, currency, tickets_created, \
     init_date, end_date, is_active, created_by, updated_by, created_at, updated_at";

impl PostgresRaffleRepository {
    /// Create a repository over an existing pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RaffleRow {
    id: Uuid,
    name: String,
    description: String,
    price: i64,
    currency: String,
    tickets_created: i32,
    init_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    is_active: bool,
    created_by: Uuid,
    updated_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RaffleRow> for Raffle {
    type Error = RaffleError;

    fn try_from(row: RaffleRow) -> Result<Self> {
        Ok(Self {
            id: RaffleId::from_uuid(row.id),
            name: row.name,
            description: row.description,
            price: Money::from_minor(from_i64(row.price, "price")?),
            currency: row.currency,
            tickets_created: from_i32(row.tickets_created, "tickets_created")?,
            init_date: row.init_date,
            end_date: row.end_date,
            is_active: row.is_active,
            created_by: UserId::from_uuid(row.created_by),
            updated_by: UserId::from_uuid(row.updated_by),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl RaffleRepository for PostgresRaffleRepository {
    async fn insert_with_pool(&self, raffle: &Raffle, tickets: &[Ticket]) -> Result<()> {
        let mut ids = Vec::with_capacity(tickets.len());
        let mut numbers = Vec::with_capacity(tickets.len());
        for ticket in tickets {
            ids.push(*ticket.id.as_uuid());
            numbers.push(to_i32(ticket.ticket_number, "ticket_number")?);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin transaction", &e))?;

        sqlx::query(
            r"
            INSERT INTO raffles
                (id, name, description, price, currency, tickets_created,
                 init_date, end_date, is_active, created_by, updated_by,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ",
        )
        .bind(raffle.id.as_uuid())
        .bind(&raffle.name)
        .bind(&raffle.description)
        .bind(to_i64(raffle.price.minor(), "price")?)
        .bind(&raffle.currency)
        .bind(to_i32(raffle.tickets_created, "tickets_created")?)
        .bind(raffle.init_date)
        .bind(raffle.end_date)
        .bind(raffle.is_active)
        .bind(raffle.created_by.as_uuid())
        .bind(raffle.updated_by.as_uuid())
        .bind(raffle.created_at)
        .bind(raffle.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if crate::is_unique_violation(&e) {
                return RaffleError::Conflict(format!("Raffle {} already exists", raffle.id));
            }
            db_error("insert raffle", &e)
        })?;

        // One round trip for the whole pool.
        let inserted = sqlx::query(
            r"
            INSERT INTO tickets (id, raffle_id, ticket_number, updated_at)
            SELECT t.id, $2, t.ticket_number, $3
            FROM UNNEST($1::uuid[], $4::int4[]) AS t(id, ticket_number)
            ",
        )
        .bind(&ids)
        .bind(raffle.id.as_uuid())
        .bind(raffle.created_at)
        .bind(&numbers)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("insert ticket pool", &e))?
        .rows_affected();

        if inserted != tickets.len() as u64 {
            // Dropping the transaction rolls it back.
            return Err(RaffleError::StorageFailure(format!(
                "Ticket pool for raffle {} incomplete: {inserted} of {}",
                raffle.id,
                tickets.len()
            )));
        }

        tx.commit()
            .await
            .map_err(|e| db_error("commit raffle", &e))?;

        tracing::debug!(raffle_id = %raffle.id, tickets = inserted, "Raffle and pool persisted");
        Ok(())
    }

    async fn get(&self, id: RaffleId) -> Result<Option<Raffle>> {
        sqlx::query_as::<_, RaffleRow>(&format!(
            "SELECT {RAFFLE_COLUMNS} FROM raffles WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("get raffle", &e))?
        .map(Raffle::try_from)
        .transpose()
    }

    async fn deactivate(&self, id: RaffleId, actor: UserId, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE raffles
            SET is_active = FALSE, updated_by = $2, updated_at = $3
            WHERE id = $1 AND is_active
            ",
        )
        .bind(id.as_uuid())
        .bind(actor.as_uuid())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("deactivate raffle", &e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn update(&self, raffle: &Raffle) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE raffles
            SET name = $2, description = $3, init_date = $4, end_date = $5,
                updated_by = $6, updated_at = $7
            WHERE id = $1 AND is_active
            ",
        )
        .bind(raffle.id.as_uuid())
        .bind(&raffle.name)
        .bind(&raffle.description)
        .bind(raffle.init_date)
        .bind(raffle.end_date)
        .bind(raffle.updated_by.as_uuid())
        .bind(raffle.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("update raffle", &e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn list(&self, filter: &RaffleFilter) -> Result<Vec<Raffle>> {
        sqlx::query_as::<_, RaffleRow>(&format!(
            r"
            SELECT {RAFFLE_COLUMNS}
            FROM raffles
            WHERE ($1::text IS NULL OR name ILIKE '%' || $1 || '%')
              AND ($2::bool IS NULL OR is_active = $2)
              AND ($3::uuid IS NULL OR created_by = $3)
            ORDER BY created_at DESC, id
            LIMIT $4 OFFSET $5
            "
        ))
        .bind(filter.name.as_deref())
        .bind(filter.is_active)
        .bind(filter.created_by.map(|actor| *actor.as_uuid()))
        .bind(i64::from(filter.page.limit))
        .bind(to_i64(filter.page.offset(), "offset")?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list raffles", &e))?
        .into_iter()
        .map(Raffle::try_from)
        .collect()
    }
}

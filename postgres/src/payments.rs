//! Payment records and their status transitions.
//!
//! Completing or failing a payment updates its row and its tickets in one
//! transaction. The status guard `status = 'pending'` picks a single winner
//! among concurrent resolvers.

use crate::tickets::{release_tickets, settle_tickets};
use crate::{db_error, from_i64, is_unique_violation, to_i64};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use raffle_core::providers::{PaymentRepository, Resolution};
use raffle_core::{
    Money, Payment, PaymentFilter, PaymentId, PaymentStatus, RaffleError, RaffleId, Result,
    TicketId,
};
use sqlx::PgPool;
use uuid::Uuid;

/// `PostgreSQL` payment repository.
#[derive(Clone)]
pub struct PostgresPaymentRepository {
    pool: PgPool,
}

impl PostgresPaymentRepository {
    /// Create a repository over an existing pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn resolve(
        &self,
        id: PaymentId,
        to: PaymentStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<Resolution>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin transaction", &e))?;

        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            r"
            UPDATE payments
            SET status = $2, updated_at = $3
            WHERE id = $1 AND status = 'pending'
            RETURNING {PAYMENT_COLUMNS}
            "
        ))
        .bind(id.as_uuid())
        .bind(to.as_str())
        .bind(at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("update payment status", &e))?;

        // Not pending any more; dropping the transaction rolls it back.
        let Some(row) = row else {
            return Ok(None);
        };
        let payment = Payment::try_from(row)?;

        let tickets = match to {
            PaymentStatus::Completed => settle_tickets(&mut *tx, &payment.tickets).await?,
            _ => release_tickets(&mut *tx, &payment.tickets).await?,
        };

        tx.commit()
            .await
            .map_err(|e| db_error("commit payment resolution", &e))?;

        tracing::debug!(payment_id = %id, status = %to, tickets, "Payment resolved");
        Ok(Some(Resolution { payment, tickets }))
    }
}

const PAYMENT_COLUMNS: &str = "id, raffle_id, tickets, amount, currency, status, \
     gateway_session_id, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    raffle_id: Uuid,
    tickets: Vec<Uuid>,
    amount: i64,
    currency: String,
    status: String,
    gateway_session_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = RaffleError;

    fn try_from(row: PaymentRow) -> Result<Self> {
        let status = PaymentStatus::parse(&row.status).ok_or_else(|| {
            RaffleError::StorageFailure(format!("Invalid payment status in database: {}", row.status))
        })?;

        Ok(Self {
            id: PaymentId::from_uuid(row.id),
            raffle_id: RaffleId::from_uuid(row.raffle_id),
            tickets: row.tickets.into_iter().map(TicketId::from_uuid).collect(),
            amount: Money::from_minor(from_i64(row.amount, "amount")?),
            currency: row.currency,
            status,
            gateway_session_id: row.gateway_session_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn insert(&self, payment: &Payment) -> Result<()> {
        let tickets: Vec<Uuid> = payment.tickets.iter().map(|id| *id.as_uuid()).collect();

        sqlx::query(
            r"
            INSERT INTO payments
                (id, raffle_id, tickets, amount, currency, status,
                 gateway_session_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(payment.id.as_uuid())
        .bind(payment.raffle_id.as_uuid())
        .bind(&tickets)
        .bind(to_i64(payment.amount.minor(), "amount")?)
        .bind(&payment.currency)
        .bind(payment.status.as_str())
        .bind(&payment.gateway_session_id)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return RaffleError::Conflict(format!(
                    "gateway session {} already recorded",
                    payment.gateway_session_id
                ));
            }
            db_error("insert payment", &e)
        })?;

        Ok(())
    }

    async fn get(&self, id: PaymentId) -> Result<Option<Payment>> {
        sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("get payment", &e))?
        .map(Payment::try_from)
        .transpose()
    }

    async fn get_by_session(&self, session_id: &str) -> Result<Option<Payment>> {
        sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE gateway_session_id = $1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("get payment by session", &e))?
        .map(Payment::try_from)
        .transpose()
    }

    async fn complete(&self, id: PaymentId, at: DateTime<Utc>) -> Result<Option<Resolution>> {
        self.resolve(id, PaymentStatus::Completed, at).await
    }

    async fn fail(&self, id: PaymentId, at: DateTime<Utc>) -> Result<Option<Resolution>> {
        self.resolve(id, PaymentStatus::Failed, at).await
    }

    async fn has_pending_for(&self, ticket_ids: &[TicketId]) -> Result<bool> {
        let ids: Vec<Uuid> = ticket_ids.iter().map(|id| *id.as_uuid()).collect();

        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM payments WHERE status = 'pending' AND tickets && $1)",
        )
        .bind(&ids)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("check pending payments", &e))
    }

    async fn list_expired_pending(&self, cutoff: DateTime<Utc>) -> Result<Vec<Payment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments \
             WHERE status = 'pending' AND created_at < $1 \
             ORDER BY created_at"
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list expired payments", &e))?;

        rows.into_iter().map(Payment::try_from).collect()
    }

    async fn list(&self, filter: &PaymentFilter) -> Result<Vec<Payment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            r"
            SELECT {PAYMENT_COLUMNS}
            FROM payments
            WHERE ($1::uuid IS NULL OR raffle_id = $1)
              AND ($2::text IS NULL OR status = $2)
              AND ($3::text IS NULL OR gateway_session_id = $3)
            ORDER BY created_at DESC, id
            LIMIT $4 OFFSET $5
            "
        ))
        .bind(filter.raffle_id.map(|id| *id.as_uuid()))
        .bind(filter.status.as_ref().map(PaymentStatus::as_str))
        .bind(filter.gateway_session_id.as_deref())
        .bind(i64::from(filter.page.limit))
        .bind(to_i64(filter.page.offset(), "offset")?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list payments", &e))?;

        rows.into_iter().map(Payment::try_from).collect()
    }
}

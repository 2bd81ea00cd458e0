//! Raffle endpoints.
//!
//! - `POST /raffles` - provision a raffle and its ticket pool (actor required)
//! - `GET /raffles` - list raffles by name, state or creator
//! - `GET /raffles/:id` - raffle details
//! - `PATCH /raffles/:id` - edit name, description or claim window (actor required)
//! - `POST /raffles/:id/cancel` - close a raffle without a draw (actor required)
//! - `GET /raffles/:id/tickets` - the pool, optionally only available tickets

use crate::WebResult;
use crate::extractors::{Actor, CorrelationId};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use raffle_core::{NewRaffle, Page, Raffle, RaffleFilter, RaffleId, RaffleUpdate, Ticket, UserId};
use serde::Deserialize;
use uuid::Uuid;

/// Query parameters for ticket listings.
#[derive(Debug, Default, Deserialize)]
pub struct TicketFilter {
    /// Only return unowned tickets
    #[serde(default)]
    pub available: bool,
}

/// Query parameters for raffle listings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaffleQuery {
    /// Case-insensitive name fragment
    pub name: Option<String>,
    /// Only active or only closed raffles
    pub is_active: Option<bool>,
    /// Creator's user id
    pub created_by: Option<Uuid>,
    /// Page size
    pub limit: Option<u32>,
    /// 1-based page number
    pub page: Option<u32>,
}

/// `POST /raffles`
///
/// # Errors
///
/// 400 on invalid input, 401 without an actor.
pub async fn create_raffle(
    State(state): State<AppState>,
    Actor(actor): Actor,
    CorrelationId(correlation_id): CorrelationId,
    Json(input): Json<NewRaffle>,
) -> WebResult<(StatusCode, Json<Raffle>)> {
    tracing::debug!(%correlation_id, %actor, name = %input.name, "Provisioning raffle");
    let raffle = state.provisioner.provision(input, actor).await?;
    Ok((StatusCode::CREATED, Json(raffle)))
}

/// `GET /raffles?name=&isActive=&createdBy=&limit=&page=`
///
/// # Errors
///
/// 400 for a bad page.
pub async fn list_raffles(
    State(state): State<AppState>,
    Query(query): Query<RaffleQuery>,
) -> WebResult<Json<Vec<Raffle>>> {
    let filter = RaffleFilter {
        name: query.name,
        is_active: query.is_active,
        created_by: query.created_by.map(UserId::from_uuid),
        page: Page::new(query.limit, query.page)?,
    };
    let raffles = state.provisioner.list(&filter).await?;
    Ok(Json(raffles))
}

/// `GET /raffles/:id`
///
/// # Errors
///
/// 404 if the raffle does not exist.
pub async fn get_raffle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<Json<Raffle>> {
    let raffle = state.provisioner.get(RaffleId::from_uuid(id)).await?;
    Ok(Json(raffle))
}

/// `PATCH /raffles/:id`
///
/// # Errors
///
/// 404 if the raffle does not exist, 400 if it is closed or the new values
/// are invalid, 401 without an actor.
pub async fn update_raffle(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
    Json(changes): Json<RaffleUpdate>,
) -> WebResult<Json<Raffle>> {
    let raffle = state
        .provisioner
        .update(RaffleId::from_uuid(id), changes, actor)
        .await?;
    Ok(Json(raffle))
}

/// `POST /raffles/:id/cancel`
///
/// # Errors
///
/// 404 if the raffle does not exist, 400 if it is already closed.
pub async fn cancel_raffle(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<Uuid>,
) -> WebResult<Json<Raffle>> {
    let raffle = state
        .provisioner
        .cancel(RaffleId::from_uuid(id), actor)
        .await?;
    Ok(Json(raffle))
}

/// `GET /raffles/:id/tickets?available=true`
///
/// # Errors
///
/// 404 if the raffle does not exist.
pub async fn list_tickets(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(filter): Query<TicketFilter>,
) -> WebResult<Json<Vec<Ticket>>> {
    let tickets = state
        .tickets
        .list(RaffleId::from_uuid(id), filter.available)
        .await?;
    Ok(Json(tickets))
}

//! Ticket endpoints.

use crate::WebResult;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
};
use raffle_core::{Ticket, TicketId, UserId};
use serde::Deserialize;
use uuid::Uuid;

/// Body of a claim request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    /// Participant taking the ticket
    pub owner_id: Uuid,
}

/// `PATCH /tickets/:id`
///
/// Claims an available ticket for `ownerId`.
///
/// # Errors
///
/// 404 for an unknown ticket, 409 if already claimed, 400 if the raffle is
/// closed.
pub async fn claim_ticket(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ClaimRequest>,
) -> WebResult<Json<Ticket>> {
    let ticket = state
        .tickets
        .claim(TicketId::from_uuid(id), UserId::from_uuid(request.owner_id))
        .await?;
    Ok(Json(ticket))
}

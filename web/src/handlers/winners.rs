//! Winner endpoints.

use crate::WebResult;
use crate::extractors::{Actor, CorrelationId};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use raffle_core::{RaffleId, Winner};
use serde::Deserialize;
use uuid::Uuid;

/// Body of a draw request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawRequest {
    /// Raffle to draw
    pub raffle_id: Uuid,
}

/// `POST /winners`
///
/// Draws the winner and returns it as soon as it is recorded. Notifications
/// continue in the background.
///
/// # Errors
///
/// 404 for an unknown raffle, 400 if the raffle is closed, already drawn or
/// has no eligible tickets, 401 without an actor.
pub async fn draw_winner(
    State(state): State<AppState>,
    Actor(actor): Actor,
    CorrelationId(correlation_id): CorrelationId,
    Json(request): Json<DrawRequest>,
) -> WebResult<(StatusCode, Json<Winner>)> {
    let outcome = state
        .winners
        .draw(RaffleId::from_uuid(request.raffle_id), actor)
        .await?;
    tracing::debug!(%correlation_id, winner_id = %outcome.winner.id, "Draw complete");
    Ok((StatusCode::CREATED, Json(outcome.winner)))
}

/// `GET /winners`
///
/// # Errors
///
/// 503 if storage is unavailable.
pub async fn list_winners(State(state): State<AppState>) -> WebResult<Json<Vec<Winner>>> {
    Ok(Json(state.winners.list_winners().await?))
}

/// `GET /winners/:raffle_id`
///
/// # Errors
///
/// 404 if the raffle has no winner.
pub async fn get_winner(
    State(state): State<AppState>,
    Path(raffle_id): Path<Uuid>,
) -> WebResult<Json<Winner>> {
    Ok(Json(
        state.winners.get_winner(RaffleId::from_uuid(raffle_id)).await?,
    ))
}

//! Router configuration.

use crate::handlers::{health_check, payments, raffles, tickets, winners};
use crate::middleware::correlation_id_layer;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, patch, post},
};
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// Layers run outside-in: correlation id first so the trace span and every
/// handler log line carry it.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Raffles
        .route("/raffles", post(raffles::create_raffle).get(raffles::list_raffles))
        .route("/raffles/:id", get(raffles::get_raffle).patch(raffles::update_raffle))
        .route("/raffles/:id/cancel", post(raffles::cancel_raffle))
        .route("/raffles/:id/tickets", get(raffles::list_tickets))
        // Tickets
        .route("/tickets/:id", patch(tickets::claim_ticket))
        // Payments
        .route("/payments", post(payments::create_payment).get(payments::list_payments))
        .route("/payments/webhook", post(payments::payment_webhook))
        .route("/payments/sweep", post(payments::sweep_payments))
        .route("/payments/:id", get(payments::get_payment))
        .route("/payments/:id/cancel", post(payments::cancel_payment))
        // Winners
        .route("/winners", post(winners::draw_winner).get(winners::list_winners))
        .route("/winners/:raffle_id", get(winners::get_winner))
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .with_state(state)
}

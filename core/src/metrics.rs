//! Business metrics for the raffle platform.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `raffle_raffles_created_total` - Raffles provisioned
//! - `raffle_tickets_claimed_total` - Successful ticket claims
//! - `raffle_claim_conflicts_total` - Claims lost to another participant
//! - `raffle_payments_total{status}` - Payments by transition (created, completed, expired, cancelled)
//! - `raffle_payment_revenue_minor_total` - Revenue of completed payments in minor units
//! - `raffle_tickets_released_total` - Tickets returned to the pool
//! - `raffle_winners_drawn_total` - Winners recorded
//! - `raffle_notifications_failed_total{template}` - Undelivered notifications
//!
//! ## Gauges
//! - `raffle_pending_payments` - Pending payments created minus resolved

use metrics::{describe_counter, describe_gauge};

/// Register metric descriptions. Call once at startup.
pub fn register_business_metrics() {
    describe_counter!("raffle_raffles_created_total", "Total number of raffles provisioned");
    describe_counter!("raffle_tickets_claimed_total", "Total number of successful ticket claims");
    describe_counter!(
        "raffle_claim_conflicts_total",
        "Total number of claims rejected because the ticket was already owned"
    );
    describe_counter!(
        "raffle_payments_total",
        "Total number of payment transitions by status (created, completed, expired, cancelled)"
    );
    describe_counter!(
        "raffle_payment_revenue_minor_total",
        "Total revenue from completed payments in minor currency units"
    );
    describe_counter!(
        "raffle_tickets_released_total",
        "Total number of tickets returned to the available pool"
    );
    describe_counter!("raffle_winners_drawn_total", "Total number of winners drawn");
    describe_counter!(
        "raffle_notifications_failed_total",
        "Total number of winner notifications that could not be delivered"
    );
    describe_gauge!("raffle_pending_payments", "Current number of pending payments");

    tracing::info!("Business metrics registered");
}

/// Record a provisioned raffle.
pub fn record_raffle_created(ticket_count: u32) {
    metrics::counter!("raffle_raffles_created_total").increment(1);
    tracing::debug!(ticket_count, "Recorded raffle_created metric");
}

/// Record a successful claim.
pub fn record_ticket_claimed() {
    metrics::counter!("raffle_tickets_claimed_total").increment(1);
}

/// Record a claim that lost the race.
pub fn record_claim_conflict() {
    metrics::counter!("raffle_claim_conflicts_total").increment(1);
}

/// Record a newly opened pending payment.
pub fn record_payment_created() {
    metrics::counter!("raffle_payments_total", "status" => "created").increment(1);
    metrics::gauge!("raffle_pending_payments").increment(1.0);
}

/// Record a completed payment.
pub fn record_payment_completed(amount_minor: u64) {
    metrics::counter!("raffle_payments_total", "status" => "completed").increment(1);
    metrics::counter!("raffle_payment_revenue_minor_total").increment(amount_minor);
    metrics::gauge!("raffle_pending_payments").decrement(1.0);
    tracing::debug!(amount_minor, "Recorded payment_completed metric");
}

/// Record a payment failed by the sweep (`expired`) or by request (`cancelled`).
pub fn record_payment_failed(reason: &'static str, released: u64) {
    metrics::counter!("raffle_payments_total", "status" => reason).increment(1);
    metrics::counter!("raffle_tickets_released_total").increment(released);
    metrics::gauge!("raffle_pending_payments").decrement(1.0);
    tracing::debug!(reason, released, "Recorded payment_failed metric");
}

/// Record a drawn winner.
pub fn record_winner_drawn() {
    metrics::counter!("raffle_winners_drawn_total").increment(1);
}

/// Record an undelivered notification.
pub fn record_notification_failed(template: &'static str) {
    metrics::counter!("raffle_notifications_failed_total", "template" => template).increment(1);
}

//! Races between concurrent requests.
//!
//! The in-memory store yields before every call, so on a multi-threaded
//! runtime these operations genuinely interleave.

#![allow(clippy::unwrap_used, clippy::panic)]

mod common;

use chrono::{Duration, Utc};
use common::Harness;
use futures::future::join_all;
use raffle_core::{PaymentStatus, RaffleError, UserId};
use std::sync::Arc;

fn user() -> UserId {
    UserId::from_uuid(uuid::Uuid::new_v4())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_claims_have_one_winner() {
    let h = Arc::new(Harness::new());
    let (_, pool) = h.raffle(10).await;
    let ticket_id = pool[0].id;

    let attempts = (0..16).map(|_| {
        let h = Arc::clone(&h);
        tokio::spawn(async move { h.tickets.claim(ticket_id, user()).await })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();

    let successes = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(RaffleError::Conflict(_))))
        .count();
    assert_eq!(successes, 1);
    assert_eq!(conflicts, 15);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_draws_record_one_winner() {
    let h = Arc::new(Harness::new());
    let (raffle, pool) = h.raffle(10).await;
    for ticket in &pool[..5] {
        let owner = h.directory.add("P", "Q", &format!("{}@example.com", ticket.ticket_number));
        h.buy(&raffle, ticket, owner).await;
    }

    let raffle_id = raffle.id;
    let draws = (0..8).map(|_| {
        let h = Arc::clone(&h);
        let actor = h.creator;
        tokio::spawn(async move { h.winners.draw(raffle_id, actor).await })
    });
    let results: Vec<_> = join_all(draws)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();

    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(
            matches!(err, RaffleError::InvalidState(msg) if msg.contains("already has a winner")),
            "unexpected error {err:?}"
        );
    }
    assert_eq!(h.store.winner_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sweeps_fail_each_payment_once() {
    let h = Arc::new(Harness::new());
    let (raffle, pool) = h.raffle(10).await;
    let mut payment_ids = Vec::new();
    for ticket in &pool[..6] {
        h.tickets.claim(ticket.id, user()).await.unwrap();
        let checkout = h
            .payments
            .create(raffle.id, &[ticket.id], raffle.price)
            .await
            .unwrap();
        payment_ids.push(checkout.payment.id);
    }

    let now = Utc::now() + Duration::hours(2);
    let sweeps = (0..4).map(|_| {
        let h = Arc::clone(&h);
        tokio::spawn(async move { h.payments.sweep_expired(now, Duration::minutes(60)).await })
    });
    let total: u64 = join_all(sweeps)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .sum();

    assert_eq!(total, 6);
    assert_eq!(h.store.release_calls(), 6);
    for id in payment_ids {
        assert_eq!(h.payments.get(id).await.unwrap().status, PaymentStatus::Failed);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_complete_races_sweep() {
    for _ in 0..20 {
        let h = Arc::new(Harness::new());
        let (raffle, pool) = h.raffle(10).await;
        h.tickets.claim(pool[0].id, user()).await.unwrap();
        let checkout = h
            .payments
            .create(raffle.id, &[pool[0].id], raffle.price)
            .await
            .unwrap();
        let payment_id = checkout.payment.id;

        let completer = {
            let h = Arc::clone(&h);
            tokio::spawn(async move { h.payments.complete(payment_id).await })
        };
        let sweeper = {
            let h = Arc::clone(&h);
            tokio::spawn(async move {
                h.payments
                    .sweep_expired(Utc::now() + Duration::hours(2), Duration::minutes(60))
                    .await
            })
        };
        let completed = completer.await.unwrap();
        let swept = sweeper.await.unwrap().unwrap();

        let ticket = h.tickets.get(pool[0].id).await.unwrap();
        let status = h.payments.get(payment_id).await.unwrap().status;
        match status {
            PaymentStatus::Completed => {
                assert!(completed.is_ok());
                assert_eq!(swept, 0);
                assert!(ticket.is_paid && ticket.owner_id.is_some());
            }
            PaymentStatus::Failed => {
                assert!(matches!(completed, Err(RaffleError::InvalidState(_))));
                assert_eq!(swept, 1);
                assert!(!ticket.is_paid && ticket.owner_id.is_none());
            }
            PaymentStatus::Pending => panic!("payment left pending"),
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_completions_settle_once() {
    let h = Arc::new(Harness::new());
    let (raffle, pool) = h.raffle(10).await;
    h.tickets.claim(pool[0].id, user()).await.unwrap();
    let checkout = h
        .payments
        .create(raffle.id, &[pool[0].id], raffle.price)
        .await
        .unwrap();
    let payment_id = checkout.payment.id;

    let completions = (0..8).map(|_| {
        let h = Arc::clone(&h);
        tokio::spawn(async move { h.payments.complete(payment_id).await })
    });
    for result in join_all(completions).await {
        assert_eq!(result.unwrap().unwrap().status, PaymentStatus::Completed);
    }
    assert_eq!(h.store.settle_calls(), 1);
}

//! In-memory store for testing.
//!
//! Implements every storage trait over one mutex-guarded state, so
//! multi-row operations are atomic exactly like a database transaction.
//! A failed unit of work returns before touching the state, which is how
//! a rolled back transaction looks from outside.
//! Each call yields to the scheduler first to let concurrent tests
//! interleave the way real I/O would.

use crate::error::{RaffleError, Result};
use crate::providers::{
    PaymentRepository, RaffleRepository, Resolution, TicketStore, WinnerRepository,
};
use crate::types::{
    Page, Payment, PaymentFilter, PaymentId, PaymentStatus, Raffle, RaffleFilter, RaffleId,
    Ticket, TicketId, UserId, Winner,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct State {
    raffles: HashMap<RaffleId, Raffle>,
    tickets: HashMap<TicketId, Ticket>,
    payments: HashMap<PaymentId, Payment>,
    winners: HashMap<RaffleId, Winner>,
}

/// In-memory implementation of all raffle repositories.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
    fail_writes: Arc<AtomicBool>,
    ticket_fault: Arc<AtomicBool>,
    settle_calls: Arc<AtomicUsize>,
    release_calls: Arc<AtomicUsize>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with a storage failure.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make the next write to the ticket pool fail with a storage failure.
    ///
    /// Applies to `settle` and `release` as well as the ticket half of a
    /// payment's `complete` or `fail`, which then leaves the payment
    /// pending.
    pub fn fail_next_ticket_write(&self) {
        self.ticket_fault.store(true, Ordering::SeqCst);
    }

    /// Number of ticket settlements that touched at least one row.
    #[must_use]
    pub fn settle_calls(&self) -> usize {
        self.settle_calls.load(Ordering::SeqCst)
    }

    /// Number of ticket releases that touched at least one row.
    #[must_use]
    pub fn release_calls(&self) -> usize {
        self.release_calls.load(Ordering::SeqCst)
    }

    /// Number of stored raffles.
    #[must_use]
    pub fn raffle_count(&self) -> usize {
        self.lock().map(|s| s.raffles.len()).unwrap_or_default()
    }

    /// Number of stored payments.
    #[must_use]
    pub fn payment_count(&self) -> usize {
        self.lock().map(|s| s.payments.len()).unwrap_or_default()
    }

    /// Number of stored winners.
    #[must_use]
    pub fn winner_count(&self) -> usize {
        self.lock().map(|s| s.winners.len()).unwrap_or_default()
    }

    /// Overwrite a payment's creation time.
    pub fn backdate_payment(&self, id: PaymentId, created_at: DateTime<Utc>) {
        if let Ok(mut state) = self.lock() {
            if let Some(payment) = state.payments.get_mut(&id) {
                payment.created_at = created_at;
            }
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| RaffleError::StorageFailure("in-memory store poisoned".to_string()))
    }

    fn write_lock(&self) -> Result<MutexGuard<'_, State>> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RaffleError::StorageFailure("simulated write failure".to_string()));
        }
        self.lock()
    }

    fn take_ticket_fault(&self) -> Result<()> {
        if self.ticket_fault.swap(false, Ordering::SeqCst) {
            return Err(RaffleError::StorageFailure(
                "simulated ticket write failure".to_string(),
            ));
        }
        Ok(())
    }

    fn settle_in(&self, state: &mut State, ticket_ids: &[TicketId]) -> u64 {
        let mut touched = 0;
        for id in ticket_ids {
            if let Some(ticket) = state.tickets.get_mut(id) {
                if ticket.owner_id.is_some() && !ticket.is_paid {
                    ticket.is_paid = true;
                    touched += 1;
                }
            }
        }
        if touched > 0 {
            self.settle_calls.fetch_add(1, Ordering::SeqCst);
        }
        touched
    }

    fn release_in(&self, state: &mut State, ticket_ids: &[TicketId]) -> u64 {
        let mut touched = 0;
        for id in ticket_ids {
            if let Some(ticket) = state.tickets.get_mut(id) {
                if ticket.owner_id.is_some() && !ticket.is_paid {
                    ticket.owner_id = None;
                    touched += 1;
                }
            }
        }
        if touched > 0 {
            self.release_calls.fetch_add(1, Ordering::SeqCst);
        }
        touched
    }

    fn resolve(
        &self,
        id: PaymentId,
        to: PaymentStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<Resolution>> {
        let mut state = self.write_lock()?;
        let tickets = match state.payments.get(&id) {
            Some(payment) if payment.status == PaymentStatus::Pending => payment.tickets.clone(),
            _ => return Ok(None),
        };
        self.take_ticket_fault()?;

        let touched = match to {
            PaymentStatus::Completed => self.settle_in(&mut state, &tickets),
            _ => self.release_in(&mut state, &tickets),
        };
        let Some(payment) = state.payments.get_mut(&id) else {
            return Ok(None);
        };
        payment.status = to;
        payment.updated_at = at;
        Ok(Some(Resolution {
            payment: payment.clone(),
            tickets: touched,
        }))
    }
}

fn paginate<T>(mut rows: Vec<T>, page: Page) -> Vec<T> {
    let skip = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let take = page.limit as usize;
    if skip >= rows.len() {
        return Vec::new();
    }
    rows.drain(..skip);
    rows.truncate(take);
    rows
}

#[async_trait]
impl RaffleRepository for InMemoryStore {
    async fn insert_with_pool(&self, raffle: &Raffle, tickets: &[Ticket]) -> Result<()> {
        tokio::task::yield_now().await;
        let mut state = self.write_lock()?;

        if state.raffles.contains_key(&raffle.id) {
            return Err(RaffleError::Conflict(format!("raffle {} already exists", raffle.id)));
        }
        let mut numbers = BTreeSet::new();
        if !tickets
            .iter()
            .all(|t| t.raffle_id == raffle.id && numbers.insert(t.ticket_number))
        {
            return Err(RaffleError::StorageFailure(
                "duplicate (raffle_id, ticket_number)".to_string(),
            ));
        }

        state.raffles.insert(raffle.id, raffle.clone());
        for ticket in tickets {
            state.tickets.insert(ticket.id, ticket.clone());
        }
        Ok(())
    }

    async fn get(&self, id: RaffleId) -> Result<Option<Raffle>> {
        tokio::task::yield_now().await;
        Ok(self.lock()?.raffles.get(&id).cloned())
    }

    async fn deactivate(&self, id: RaffleId, actor: UserId, at: DateTime<Utc>) -> Result<bool> {
        tokio::task::yield_now().await;
        let mut state = self.write_lock()?;
        match state.raffles.get_mut(&id) {
            Some(raffle) if raffle.is_active => {
                raffle.is_active = false;
                raffle.updated_by = actor;
                raffle.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update(&self, raffle: &Raffle) -> Result<bool> {
        tokio::task::yield_now().await;
        let mut state = self.write_lock()?;
        match state.raffles.get_mut(&raffle.id) {
            Some(stored) if stored.is_active => {
                stored.name.clone_from(&raffle.name);
                stored.description.clone_from(&raffle.description);
                stored.init_date = raffle.init_date;
                stored.end_date = raffle.end_date;
                stored.updated_by = raffle.updated_by;
                stored.updated_at = raffle.updated_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list(&self, filter: &RaffleFilter) -> Result<Vec<Raffle>> {
        tokio::task::yield_now().await;
        let state = self.lock()?;
        let mut raffles: Vec<Raffle> = state
            .raffles
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        raffles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(raffles, filter.page))
    }
}

#[async_trait]
impl TicketStore for InMemoryStore {
    async fn claim(&self, ticket_id: TicketId, owner_id: UserId) -> Result<Ticket> {
        tokio::task::yield_now().await;
        let mut state = self.write_lock()?;
        let ticket = state
            .tickets
            .get_mut(&ticket_id)
            .ok_or_else(|| RaffleError::not_found("ticket", ticket_id))?;

        if ticket.owner_id.is_some() {
            return Err(RaffleError::Conflict(format!(
                "Ticket {} is already claimed",
                ticket.ticket_number
            )));
        }
        ticket.owner_id = Some(owner_id);
        Ok(ticket.clone())
    }

    async fn settle(&self, ticket_ids: &[TicketId]) -> Result<u64> {
        tokio::task::yield_now().await;
        let mut state = self.write_lock()?;
        self.take_ticket_fault()?;
        Ok(self.settle_in(&mut state, ticket_ids))
    }

    async fn release(&self, ticket_ids: &[TicketId]) -> Result<u64> {
        tokio::task::yield_now().await;
        let mut state = self.write_lock()?;
        self.take_ticket_fault()?;
        Ok(self.release_in(&mut state, ticket_ids))
    }

    async fn list_eligible_for_draw(&self, raffle_id: RaffleId) -> Result<Vec<Ticket>> {
        tokio::task::yield_now().await;
        let state = self.lock()?;
        let mut eligible: Vec<Ticket> = state
            .tickets
            .values()
            .filter(|t| t.raffle_id == raffle_id && t.is_eligible())
            .cloned()
            .collect();
        eligible.sort_by_key(|t| t.ticket_number);
        Ok(eligible)
    }

    async fn get(&self, ticket_id: TicketId) -> Result<Option<Ticket>> {
        tokio::task::yield_now().await;
        Ok(self.lock()?.tickets.get(&ticket_id).cloned())
    }

    async fn get_many(&self, ticket_ids: &[TicketId]) -> Result<Vec<Ticket>> {
        tokio::task::yield_now().await;
        let state = self.lock()?;
        Ok(ticket_ids
            .iter()
            .filter_map(|id| state.tickets.get(id).cloned())
            .collect())
    }

    async fn list(&self, raffle_id: RaffleId, available_only: bool) -> Result<Vec<Ticket>> {
        tokio::task::yield_now().await;
        let state = self.lock()?;
        let mut tickets: Vec<Ticket> = state
            .tickets
            .values()
            .filter(|t| t.raffle_id == raffle_id && (!available_only || t.is_available()))
            .cloned()
            .collect();
        tickets.sort_by_key(|t| t.ticket_number);
        Ok(tickets)
    }

    async fn participants(&self, raffle_id: RaffleId) -> Result<Vec<UserId>> {
        tokio::task::yield_now().await;
        let state = self.lock()?;
        let owners: BTreeSet<UserId> = state
            .tickets
            .values()
            .filter(|t| t.raffle_id == raffle_id)
            .filter_map(|t| t.owner_id)
            .collect();
        Ok(owners.into_iter().collect())
    }

    async fn count(&self, raffle_id: RaffleId) -> Result<u64> {
        tokio::task::yield_now().await;
        let state = self.lock()?;
        Ok(state.tickets.values().filter(|t| t.raffle_id == raffle_id).count() as u64)
    }
}

#[async_trait]
impl PaymentRepository for InMemoryStore {
    async fn insert(&self, payment: &Payment) -> Result<()> {
        tokio::task::yield_now().await;
        let mut state = self.write_lock()?;
        if state
            .payments
            .values()
            .any(|p| p.gateway_session_id == payment.gateway_session_id)
        {
            return Err(RaffleError::Conflict(format!(
                "gateway session {} already recorded",
                payment.gateway_session_id
            )));
        }
        state.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn get(&self, id: PaymentId) -> Result<Option<Payment>> {
        tokio::task::yield_now().await;
        Ok(self.lock()?.payments.get(&id).cloned())
    }

    async fn get_by_session(&self, session_id: &str) -> Result<Option<Payment>> {
        tokio::task::yield_now().await;
        Ok(self
            .lock()?
            .payments
            .values()
            .find(|p| p.gateway_session_id == session_id)
            .cloned())
    }

    async fn complete(&self, id: PaymentId, at: DateTime<Utc>) -> Result<Option<Resolution>> {
        tokio::task::yield_now().await;
        self.resolve(id, PaymentStatus::Completed, at)
    }

    async fn fail(&self, id: PaymentId, at: DateTime<Utc>) -> Result<Option<Resolution>> {
        tokio::task::yield_now().await;
        self.resolve(id, PaymentStatus::Failed, at)
    }

    async fn has_pending_for(&self, ticket_ids: &[TicketId]) -> Result<bool> {
        tokio::task::yield_now().await;
        let state = self.lock()?;
        Ok(state.payments.values().any(|p| {
            p.status == PaymentStatus::Pending && p.tickets.iter().any(|t| ticket_ids.contains(t))
        }))
    }

    async fn list_expired_pending(&self, cutoff: DateTime<Utc>) -> Result<Vec<Payment>> {
        tokio::task::yield_now().await;
        let state = self.lock()?;
        let mut expired: Vec<Payment> = state
            .payments
            .values()
            .filter(|p| p.status == PaymentStatus::Pending && p.created_at < cutoff)
            .cloned()
            .collect();
        expired.sort_by_key(|p| p.created_at);
        Ok(expired)
    }

    async fn list(&self, filter: &PaymentFilter) -> Result<Vec<Payment>> {
        tokio::task::yield_now().await;
        let state = self.lock()?;
        let mut payments: Vec<Payment> = state
            .payments
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(payments, filter.page))
    }
}

#[async_trait]
impl WinnerRepository for InMemoryStore {
    async fn record(&self, winner: &Winner) -> Result<()> {
        tokio::task::yield_now().await;
        let mut state = self.write_lock()?;

        if state.winners.contains_key(&winner.raffle_id) {
            return Err(RaffleError::Conflict(format!(
                "A winner has already been selected for raffle {}",
                winner.raffle_id
            )));
        }
        let raffle = state
            .raffles
            .get_mut(&winner.raffle_id)
            .ok_or_else(|| RaffleError::not_found("raffle", winner.raffle_id))?;
        if !raffle.is_active {
            return Err(RaffleError::InvalidState(format!(
                "Raffle {} is not active",
                winner.raffle_id
            )));
        }

        raffle.is_active = false;
        raffle.updated_by = winner.drawn_by;
        raffle.updated_at = winner.created_at;
        state.winners.insert(winner.raffle_id, winner.clone());
        Ok(())
    }

    async fn get_by_raffle(&self, raffle_id: RaffleId) -> Result<Option<Winner>> {
        tokio::task::yield_now().await;
        Ok(self.lock()?.winners.get(&raffle_id).cloned())
    }

    async fn list(&self) -> Result<Vec<Winner>> {
        tokio::task::yield_now().await;
        let state = self.lock()?;
        let mut winners: Vec<Winner> = state.winners.values().cloned().collect();
        winners.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(winners)
    }
}

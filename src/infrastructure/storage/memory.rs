//! In-memory repositories for development and testing

use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::charging_session::{
    ChargingSession, ChargingSessionRepository, NewChargingSession,
};
use crate::domain::payment::{NewPayment, Payment, PaymentRepository};
use crate::domain::{DomainError, DomainResult, RepositoryProvider};

// ── Charging sessions ──────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryChargingSessionRepository {
    sessions: DashMap<i32, ChargingSession>,
    /// token → session id; doubles as the unique index
    tokens: DashMap<String, i32>,
    counter: AtomicI32,
}

impl InMemoryChargingSessionRepository {
    fn newest_first(mut sessions: Vec<ChargingSession>) -> Vec<ChargingSession> {
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        sessions
    }

    fn deactivate_where<F>(&self, pred: F) -> u64
    where
        F: Fn(&ChargingSession) -> bool,
    {
        let mut changed = 0;
        for mut entry in self.sessions.iter_mut() {
            let session = entry.value_mut();
            if session.active && pred(session) {
                session.active = false;
                changed += 1;
            }
        }
        changed
    }
}

#[async_trait]
impl ChargingSessionRepository for InMemoryChargingSessionRepository {
    async fn insert(&self, new: NewChargingSession) -> DomainResult<ChargingSession> {
        let id = match self.tokens.entry(new.token.clone()) {
            Entry::Occupied(_) => {
                return Err(DomainError::Conflict(format!(
                    "charging session token {}",
                    new.token
                )))
            }
            Entry::Vacant(slot) => {
                let id = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
                slot.insert(id);
                id
            }
        };

        let session = ChargingSession {
            id,
            user_id: new.user_id,
            token: new.token,
            expires_at: new.expires_at,
            created_at: new.created_at,
            active: true,
            payment_id: new.payment_id,
        };
        self.sessions.insert(id, session.clone());
        Ok(session)
    }

    async fn find_by_token(&self, token: &str) -> DomainResult<Option<ChargingSession>> {
        let Some(id) = self.tokens.get(token).map(|e| *e.value()) else {
            return Ok(None);
        };
        Ok(self.sessions.get(&id).map(|s| s.clone()))
    }

    async fn count_by_payment(&self, payment_id: i32) -> DomainResult<u64> {
        Ok(self
            .sessions
            .iter()
            .filter(|s| s.payment_id == payment_id)
            .count() as u64)
    }

    async fn deactivate_by_payment(&self, payment_id: i32) -> DomainResult<u64> {
        Ok(self.deactivate_where(|s| s.payment_id == payment_id))
    }

    async fn find_by_user_created_between(
        &self,
        user_id: i32,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Vec<ChargingSession>> {
        let sessions = self
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id && s.created_at >= from && s.created_at < to)
            .map(|s| s.clone())
            .collect();
        Ok(Self::newest_first(sessions))
    }

    async fn find_active_by_user(&self, user_id: i32) -> DomainResult<Vec<ChargingSession>> {
        let sessions = self
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id && s.active)
            .map(|s| s.clone())
            .collect();
        Ok(Self::newest_first(sessions))
    }

    async fn deactivate_expired(&self, now: DateTime<Utc>) -> DomainResult<u64> {
        Ok(self.deactivate_where(|s| s.expires_at < now))
    }
}

// ── Payments ───────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryPaymentRepository {
    payments: DashMap<i32, Payment>,
    counter: AtomicI32,
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn exists(&self, payment_id: i32) -> DomainResult<bool> {
        Ok(self.payments.contains_key(&payment_id))
    }

    async fn record(&self, new: NewPayment) -> DomainResult<Payment> {
        let id = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let payment = Payment {
            id,
            user_id: new.user_id,
            amount: new.amount,
            reference_number: new.reference_number,
            created_at: Utc::now(),
        };
        self.payments.insert(id, payment.clone());
        Ok(payment)
    }
}

// ── Provider ───────────────────────────────────────────────────

/// DashMap-backed [`RepositoryProvider`]
#[derive(Default)]
pub struct InMemoryRepositoryProvider {
    charging_sessions: InMemoryChargingSessionRepository,
    payments: InMemoryPaymentRepository,
}

impl InMemoryRepositoryProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RepositoryProvider for InMemoryRepositoryProvider {
    fn charging_sessions(&self) -> &dyn ChargingSessionRepository {
        &self.charging_sessions
    }

    fn payments(&self) -> &dyn PaymentRepository {
        &self.payments
    }
}

//! Charging session repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{ChargingSession, NewChargingSession};
use crate::domain::DomainResult;

#[async_trait]
pub trait ChargingSessionRepository: Send + Sync {
    /// Insert a new active session. Fails with `Conflict` on a duplicate token.
    async fn insert(&self, session: NewChargingSession) -> DomainResult<ChargingSession>;

    async fn find_by_token(&self, token: &str) -> DomainResult<Option<ChargingSession>>;

    /// Number of sessions (any status) funded by `payment_id`
    async fn count_by_payment(&self, payment_id: i32) -> DomainResult<u64>;

    /// Flip every still-active session of `payment_id` to inactive.
    /// Returns the number of rows that changed.
    async fn deactivate_by_payment(&self, payment_id: i32) -> DomainResult<u64>;

    /// Sessions of `user_id` created in `[from, to)`, newest first
    async fn find_by_user_created_between(
        &self,
        user_id: i32,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Vec<ChargingSession>>;

    /// Sessions of `user_id` whose `active` flag is set, newest first
    async fn find_active_by_user(&self, user_id: i32) -> DomainResult<Vec<ChargingSession>>;

    /// Flip active sessions with `expires_at < now` to inactive.
    /// Returns the number of rows that changed.
    async fn deactivate_expired(&self, now: DateTime<Utc>) -> DomainResult<u64>;
}

//! Charging session domain entity

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A persisted charging authorization window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChargingSession {
    pub id: i32,
    /// Owning user
    pub user_id: i32,
    /// Unique, unguessable token handed to the user/hardware
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// `false` once the session was closed or swept after expiry
    pub active: bool,
    /// Payment that funded this session
    pub payment_id: i32,
}

impl ChargingSession {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Inactive OR expired sessions never authorize charging.
    pub fn verdict_at(&self, now: DateTime<Utc>) -> SessionVerdict {
        let expired = self.is_expired_at(now);
        SessionVerdict {
            valid: self.active && !expired,
            status: self.active,
            expired,
            expires_at: self.expires_at,
        }
    }
}

/// Fields required to persist a new session; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewChargingSession {
    pub user_id: i32,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub payment_id: i32,
}

/// Outcome of verifying a token that exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionVerdict {
    /// Whether charging may proceed
    pub valid: bool,
    /// The stored `active` flag
    pub status: bool,
    pub expired: bool,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(active: bool, expires_in: Duration) -> ChargingSession {
        let now = Utc::now();
        ChargingSession {
            id: 1,
            user_id: 7,
            token: "chg_x".into(),
            expires_at: now + expires_in,
            created_at: now,
            active,
            payment_id: 11,
        }
    }

    #[test]
    fn active_and_unexpired_is_valid() {
        let v = session(true, Duration::minutes(5)).verdict_at(Utc::now());
        assert!(v.valid);
        assert!(v.status);
        assert!(!v.expired);
    }

    #[test]
    fn inactive_is_invalid() {
        let v = session(false, Duration::minutes(5)).verdict_at(Utc::now());
        assert!(!v.valid);
        assert!(!v.status);
    }

    #[test]
    fn expired_is_invalid_even_when_flag_is_active() {
        let v = session(true, Duration::minutes(-1)).verdict_at(Utc::now());
        assert!(!v.valid);
        assert!(v.status);
        assert!(v.expired);
    }
}

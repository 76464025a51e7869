//! Session token manager
//!
//! Mints, verifies and closes the time-boxed tokens that gate charging.

use std::sync::Arc;

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::token::generate_session_token;
use crate::domain::charging_session::{ChargingSession, NewChargingSession, SessionVerdict};
use crate::domain::RepositoryProvider;
use crate::shared::errors::SessionError;

/// Default authorization window: five hours
pub const DEFAULT_SESSION_WINDOW_MINUTES: i64 = 300;

pub type SessionResult<T> = Result<T, SessionError>;

/// What `issue` hands back to the payment flow
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user_id: i32,
    pub payment_id: i32,
    pub status: bool,
}

pub struct SessionTokenManager {
    repos: Arc<dyn RepositoryProvider>,
    window: Duration,
}

pub type SharedSessionTokenManager = Arc<SessionTokenManager>;

impl SessionTokenManager {
    pub fn new(repos: Arc<dyn RepositoryProvider>, window: Duration) -> Self {
        Self { repos, window }
    }

    pub fn with_default_window(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self::new(repos, Duration::minutes(DEFAULT_SESSION_WINDOW_MINUTES))
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Mint a session for a recorded payment.
    pub async fn issue(&self, user_id: i32, payment_id: i32) -> SessionResult<IssuedSession> {
        if !self.repos.payments().exists(payment_id).await? {
            warn!(user_id, payment_id, "Refusing to issue session for unknown payment");
            return Err(SessionError::PaymentNotFound(payment_id));
        }

        let now = Utc::now();
        let session = self
            .repos
            .charging_sessions()
            .insert(NewChargingSession {
                user_id,
                token: generate_session_token(),
                expires_at: now + self.window,
                created_at: now,
                payment_id,
            })
            .await?;

        metrics::counter!("gateway_sessions_issued_total").increment(1);
        info!(
            session_id = session.id,
            user_id,
            payment_id,
            expires_at = %session.expires_at,
            "Charging session issued"
        );

        Ok(IssuedSession {
            token: session.token,
            expires_at: session.expires_at,
            user_id: session.user_id,
            payment_id: session.payment_id,
            status: session.active,
        })
    }

    /// Verdict for an existing token. Inactive or expired sessions come back
    /// with `valid == false`; only an unknown token is an error.
    pub async fn verify(&self, token: &str) -> SessionResult<SessionVerdict> {
        let session = self.find(token).await?;
        let verdict = session.verdict_at(Utc::now());
        debug!(
            session_id = session.id,
            valid = verdict.valid,
            status = verdict.status,
            expired = verdict.expired,
            "Session verified"
        );
        Ok(verdict)
    }

    /// Like [`verify`](Self::verify) but fails unless charging may proceed.
    pub async fn authorize(&self, token: &str) -> SessionResult<ChargingSession> {
        let session = self.find(token).await?;
        if !session.active {
            return Err(SessionError::SessionNotActive);
        }
        if session.is_expired_at(Utc::now()) {
            return Err(SessionError::SessionExpired);
        }
        Ok(session)
    }

    /// Close every session funded by `payment_id`. Returns how many were
    /// still active; repeating the call is not an error.
    pub async fn deactivate(&self, payment_id: i32) -> SessionResult<u64> {
        let sessions = self.repos.charging_sessions();
        if sessions.count_by_payment(payment_id).await? == 0 {
            return Err(SessionError::SessionNotFound(payment_id));
        }

        let affected = sessions.deactivate_by_payment(payment_id).await?;
        metrics::counter!("gateway_sessions_deactivated_total").increment(affected);
        info!(payment_id, affected, "Charging sessions deactivated");
        Ok(affected)
    }

    /// Sessions of `user_id` created during today's local calendar day
    pub async fn list_today(&self, user_id: i32) -> SessionResult<Vec<ChargingSession>> {
        let (from, to) = local_day_bounds(Local::now());
        Ok(self
            .repos
            .charging_sessions()
            .find_by_user_created_between(user_id, from, to)
            .await?)
    }

    pub async fn list_active(&self, user_id: i32) -> SessionResult<Vec<ChargingSession>> {
        Ok(self
            .repos
            .charging_sessions()
            .find_active_by_user(user_id)
            .await?)
    }

    /// Flip overdue sessions to inactive
    pub async fn expire_overdue(&self) -> SessionResult<u64> {
        let expired = self
            .repos
            .charging_sessions()
            .deactivate_expired(Utc::now())
            .await?;
        if expired > 0 {
            metrics::counter!("gateway_sessions_expired_total").increment(expired);
            info!(count = expired, "Expired overdue charging sessions");
        }
        Ok(expired)
    }

    async fn find(&self, token: &str) -> SessionResult<ChargingSession> {
        self.repos
            .charging_sessions()
            .find_by_token(token)
            .await?
            .ok_or(SessionError::InvalidToken)
    }
}

/// `[start of day, start of next day)` around `now`, in UTC
fn local_day_bounds(now: DateTime<Local>) -> (DateTime<Utc>, DateTime<Utc>) {
    let midnight = |day: NaiveDate| {
        day.and_hms_opt(0, 0, 0)
            .and_then(|t| Local.from_local_datetime(&t).earliest())
    };
    let today = now.date_naive();
    let start = midnight(today).unwrap_or(now);
    let end = today
        .succ_opt()
        .and_then(midnight)
        .unwrap_or(start + Duration::days(1));
    (start.with_timezone(&Utc), end.with_timezone(&Utc))
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::domain::payment::NewPayment;
    use crate::infrastructure::storage::InMemoryRepositoryProvider;

    async fn setup() -> (SessionTokenManager, Arc<InMemoryRepositoryProvider>, i32) {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let payment = repos
            .payments()
            .record(NewPayment {
                user_id: Some(7),
                amount: 150.0,
                reference_number: Some("REF-1".into()),
            })
            .await
            .unwrap();
        let manager = SessionTokenManager::with_default_window(repos.clone());
        (manager, repos, payment.id)
    }

    #[tokio::test]
    async fn issue_returns_active_session_with_window() {
        let (manager, _, payment_id) = setup().await;
        let before = Utc::now();

        let issued = manager.issue(7, payment_id).await.unwrap();

        assert!(issued.status);
        assert_eq!(issued.user_id, 7);
        assert_eq!(issued.payment_id, payment_id);
        assert!(issued.token.starts_with("chg_"));
        assert!(issued.expires_at >= before + Duration::minutes(300));
        assert!(issued.expires_at <= Utc::now() + Duration::minutes(300));
    }

    #[tokio::test]
    async fn issue_rejects_unknown_payment_without_creating_a_row() {
        let (manager, repos, _) = setup().await;

        let err = manager.issue(7, 999_999).await.unwrap_err();
        assert!(matches!(err, SessionError::PaymentNotFound(999_999)));
        assert_eq!(
            repos.charging_sessions().count_by_payment(999_999).await.unwrap(),
            0
        );
        assert!(manager.list_today(7).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn tokens_do_not_repeat() {
        let (manager, _, payment_id) = setup().await;
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let issued = manager.issue(7, payment_id).await.unwrap();
            assert!(seen.insert(issued.token));
        }
    }

    #[tokio::test]
    async fn verify_unknown_token_is_invalid() {
        let (manager, _, _) = setup().await;
        assert!(matches!(
            manager.verify("chg_nope").await,
            Err(SessionError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn deactivate_twice_reports_zero_the_second_time() {
        let (manager, _, payment_id) = setup().await;
        manager.issue(7, payment_id).await.unwrap();

        assert_eq!(manager.deactivate(payment_id).await.unwrap(), 1);
        assert_eq!(manager.deactivate(payment_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn deactivate_without_sessions_is_not_found() {
        let (manager, _, payment_id) = setup().await;
        assert!(matches!(
            manager.deactivate(payment_id).await,
            Err(SessionError::SessionNotFound(id)) if id == payment_id
        ));
    }

    #[tokio::test]
    async fn verify_after_deactivate_reports_inactive() {
        let (manager, _, payment_id) = setup().await;
        let issued = manager.issue(7, payment_id).await.unwrap();

        assert!(manager.verify(&issued.token).await.unwrap().valid);
        manager.deactivate(payment_id).await.unwrap();

        let verdict = manager.verify(&issued.token).await.unwrap();
        assert!(!verdict.status);
        assert!(!verdict.valid);
        assert!(matches!(
            manager.authorize(&issued.token).await,
            Err(SessionError::SessionNotActive)
        ));
    }

    #[tokio::test]
    async fn expired_session_is_invalid_and_swept() {
        let (_, repos, payment_id) = setup().await;
        let manager = SessionTokenManager::new(repos.clone(), Duration::minutes(-1));
        let issued = manager.issue(7, payment_id).await.unwrap();

        let verdict = manager.verify(&issued.token).await.unwrap();
        assert!(verdict.status);
        assert!(verdict.expired);
        assert!(!verdict.valid);
        assert!(matches!(
            manager.authorize(&issued.token).await,
            Err(SessionError::SessionExpired)
        ));

        assert_eq!(manager.expire_overdue().await.unwrap(), 1);
        assert!(!manager.verify(&issued.token).await.unwrap().status);
        assert!(manager.list_active(7).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_helpers_filter_by_user() {
        let (manager, _, payment_id) = setup().await;
        manager.issue(7, payment_id).await.unwrap();
        manager.issue(7, payment_id).await.unwrap();
        manager.issue(8, payment_id).await.unwrap();

        assert_eq!(manager.list_today(7).await.unwrap().len(), 2);
        assert_eq!(manager.list_active(8).await.unwrap().len(), 1);
        assert!(manager.list_active(9).await.unwrap().is_empty());
    }

    #[test]
    fn day_bounds_cover_now() {
        let now = Local::now();
        let (from, to) = local_day_bounds(now);
        let now = now.with_timezone(&Utc);
        assert!(from <= now && now < to);
        assert!(to - from >= Duration::hours(23));
    }
}

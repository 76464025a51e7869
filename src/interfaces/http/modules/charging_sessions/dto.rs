//! Charging session DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::application::IssuedSession;
use crate::domain::{ChargingSession, SessionVerdict};

/// Body of `POST /api/v1/charging-sessions`
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct IssueSessionRequest {
    #[validate(range(min = 1, message = "user_id must be positive"))]
    pub user_id: i32,
    #[validate(range(min = 1, message = "payment_id must be positive"))]
    pub payment_id: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IssuedSessionResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user_id: i32,
    pub payment_id: i32,
    /// Always `true` for a freshly issued session
    pub status: bool,
}

impl From<IssuedSession> for IssuedSessionResponse {
    fn from(s: IssuedSession) -> Self {
        Self {
            token: s.token,
            expires_at: s.expires_at,
            user_id: s.user_id,
            payment_id: s.payment_id,
            status: s.status,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct VerifyQuery {
    /// Token returned by the issue call
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyResponse {
    pub valid: bool,
    /// Stored `active` flag
    pub status: bool,
    pub expired: bool,
    pub expires_at: DateTime<Utc>,
}

impl From<SessionVerdict> for VerifyResponse {
    fn from(v: SessionVerdict) -> Self {
        Self {
            valid: v.valid,
            status: v.status,
            expired: v.expired,
            expires_at: v.expires_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeactivateResponse {
    /// Sessions that were still active before the call
    pub affected_count: u64,
}

/// Which of a user's sessions to list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SessionScope {
    /// Created during the server's current local day
    #[default]
    Today,
    /// `active` flag still set
    Active,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListSessionsQuery {
    #[serde(default)]
    #[param(value_type = Option<String>, example = "today")]
    pub scope: SessionScope,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChargingSessionResponse {
    pub id: i32,
    pub user_id: i32,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub active: bool,
    pub payment_id: i32,
}

impl From<ChargingSession> for ChargingSessionResponse {
    fn from(s: ChargingSession) -> Self {
        Self {
            id: s.id,
            user_id: s.user_id,
            token: s.token,
            expires_at: s.expires_at,
            created_at: s.created_at,
            active: s.active,
            payment_id: s.payment_id,
        }
    }
}

use thiserror::Error;

/// Errors raised by repositories and other persistence-facing code.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for DomainError {
    fn from(e: sea_orm::DbErr) -> Self {
        DomainError::Database(e.to_string())
    }
}

/// Transport-level failures on a single socket.
///
/// These never propagate past the connection they happened on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("Device {0} is not connected")]
    DeviceNotConnected(String),

    #[error("Connection {0} lost")]
    ConnectionLost(String),
}

/// Failure modes of the charging-session token manager.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Payment {0} not found")]
    PaymentNotFound(i32),

    #[error("Invalid token")]
    InvalidToken,

    #[error("Session not active")]
    SessionNotActive,

    #[error("Session expired")]
    SessionExpired,

    #[error("No charging session references payment {0}")]
    SessionNotFound(i32),

    #[error(transparent)]
    Storage(#[from] DomainError),
}

impl SessionError {
    /// Whether the error denies access rather than reporting a missing record.
    pub fn is_access_denied(&self) -> bool {
        matches!(
            self,
            SessionError::InvalidToken | SessionError::SessionNotActive | SessionError::SessionExpired
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_err_maps_to_database_variant() {
        let err: DomainError = sea_orm::DbErr::Custom("boom".into()).into();
        assert!(matches!(err, DomainError::Database(ref msg) if msg.contains("boom")));
    }

    #[test]
    fn access_denial_classification() {
        assert!(SessionError::InvalidToken.is_access_denied());
        assert!(SessionError::SessionExpired.is_access_denied());
        assert!(!SessionError::PaymentNotFound(1).is_access_denied());
        assert!(!SessionError::SessionNotFound(1).is_access_denied());
    }
}

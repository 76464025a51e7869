//! Charging-session tokens: issuance, verification, closing and expiry

pub mod expiry;
pub mod manager;
pub mod token;

pub use expiry::start_session_expiry_task;
pub use manager::{
    IssuedSession, SessionResult, SessionTokenManager, SharedSessionTokenManager,
    DEFAULT_SESSION_WINDOW_MINUTES,
};
pub use token::{generate_session_token, TOKEN_PREFIX};

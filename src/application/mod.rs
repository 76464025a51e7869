//! Application layer: realtime hubs and charging-session management

pub mod charging_session;
pub mod hub;

pub use charging_session::{
    start_session_expiry_task, IssuedSession, SessionTokenManager, SharedSessionTokenManager,
};
pub use hub::{
    ConnectionHandle, ConnectionRegistry, Hub, HubDirectory, HubProfile, HubStatus,
    SharedHub, SharedHubDirectory,
};

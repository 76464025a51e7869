pub mod charging_sessions;
pub mod health;
pub mod hubs;
pub mod metrics;

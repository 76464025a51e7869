//! # Charging Gateway
//!
//! Realtime bridge between EV chargers / field hardware and dashboards,
//! plus the charging-session tokens that gate who may charge.
//!
//! ## Architecture
//!
//! - **domain**: wire frames, persisted aggregates and repository ports
//! - **application**: hubs (registry, dispatcher, relay) and the session token manager
//! - **infrastructure**: SeaORM persistence and the in-memory store
//! - **interfaces**: the device/dashboard socket listener and the REST API
//! - **server**: runtime wiring shared by the CLI and the integration tests

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig};

// Re-export database types for easy access
pub use infrastructure::{init_database, run_migrations, DatabaseConfig};

// Re-export API router
pub use interfaces::create_api_router;

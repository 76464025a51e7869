//! Database repository implementations
//!
//! Per-aggregate SeaORM repositories + unified RepositoryProvider.

pub mod charging_session_repository;
pub mod payment_repository;
pub mod repository_provider;

pub use repository_provider::SeaOrmRepositoryProvider;

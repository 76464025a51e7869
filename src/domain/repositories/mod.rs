//! Repository traits for the domain layer
//!
//! Contains:
//! - `RepositoryProvider` — unified access to all per-aggregate repositories
//! - `DomainResult` — standard result type for domain operations

use super::charging_session::ChargingSessionRepository;
use super::payment::PaymentRepository;
use crate::shared::errors::DomainError;

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

// ── RepositoryProvider ──────────────────────────────────────────

/// Provides access to all domain repositories.
///
/// ```ignore
/// async fn handle(repos: &dyn RepositoryProvider) {
///     let known = repos.payments().exists(42).await?;
///     let session = repos.charging_sessions().find_by_token(token).await?;
/// }
/// ```
pub trait RepositoryProvider: Send + Sync {
    fn charging_sessions(&self) -> &dyn ChargingSessionRepository;
    fn payments(&self) -> &dyn PaymentRepository;
}

//! SeaORM implementation of RepositoryProvider

use sea_orm::DatabaseConnection;

use crate::domain::charging_session::ChargingSessionRepository;
use crate::domain::payment::PaymentRepository;
use crate::domain::repositories::RepositoryProvider;

use super::charging_session_repository::SeaOrmChargingSessionRepository;
use super::payment_repository::SeaOrmPaymentRepository;

/// Repository provider backed by one SeaORM connection pool.
///
/// ```ignore
/// let repos = SeaOrmRepositoryProvider::new(db.clone());
/// let session = repos.charging_sessions().find_by_token(token).await?;
/// ```
pub struct SeaOrmRepositoryProvider {
    charging_sessions: SeaOrmChargingSessionRepository,
    payments: SeaOrmPaymentRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            charging_sessions: SeaOrmChargingSessionRepository::new(db.clone()),
            payments: SeaOrmPaymentRepository::new(db),
        }
    }
}

impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn charging_sessions(&self) -> &dyn ChargingSessionRepository {
        &self.charging_sessions
    }

    fn payments(&self) -> &dyn PaymentRepository {
        &self.payments
    }
}

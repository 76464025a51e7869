//! Payment repository interface

use async_trait::async_trait;

use super::model::{NewPayment, Payment};
use crate::domain::DomainResult;

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn exists(&self, payment_id: i32) -> DomainResult<bool>;

    /// Record a payment. Normally done by the payment subsystem; exposed for
    /// seeding and tests.
    async fn record(&self, payment: NewPayment) -> DomainResult<Payment>;
}

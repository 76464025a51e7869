//! SeaORM implementation of PaymentRepository

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, Set};

use crate::domain::payment::{NewPayment, Payment, PaymentRepository};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::payment;

pub struct SeaOrmPaymentRepository {
    db: DatabaseConnection,
}

impl SeaOrmPaymentRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: payment::Model) -> Payment {
    Payment {
        id: m.id,
        user_id: m.user_id,
        amount: m.amount,
        reference_number: m.reference_number,
        created_at: m.created_at,
    }
}

#[async_trait]
impl PaymentRepository for SeaOrmPaymentRepository {
    async fn exists(&self, payment_id: i32) -> DomainResult<bool> {
        let count = payment::Entity::find_by_id(payment_id)
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn record(&self, p: NewPayment) -> DomainResult<Payment> {
        let model = payment::ActiveModel {
            user_id: Set(p.user_id),
            amount: Set(p.amount),
            reference_number: Set(p.reference_number),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        let saved = model.insert(&self.db).await?;
        Ok(model_to_domain(saved))
    }
}

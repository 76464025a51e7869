//! SeaORM implementation of ChargingSessionRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, SqlErr,
};
use tracing::debug;

use crate::domain::charging_session::{
    ChargingSession, ChargingSessionRepository, NewChargingSession,
};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::charging_session;

pub struct SeaOrmChargingSessionRepository {
    db: DatabaseConnection,
}

impl SeaOrmChargingSessionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: charging_session::Model) -> ChargingSession {
    ChargingSession {
        id: m.id,
        user_id: m.user_id,
        token: m.token,
        expires_at: m.expires_at,
        created_at: m.created_at,
        active: m.active,
        payment_id: m.payment_id,
    }
}

fn insert_err(e: sea_orm::DbErr) -> DomainError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            DomainError::Conflict(format!("charging session token: {}", detail))
        }
        _ => DomainError::from(e),
    }
}

// ── ChargingSessionRepository impl ──────────────────────────────

#[async_trait]
impl ChargingSessionRepository for SeaOrmChargingSessionRepository {
    async fn insert(&self, s: NewChargingSession) -> DomainResult<ChargingSession> {
        debug!(user_id = s.user_id, payment_id = s.payment_id, "Inserting charging session");

        let model = charging_session::ActiveModel {
            user_id: Set(s.user_id),
            token: Set(s.token),
            expires_at: Set(s.expires_at),
            created_at: Set(s.created_at),
            active: Set(true),
            payment_id: Set(s.payment_id),
            ..Default::default()
        };
        let saved = model.insert(&self.db).await.map_err(insert_err)?;
        Ok(model_to_domain(saved))
    }

    async fn find_by_token(&self, token: &str) -> DomainResult<Option<ChargingSession>> {
        let model = charging_session::Entity::find()
            .filter(charging_session::Column::Token.eq(token))
            .one(&self.db)
            .await?;
        Ok(model.map(model_to_domain))
    }

    async fn count_by_payment(&self, payment_id: i32) -> DomainResult<u64> {
        Ok(charging_session::Entity::find()
            .filter(charging_session::Column::PaymentId.eq(payment_id))
            .count(&self.db)
            .await?)
    }

    async fn deactivate_by_payment(&self, payment_id: i32) -> DomainResult<u64> {
        let result = charging_session::Entity::update_many()
            .col_expr(charging_session::Column::Active, Expr::value(false))
            .filter(charging_session::Column::PaymentId.eq(payment_id))
            .filter(charging_session::Column::Active.eq(true))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    async fn find_by_user_created_between(
        &self,
        user_id: i32,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Vec<ChargingSession>> {
        let models = charging_session::Entity::find()
            .filter(charging_session::Column::UserId.eq(user_id))
            .filter(charging_session::Column::CreatedAt.gte(from))
            .filter(charging_session::Column::CreatedAt.lt(to))
            .order_by_desc(charging_session::Column::CreatedAt)
            .order_by_desc(charging_session::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn find_active_by_user(&self, user_id: i32) -> DomainResult<Vec<ChargingSession>> {
        let models = charging_session::Entity::find()
            .filter(charging_session::Column::UserId.eq(user_id))
            .filter(charging_session::Column::Active.eq(true))
            .order_by_desc(charging_session::Column::CreatedAt)
            .order_by_desc(charging_session::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn deactivate_expired(&self, now: DateTime<Utc>) -> DomainResult<u64> {
        let result = charging_session::Entity::update_many()
            .col_expr(charging_session::Column::Active, Expr::value(false))
            .filter(charging_session::Column::Active.eq(true))
            .filter(charging_session::Column::ExpiresAt.lt(now))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }
}

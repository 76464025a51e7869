//! Payment entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Payment record written by the payment subsystem
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(nullable)]
    pub user_id: Option<i32>,

    pub amount: f64,

    #[sea_orm(nullable)]
    pub reference_number: Option<String>,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::charging_session::Entity")]
    ChargingSessions,
}

impl Related<super::charging_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChargingSessions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Database migrations module

pub use sea_orm_migration::prelude::*;

mod m20251101_000001_create_payments;
mod m20251101_000002_create_charging_sessions;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251101_000001_create_payments::Migration),
            Box::new(m20251101_000002_create_charging_sessions::Migration),
        ]
    }
}

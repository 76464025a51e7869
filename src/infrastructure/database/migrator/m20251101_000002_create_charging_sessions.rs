//! Create charging_sessions table

use sea_orm_migration::prelude::*;

use super::m20251101_000001_create_payments::Payments;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ChargingSessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChargingSessions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ChargingSessions::UserId).integer().not_null())
                    .col(
                        ColumnDef::new(ChargingSessions::Token)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChargingSessions::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChargingSessions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChargingSessions::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(ChargingSessions::PaymentId)
                            .integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_charging_sessions_payment")
                            .from(ChargingSessions::Table, ChargingSessions::PaymentId)
                            .to(Payments::Table, Payments::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_charging_sessions_token")
                    .table(ChargingSessions::Table)
                    .col(ChargingSessions::Token)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_charging_sessions_payment_id")
                    .table(ChargingSessions::Table)
                    .col(ChargingSessions::PaymentId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_charging_sessions_user_created")
                    .table(ChargingSessions::Table)
                    .col(ChargingSessions::UserId)
                    .col(ChargingSessions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChargingSessions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ChargingSessions {
    Table,
    Id,
    UserId,
    Token,
    ExpiresAt,
    CreatedAt,
    Active,
    PaymentId,
}

//! Create `system_config` key/value table and `processed_webhook_event` dedup table.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SystemConfig::Table)
                    .if_not_exists()
                    .col(string_len(SystemConfig::Key, 128).primary_key())
                    .col(json_binary(SystemConfig::Value).not_null())
                    .col(string_len_null(SystemConfig::Description, 255))
                    .col(uuid_null(SystemConfig::UpdatedBy))
                    .col(timestamp_with_time_zone(SystemConfig::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProcessedWebhookEvent::Table)
                    .if_not_exists()
                    .col(string_len(ProcessedWebhookEvent::EventId, 255).primary_key())
                    .col(string_len(ProcessedWebhookEvent::EventType, 128).not_null())
                    .col(timestamp_with_time_zone(ProcessedWebhookEvent::ProcessedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ProcessedWebhookEvent::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(SystemConfig::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum SystemConfig { Table, Key, Value, Description, UpdatedBy, UpdatedAt }

#[derive(DeriveIden)]
enum ProcessedWebhookEvent { Table, EventId, EventType, ProcessedAt }

//! Create `admin_audit_log` table. Rows are append-only.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AdminAuditLog::Table)
                    .if_not_exists()
                    .col(uuid(AdminAuditLog::Id).primary_key())
                    .col(uuid(AdminAuditLog::AdminId).not_null())
                    .col(string_len(AdminAuditLog::Action, 64).not_null())
                    .col(string_len(AdminAuditLog::EntityType, 64).not_null())
                    .col(uuid_null(AdminAuditLog::EntityId))
                    .col(json_binary_null(AdminAuditLog::Details))
                    .col(string_len_null(AdminAuditLog::IpAddress, 64))
                    .col(timestamp_with_time_zone(AdminAuditLog::CreatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_audit_admin")
                            .from(AdminAuditLog::Table, AdminAuditLog::AdminId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(AdminAuditLog::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum AdminAuditLog { Table, Id, AdminId, Action, EntityType, EntityId, Details, IpAddress, CreatedAt }

#[derive(DeriveIden)]
enum User { Table, Id }

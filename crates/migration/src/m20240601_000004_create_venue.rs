//! Create `venue` table with FK to the owning `user`.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Venue::Table)
                    .if_not_exists()
                    .col(uuid(Venue::Id).primary_key())
                    .col(uuid(Venue::OwnerId).not_null())
                    .col(string_len(Venue::Name, 160).not_null())
                    .col(text_null(Venue::Description))
                    .col(string_len(Venue::VenueType, 32).not_null())
                    .col(string_len(Venue::Address, 255).not_null())
                    .col(string_len(Venue::City, 120).not_null())
                    .col(string_len(Venue::Country, 120).not_null())
                    .col(string_len_null(Venue::Phone, 32))
                    .col(string_len_null(Venue::Email, 255))
                    .col(boolean(Venue::IsActive).not_null().default(true))
                    .col(timestamp_with_time_zone(Venue::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Venue::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_venue_owner")
                            .from(Venue::Table, Venue::OwnerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Venue::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Venue {
    Table,
    Id,
    OwnerId,
    Name,
    Description,
    VenueType,
    Address,
    City,
    Country,
    Phone,
    Email,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum User { Table, Id }

//! Create `service` table: bookable offerings of a venue.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Service::Table)
                    .if_not_exists()
                    .col(uuid(Service::Id).primary_key())
                    .col(uuid(Service::VenueId).not_null())
                    .col(string_len(Service::Name, 160).not_null())
                    .col(text_null(Service::Description))
                    .col(string_len(Service::PricingUnit, 32).not_null())
                    .col(big_integer(Service::PriceCents).not_null())
                    .col(string_len(Service::Currency, 3).not_null())
                    .col(integer(Service::Capacity).not_null())
                    .col(integer(Service::Inventory).not_null())
                    .col(boolean(Service::IsActive).not_null().default(true))
                    .col(timestamp_with_time_zone(Service::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Service::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_service_venue")
                            .from(Service::Table, Service::VenueId)
                            .to(Venue::Table, Venue::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Service::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Service {
    Table,
    Id,
    VenueId,
    Name,
    Description,
    PricingUnit,
    PriceCents,
    Currency,
    Capacity,
    Inventory,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Venue { Table, Id }

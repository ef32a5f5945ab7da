//! Create `reservation` table.
//!
//! Date range is half-open `[check_in, check_out)`; `venue_id` is denormalized for listing.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Reservation::Table)
                    .if_not_exists()
                    .col(uuid(Reservation::Id).primary_key())
                    .col(uuid(Reservation::UserId).not_null())
                    .col(uuid(Reservation::ServiceId).not_null())
                    .col(uuid(Reservation::VenueId).not_null())
                    .col(date(Reservation::CheckIn).not_null())
                    .col(date(Reservation::CheckOut).not_null())
                    .col(integer(Reservation::Guests).not_null())
                    .col(string_len(Reservation::Status, 32).not_null())
                    .col(big_integer(Reservation::TotalAmountCents).not_null())
                    .col(string_len(Reservation::Currency, 3).not_null())
                    .col(text_null(Reservation::SpecialRequests))
                    .col(text_null(Reservation::CancellationReason))
                    .col(timestamp_with_time_zone_null(Reservation::CancelledAt))
                    .col(timestamp_with_time_zone(Reservation::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Reservation::UpdatedAt).not_null())
                    .check(Expr::col(Reservation::CheckOut).gt(Expr::col(Reservation::CheckIn)))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reservation_user")
                            .from(Reservation::Table, Reservation::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reservation_service")
                            .from(Reservation::Table, Reservation::ServiceId)
                            .to(Service::Table, Service::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reservation_venue")
                            .from(Reservation::Table, Reservation::VenueId)
                            .to(Venue::Table, Venue::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Reservation::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Reservation {
    Table,
    Id,
    UserId,
    ServiceId,
    VenueId,
    CheckIn,
    CheckOut,
    Guests,
    Status,
    TotalAmountCents,
    Currency,
    SpecialRequests,
    CancellationReason,
    CancelledAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum User { Table, Id }

#[derive(DeriveIden)]
enum Service { Table, Id }

#[derive(DeriveIden)]
enum Venue { Table, Id }

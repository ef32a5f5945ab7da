use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Venue: listing filters
        manager
            .create_index(
                Index::create()
                    .name("idx_venue_city_type")
                    .table(Venue::Table)
                    .col(Venue::City)
                    .col(Venue::VenueType)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_venue_owner")
                    .table(Venue::Table)
                    .col(Venue::OwnerId)
                    .to_owned(),
            )
            .await?;

        // Service: by venue
        manager
            .create_index(
                Index::create()
                    .name("idx_service_venue")
                    .table(Service::Table)
                    .col(Service::VenueId)
                    .to_owned(),
            )
            .await?;

        // Reservation: availability lookup scans (service_id, check_in, check_out)
        manager
            .create_index(
                Index::create()
                    .name("idx_reservation_service_dates")
                    .table(Reservation::Table)
                    .col(Reservation::ServiceId)
                    .col(Reservation::CheckIn)
                    .col(Reservation::CheckOut)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reservation_user")
                    .table(Reservation::Table)
                    .col(Reservation::UserId)
                    .to_owned(),
            )
            .await?;

        // Payment: admin listing by status and time
        manager
            .create_index(
                Index::create()
                    .name("idx_payment_status_created")
                    .table(Payment::Table)
                    .col(Payment::Status)
                    .col(Payment::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_payment_provider_id")
                    .table(Payment::Table)
                    .col(Payment::ProviderPaymentId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Review: by venue
        manager
            .create_index(
                Index::create()
                    .name("idx_review_venue")
                    .table(Review::Table)
                    .col(Review::VenueId)
                    .to_owned(),
            )
            .await?;

        // AuditLog: by admin and time
        manager
            .create_index(
                Index::create()
                    .name("idx_audit_admin_created")
                    .table(AdminAuditLog::Table)
                    .col(AdminAuditLog::AdminId)
                    .col(AdminAuditLog::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_index(Index::drop().name("idx_audit_admin_created").table(AdminAuditLog::Table).to_owned()).await?;
        manager.drop_index(Index::drop().name("idx_review_venue").table(Review::Table).to_owned()).await?;
        manager.drop_index(Index::drop().name("idx_payment_provider_id").table(Payment::Table).to_owned()).await?;
        manager.drop_index(Index::drop().name("idx_payment_status_created").table(Payment::Table).to_owned()).await?;
        manager.drop_index(Index::drop().name("idx_reservation_user").table(Reservation::Table).to_owned()).await?;
        manager.drop_index(Index::drop().name("idx_reservation_service_dates").table(Reservation::Table).to_owned()).await?;
        manager.drop_index(Index::drop().name("idx_service_venue").table(Service::Table).to_owned()).await?;
        manager.drop_index(Index::drop().name("idx_venue_owner").table(Venue::Table).to_owned()).await?;
        manager.drop_index(Index::drop().name("idx_venue_city_type").table(Venue::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Venue { Table, City, VenueType, OwnerId }

#[derive(DeriveIden)]
enum Service { Table, VenueId }

#[derive(DeriveIden)]
enum Reservation { Table, ServiceId, CheckIn, CheckOut, UserId }

#[derive(DeriveIden)]
enum Payment { Table, Status, CreatedAt, ProviderPaymentId }

#[derive(DeriveIden)]
enum Review { Table, VenueId }

#[derive(DeriveIden)]
enum AdminAuditLog { Table, AdminId, CreatedAt }

//! Create `payment` table; one payment per reservation.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Payment::Table)
                    .if_not_exists()
                    .col(uuid(Payment::Id).primary_key())
                    .col(uuid(Payment::ReservationId).unique_key().not_null())
                    .col(uuid(Payment::UserId).not_null())
                    .col(big_integer(Payment::AmountCents).not_null())
                    .col(big_integer(Payment::RefundedAmountCents).not_null().default(0))
                    .col(string_len(Payment::Currency, 3).not_null())
                    .col(string_len(Payment::Status, 32).not_null())
                    .col(string_len(Payment::Provider, 32).not_null())
                    .col(string_len_null(Payment::ProviderPaymentId, 255))
                    .col(string_len_null(Payment::ProviderRefundId, 255))
                    .col(text_null(Payment::FailureReason))
                    .col(timestamp_with_time_zone(Payment::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Payment::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_reservation")
                            .from(Payment::Table, Payment::ReservationId)
                            .to(Reservation::Table, Reservation::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_user")
                            .from(Payment::Table, Payment::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Payment::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Payment {
    Table,
    Id,
    ReservationId,
    UserId,
    AmountCents,
    RefundedAmountCents,
    Currency,
    Status,
    Provider,
    ProviderPaymentId,
    ProviderRefundId,
    FailureReason,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Reservation { Table, Id }

#[derive(DeriveIden)]
enum User { Table, Id }

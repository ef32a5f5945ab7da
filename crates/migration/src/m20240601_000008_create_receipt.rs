//! Create `receipt` table; one receipt per completed payment.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Receipt::Table)
                    .if_not_exists()
                    .col(uuid(Receipt::Id).primary_key())
                    .col(uuid(Receipt::PaymentId).unique_key().not_null())
                    .col(string_len(Receipt::ReceiptNumber, 32).unique_key().not_null())
                    .col(big_integer(Receipt::AmountCents).not_null())
                    .col(string_len(Receipt::Currency, 3).not_null())
                    .col(timestamp_with_time_zone(Receipt::IssuedAt).not_null())
                    .col(boolean(Receipt::Verified).not_null().default(false))
                    .col(timestamp_with_time_zone_null(Receipt::VerifiedAt))
                    .col(uuid_null(Receipt::VerifiedBy))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_receipt_payment")
                            .from(Receipt::Table, Receipt::PaymentId)
                            .to(Payment::Table, Payment::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Receipt::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Receipt {
    Table,
    Id,
    PaymentId,
    ReceiptNumber,
    AmountCents,
    Currency,
    IssuedAt,
    Verified,
    VerifiedAt,
    VerifiedBy,
}

#[derive(DeriveIden)]
enum Payment { Table, Id }

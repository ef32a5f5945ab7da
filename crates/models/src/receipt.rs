use sea_orm::entity::prelude::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::payment;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "receipt")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub payment_id: Uuid,
    #[sea_orm(unique)]
    pub receipt_number: String,
    pub amount_cents: i64,
    pub currency: String,
    pub issued_at: DateTimeWithTimeZone,
    pub verified: bool,
    pub verified_at: Option<DateTimeWithTimeZone>,
    pub verified_by: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Payment,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Payment => Entity::belongs_to(payment::Entity)
                .from(Column::PaymentId)
                .to(payment::Column::Id)
                .into(),
        }
    }
}

impl Related<payment::Entity> for Entity {
    fn to() -> RelationDef { Relation::Payment.def() }
}

impl ActiveModelBehavior for ActiveModel {}

/// `RCP-YYYYMMDD-XXXXXXXX`, suffix taken from the payment id.
pub fn receipt_number(payment_id: Uuid, issued_at: DateTime<Utc>) -> String {
    let simple = payment_id.simple().to_string().to_ascii_uppercase();
    format!("RCP-{}-{}", issued_at.format("%Y%m%d"), &simple[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn number_format() {
        let id = Uuid::parse_str("1a2b3c4d-0000-0000-0000-000000000000").unwrap();
        let at = Utc.with_ymd_and_hms(2030, 2, 9, 10, 0, 0).unwrap();
        assert_eq!(receipt_number(id, at), "RCP-20300209-1A2B3C4D");
    }
}

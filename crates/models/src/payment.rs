use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::status::PaymentStatus;
use crate::{reservation, user};

pub const PROVIDER_STRIPE: &str = "stripe";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub reservation_id: Uuid,
    pub user_id: Uuid,
    pub amount_cents: i64,
    pub refunded_amount_cents: i64,
    pub currency: String,
    pub status: String,
    pub provider: String,
    /// Gateway payment-intent id.
    pub provider_payment_id: Option<String>,
    pub provider_refund_id: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub failure_reason: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Reservation,
    User,
    Receipt,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Reservation => Entity::belongs_to(reservation::Entity)
                .from(Column::ReservationId)
                .to(reservation::Column::Id)
                .into(),
            Relation::User => Entity::belongs_to(user::Entity)
                .from(Column::UserId)
                .to(user::Column::Id)
                .into(),
            Relation::Receipt => Entity::has_one(crate::receipt::Entity).into(),
        }
    }
}

impl Related<reservation::Entity> for Entity {
    fn to() -> RelationDef { Relation::Reservation.def() }
}

impl Related<user::Entity> for Entity {
    fn to() -> RelationDef { Relation::User.def() }
}

impl Related<crate::receipt::Entity> for Entity {
    fn to() -> RelationDef { Relation::Receipt.def() }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn status(&self) -> Result<PaymentStatus, ModelError> { self.status.parse() }

    /// Amount that can still be refunded.
    pub fn refundable_cents(&self) -> i64 {
        (self.amount_cents - self.refunded_amount_cents).max(0)
    }
}

/// Validate a requested refund; `None` means the remaining balance.
pub fn resolve_refund_amount(payment: &Model, requested: Option<i64>) -> Result<i64, ModelError> {
    let remaining = payment.refundable_cents();
    let amount = requested.unwrap_or(remaining);
    if amount <= 0 {
        return Err(ModelError::validation("refund amount must be positive"));
    }
    if amount > remaining {
        return Err(ModelError::validation(format!("refund amount exceeds refundable balance ({remaining})")));
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn paid(amount: i64, refunded: i64) -> Model {
        let now = Utc::now().into();
        Model {
            id: Uuid::new_v4(),
            reservation_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            amount_cents: amount,
            refunded_amount_cents: refunded,
            currency: "usd".into(),
            status: PaymentStatus::Completed.to_string(),
            provider: PROVIDER_STRIPE.into(),
            provider_payment_id: Some("pi_1".into()),
            provider_refund_id: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn full_refund_by_default() {
        assert_eq!(resolve_refund_amount(&paid(5000, 0), None).unwrap(), 5000);
        assert_eq!(resolve_refund_amount(&paid(5000, 2000), None).unwrap(), 3000);
    }

    #[test]
    fn refund_bounds() {
        let p = paid(5000, 1000);
        assert!(resolve_refund_amount(&p, Some(0)).is_err());
        assert!(resolve_refund_amount(&p, Some(4001)).is_err());
        assert_eq!(resolve_refund_amount(&p, Some(4000)).unwrap(), 4000);
        assert!(resolve_refund_amount(&paid(5000, 5000), None).is_err());
    }
}

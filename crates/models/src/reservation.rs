use sea_orm::entity::prelude::*;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::status::ReservationStatus;
use crate::{service, user, venue};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reservation")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub service_id: Uuid,
    /// Denormalized from the service so venue-level queries skip a join.
    pub venue_id: Uuid,
    pub check_in: Date,
    pub check_out: Date,
    pub guests: i32,
    pub status: String,
    pub total_amount_cents: i64,
    pub currency: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub special_requests: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    User,
    Service,
    Venue,
    Payment,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::User => Entity::belongs_to(user::Entity)
                .from(Column::UserId)
                .to(user::Column::Id)
                .into(),
            Relation::Service => Entity::belongs_to(service::Entity)
                .from(Column::ServiceId)
                .to(service::Column::Id)
                .into(),
            Relation::Venue => Entity::belongs_to(venue::Entity)
                .from(Column::VenueId)
                .to(venue::Column::Id)
                .into(),
            Relation::Payment => Entity::has_one(crate::payment::Entity).into(),
        }
    }
}

impl Related<user::Entity> for Entity {
    fn to() -> RelationDef { Relation::User.def() }
}

impl Related<service::Entity> for Entity {
    fn to() -> RelationDef { Relation::Service.def() }
}

impl Related<venue::Entity> for Entity {
    fn to() -> RelationDef { Relation::Venue.def() }
}

impl Related<crate::payment::Entity> for Entity {
    fn to() -> RelationDef { Relation::Payment.def() }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn status(&self) -> Result<ReservationStatus, ModelError> { self.status.parse() }

    pub fn nights(&self) -> i64 { nights_between(self.check_in, self.check_out) }
}

/// Whole nights between two dates, never less than one.
pub fn nights_between(check_in: NaiveDate, check_out: NaiveDate) -> i64 {
    (check_out - check_in).num_days().max(1)
}

pub fn validate_dates(check_in: NaiveDate, check_out: NaiveDate, today: NaiveDate) -> Result<(), ModelError> {
    if check_out <= check_in {
        return Err(ModelError::validation("checkOut must be after checkIn"));
    }
    if check_in < today {
        return Err(ModelError::validation("checkIn cannot be in the past"));
    }
    Ok(())
}

pub fn validate_guests(guests: i32, capacity: i32) -> Result<(), ModelError> {
    if guests < 1 {
        return Err(ModelError::validation("guests must be >= 1"));
    }
    if guests > capacity {
        return Err(ModelError::validation(format!("guests exceed capacity ({capacity})")));
    }
    Ok(())
}

/// Half-open `[check_in, check_out)` overlap test.
pub fn overlaps(a_in: NaiveDate, a_out: NaiveDate, b_in: NaiveDate, b_out: NaiveDate) -> bool {
    a_in < b_out && b_in < a_out
}

/// Most stays occupying any single night of `[check_in, check_out)`.
pub fn peak_occupancy(stays: &[(NaiveDate, NaiveDate)], check_in: NaiveDate, check_out: NaiveDate) -> u64 {
    check_in
        .iter_days()
        .take_while(|night| *night < check_out)
        .map(|night| {
            let next = night.succ_opt().unwrap_or(night);
            stays.iter().filter(|(s_in, s_out)| overlaps(night, next, *s_in, *s_out)).count() as u64
        })
        .max()
        .unwrap_or(0)
}

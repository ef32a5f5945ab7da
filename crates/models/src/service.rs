//! A bookable offering of a venue (room type, table, treatment, tour slot).

use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, Set};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::status::PricingUnit;
use crate::venue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "service")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub venue_id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub pricing_unit: String,
    pub price_cents: i64,
    pub currency: String,
    /// Max guests per booking.
    pub capacity: i32,
    /// Units bookable for the same dates.
    pub inventory: i32,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Venue,
    Reservation,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Venue => Entity::belongs_to(venue::Entity)
                .from(Column::VenueId)
                .to(venue::Column::Id)
                .into(),
            Relation::Reservation => Entity::has_many(crate::reservation::Entity).into(),
        }
    }
}

impl Related<venue::Entity> for Entity {
    fn to() -> RelationDef { Relation::Venue.def() }
}

impl Related<crate::reservation::Entity> for Entity {
    fn to() -> RelationDef { Relation::Reservation.def() }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn pricing(&self) -> Result<PricingUnit, ModelError> { self.pricing_unit.parse() }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewService {
    pub name: String,
    pub description: Option<String>,
    pub pricing_unit: PricingUnit,
    pub price_cents: i64,
    pub currency: Option<String>,
    pub capacity: i32,
    #[serde(default = "default_inventory")]
    pub inventory: i32,
}

fn default_inventory() -> i32 { 1 }

pub fn validate_price(price_cents: i64) -> Result<(), ModelError> {
    if price_cents < 0 { return Err(ModelError::validation("price must be >= 0")); }
    Ok(())
}

pub fn validate_capacity(capacity: i32) -> Result<(), ModelError> {
    if capacity < 1 { return Err(ModelError::validation("capacity must be >= 1")); }
    Ok(())
}

pub fn validate_inventory(inventory: i32) -> Result<(), ModelError> {
    if inventory < 1 { return Err(ModelError::validation("inventory must be >= 1")); }
    Ok(())
}

/// ISO-4217 style three-letter code, stored lower-case.
pub fn normalize_currency(currency: &str) -> Result<String, ModelError> {
    let c = currency.trim().to_ascii_lowercase();
    if c.len() != 3 || !c.chars().all(|ch| ch.is_ascii_alphabetic()) {
        return Err(ModelError::validation("currency must be a 3-letter code"));
    }
    Ok(c)
}

pub fn validate(input: &NewService) -> Result<(), ModelError> {
    if input.name.trim().is_empty() { return Err(ModelError::validation("service name required")); }
    validate_price(input.price_cents)?;
    validate_capacity(input.capacity)?;
    validate_inventory(input.inventory)
}

pub async fn create<C: ConnectionTrait>(
    db: &C,
    venue_id: Uuid,
    input: NewService,
    default_currency: &str,
) -> Result<Model, ModelError> {
    validate(&input)?;
    let currency = normalize_currency(input.currency.as_deref().unwrap_or(default_currency))?;
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        venue_id: Set(venue_id),
        name: Set(input.name.trim().to_string()),
        description: Set(input.description),
        pricing_unit: Set(input.pricing_unit.as_str().to_string()),
        price_cents: Set(input.price_cents),
        currency: Set(currency),
        capacity: Set(input.capacity),
        inventory: Set(input.inventory),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(am.insert(db).await?)
}

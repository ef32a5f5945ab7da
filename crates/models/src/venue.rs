use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, Set};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::status::VenueType;
use crate::user;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "venue")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub venue_type: String,
    pub address: String,
    pub city: String,
    pub country: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Owner,
    Service,
    Review,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Owner => Entity::belongs_to(user::Entity)
                .from(Column::OwnerId)
                .to(user::Column::Id)
                .into(),
            Relation::Service => Entity::has_many(crate::service::Entity).into(),
            Relation::Review => Entity::has_many(crate::review::Entity).into(),
        }
    }
}

impl Related<user::Entity> for Entity {
    fn to() -> RelationDef { Relation::Owner.def() }
}

impl Related<crate::service::Entity> for Entity {
    fn to() -> RelationDef { Relation::Service.def() }
}

impl Related<crate::review::Entity> for Entity {
    fn to() -> RelationDef { Relation::Review.def() }
}

impl ActiveModelBehavior for ActiveModel {}

/// Fields accepted when creating a venue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVenue {
    pub name: String,
    pub description: Option<String>,
    pub venue_type: VenueType,
    pub address: String,
    pub city: String,
    pub country: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

pub fn validate_name(name: &str) -> Result<(), ModelError> {
    if name.trim().is_empty() { return Err(ModelError::validation("venue name required")); }
    if name.len() > 160 { return Err(ModelError::validation("venue name too long (<=160)")); }
    Ok(())
}

pub fn validate_location(address: &str, city: &str, country: &str) -> Result<(), ModelError> {
    if address.trim().is_empty() { return Err(ModelError::validation("address required")); }
    if city.trim().is_empty() { return Err(ModelError::validation("city required")); }
    if country.trim().is_empty() { return Err(ModelError::validation("country required")); }
    Ok(())
}

pub fn validate_contact_email(email: Option<&str>) -> Result<(), ModelError> {
    match email {
        Some(e) => user::validate_email(e),
        None => Ok(()),
    }
}

pub fn validate(input: &NewVenue) -> Result<(), ModelError> {
    validate_name(&input.name)?;
    validate_location(&input.address, &input.city, &input.country)?;
    validate_contact_email(input.email.as_deref())
}

pub async fn create<C: ConnectionTrait>(db: &C, owner_id: Uuid, input: NewVenue) -> Result<Model, ModelError> {
    validate(&input)?;
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        owner_id: Set(owner_id),
        name: Set(input.name.trim().to_string()),
        description: Set(input.description),
        venue_type: Set(input.venue_type.as_str().to_string()),
        address: Set(input.address.trim().to_string()),
        city: Set(input.city.trim().to_string()),
        country: Set(input.country.trim().to_string()),
        phone: Set(input.phone),
        email: Set(input.email),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(am.insert(db).await?)
}

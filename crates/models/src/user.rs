use sea_orm::{entity::prelude::*, ConnectionTrait, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::status::RoleName;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Credentials,
    Venue,
    Reservation,
    Payment,
    Review,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Credentials => Entity::has_one(crate::user_credentials::Entity).into(),
            Relation::Venue => Entity::has_many(crate::venue::Entity).into(),
            Relation::Reservation => Entity::has_many(crate::reservation::Entity).into(),
            Relation::Payment => Entity::has_many(crate::payment::Entity).into(),
            Relation::Review => Entity::has_many(crate::review::Entity).into(),
        }
    }
}

impl Related<crate::venue::Entity> for Entity {
    fn to() -> RelationDef { Relation::Venue.def() }
}

impl Related<crate::reservation::Entity> for Entity {
    fn to() -> RelationDef { Relation::Reservation.def() }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn role_name(&self) -> Option<RoleName> { self.role.parse().ok() }

    pub fn is_admin(&self) -> bool { self.role_name() == Some(RoleName::Admin) }
}

pub fn validate_email(email: &str) -> Result<(), ModelError> {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ModelError::validation("invalid email"));
    };
    if local.is_empty() || !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(ModelError::validation("invalid email"));
    }
    if email.len() > 255 {
        return Err(ModelError::validation("email too long (<=255)"));
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), ModelError> {
    if name.trim().is_empty() { return Err(ModelError::validation("name required")); }
    if name.len() > 128 { return Err(ModelError::validation("name too long (<=128)")); }
    Ok(())
}

pub fn normalize_email(email: &str) -> String { email.trim().to_ascii_lowercase() }

pub async fn create<C: ConnectionTrait>(
    db: &C,
    email: &str,
    name: &str,
    phone: Option<String>,
    role: RoleName,
) -> Result<Model, ModelError> {
    validate_email(email)?;
    validate_name(name)?;
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(normalize_email(email)),
        name: Set(name.trim().to_string()),
        phone: Set(phone.filter(|p| !p.trim().is_empty())),
        role: Set(role.as_str().to_string()),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(am.insert(db).await?)
}

pub async fn find_by_email<C: ConnectionTrait>(db: &C, email: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find().filter(Column::Email.eq(normalize_email(email))).one(db).await?)
}

/// Soft-delete or restore a user.
pub async fn set_active<C: ConnectionTrait>(db: &C, id: Uuid, active: bool) -> Result<Model, ModelError> {
    let mut found: ActiveModel = Entity::find_by_id(id).one(db).await?.ok_or(ModelError::NotFound("user"))?.into();
    found.is_active = Set(active);
    found.updated_at = Set(Utc::now().into());
    Ok(found.update(db).await?)
}

pub async fn hard_delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<(), ModelError> {
    Entity::delete_by_id(id).exec(db).await?;
    Ok(())
}

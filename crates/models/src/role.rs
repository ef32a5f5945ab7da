use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, Set};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "role")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { RolePermission }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::RolePermission => Entity::has_many(crate::role_permission::Entity).into(),
        }
    }
}

impl Related<crate::permission::Entity> for Entity {
    fn to() -> RelationDef { crate::role_permission::Relation::Permission.def() }
    fn via() -> Option<RelationDef> { Some(crate::role_permission::Relation::Role.def().rev()) }
}

impl ActiveModelBehavior for ActiveModel {}

/// Role names are upper-case identifiers: `ADMIN`, `FRONT_DESK`.
pub fn validate_name(name: &str) -> Result<String, ModelError> {
    let up = name.trim().to_ascii_uppercase();
    if up.is_empty() || up.len() > 64 {
        return Err(ModelError::validation("role name must be 1..=64 chars"));
    }
    if !up.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_') {
        return Err(ModelError::validation("role name may only contain A-Z, 0-9 and '_'"));
    }
    Ok(up)
}

pub async fn find_by_name<C: ConnectionTrait>(db: &C, name: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find().filter(Column::Name.eq(name.to_ascii_uppercase())).one(db).await?)
}

pub async fn create<C: ConnectionTrait>(db: &C, name: &str, description: Option<String>) -> Result<Model, ModelError> {
    let name = validate_name(name)?;
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        description: Set(description),
        created_at: Set(Utc::now().into()),
    };
    Ok(am.insert(db).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_names_are_uppercased() {
        assert_eq!(validate_name("front_desk").unwrap(), "FRONT_DESK");
        assert!(validate_name("bad name").is_err());
        assert!(validate_name("").is_err());
    }
}

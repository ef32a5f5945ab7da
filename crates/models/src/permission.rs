use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, Set};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "permission")]
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

impl Related<crate::role::Entity> for Entity {
    fn to() -> RelationDef { crate::role_permission::Relation::Role.def() }
    fn via() -> Option<RelationDef> { Some(crate::role_permission::Relation::Permission.def().rev()) }
}

impl ActiveModelBehavior for ActiveModel {}

/// Permission names follow `resource:action`, lower-case.
pub fn validate_name(name: &str) -> Result<(), ModelError> {
    match name.split_once(':') {
        Some((res, act))
            if !res.is_empty()
                && !act.is_empty()
                && name.chars().all(|c| c.is_ascii_lowercase() || c == ':' || c == '_') =>
        {
            Ok(())
        }
        _ => Err(ModelError::validation("permission must look like 'resource:action'")),
    }
}

pub async fn create<C: ConnectionTrait>(db: &C, name: &str, description: Option<String>) -> Result<Model, ModelError> {
    validate_name(name)?;
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set(description),
        created_at: Set(Utc::now().into()),
    };
    Ok(am.insert(db).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_format() {
        assert!(validate_name("payments:refund").is_ok());
        assert!(validate_name("payments").is_err());
        assert!(validate_name("Payments:Refund").is_err());
        assert!(validate_name(":x").is_err());
    }
}

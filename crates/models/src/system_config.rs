use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Keys under this prefix are readable without authentication.
pub const PUBLIC_PREFIX: &str = "public.";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "system_config")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub value: Json,
    pub description: Option<String>,
    pub updated_by: Option<Uuid>,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub fn is_public_key(key: &str) -> bool { key.starts_with(PUBLIC_PREFIX) }

pub fn validate_key(key: &str) -> Result<(), crate::errors::ModelError> {
    let ok = !key.is_empty()
        && key.len() <= 128
        && key.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'));
    if !ok {
        return Err(crate::errors::ModelError::validation("config key must match [a-z0-9._-]{1,128}"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys() {
        assert!(validate_key("public.site_name").is_ok());
        assert!(validate_key("Public.Site").is_err());
        assert!(validate_key("").is_err());
        assert!(is_public_key("public.currency"));
        assert!(!is_public_key("booking.window"));
    }
}

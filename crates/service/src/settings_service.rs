use std::collections::BTreeMap;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde_json::Value;
use tracing::{info, instrument};
use uuid::Uuid;

use configs::MAX_CANCELLATION_WINDOW_HOURS;
use models::system_config;
use crate::errors::ServiceError;
use crate::reservation_service::RefundPolicy;

pub const CANCELLATION_WINDOW_KEY: &str = "booking.cancellation_window_hours";

pub async fn list_configs(db: &DatabaseConnection) -> Result<Vec<system_config::Model>, ServiceError> {
    Ok(system_config::Entity::find().order_by_asc(system_config::Column::Key).all(db).await?)
}

pub async fn get_config(db: &DatabaseConnection, key: &str) -> Result<Option<system_config::Model>, ServiceError> {
    Ok(system_config::Entity::find_by_id(key.to_string()).one(db).await?)
}

/// Insert or replace a value.
#[instrument(skip(db, value))]
pub async fn set_config(
    db: &DatabaseConnection,
    key: &str,
    value: Value,
    description: Option<String>,
    updated_by: Uuid,
) -> Result<system_config::Model, ServiceError> {
    system_config::validate_key(key)?;
    validate_value(key, &value)?;
    let now = Utc::now().into();
    let saved = match get_config(db, key).await? {
        Some(existing) => {
            let mut am: system_config::ActiveModel = existing.into();
            am.value = Set(value);
            if description.is_some() {
                am.description = Set(description);
            }
            am.updated_by = Set(Some(updated_by));
            am.updated_at = Set(now);
            am.update(db).await?
        }
        None => {
            system_config::ActiveModel {
                key: Set(key.to_string()),
                value: Set(value),
                description: Set(description),
                updated_by: Set(Some(updated_by)),
                updated_at: Set(now),
            }
            .insert(db)
            .await?
        }
    };
    info!(%key, "system_config_set");
    Ok(saved)
}

/// Typed checks for keys the service reads back.
pub fn validate_value(key: &str, value: &Value) -> Result<(), ServiceError> {
    if key == CANCELLATION_WINDOW_KEY && !value.as_i64().is_some_and(window_in_range) {
        return Err(ServiceError::validation(format!(
            "{CANCELLATION_WINDOW_KEY} must be an integer between 0 and {MAX_CANCELLATION_WINDOW_HOURS}"
        )));
    }
    Ok(())
}

fn window_in_range(hours: i64) -> bool { (0..=MAX_CANCELLATION_WINDOW_HOURS).contains(&hours) }

pub async fn delete_config(db: &DatabaseConnection, key: &str) -> Result<(), ServiceError> {
    let res = system_config::Entity::delete_by_id(key.to_string()).exec(db).await?;
    if res.rows_affected == 0 {
        return Err(ServiceError::not_found("config key"));
    }
    Ok(())
}

/// Settings readable without authentication, keyed without the `public.` prefix.
pub async fn public_settings(db: &DatabaseConnection) -> Result<BTreeMap<String, Value>, ServiceError> {
    let rows = system_config::Entity::find()
        .filter(system_config::Column::Key.starts_with(system_config::PUBLIC_PREFIX))
        .all(db)
        .await?;
    Ok(rows
        .into_iter()
        .filter(|r| system_config::is_public_key(&r.key))
        .map(|r| (r.key.trim_start_matches(system_config::PUBLIC_PREFIX).to_string(), r.value))
        .collect())
}

pub async fn get_i64(db: &DatabaseConnection, key: &str) -> Result<Option<i64>, ServiceError> {
    Ok(get_config(db, key).await?.and_then(|c| value_as_i64(&c.value)))
}

/// Numbers and numeric strings both count.
pub fn value_as_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// The configured policy, overridden by `booking.cancellation_window_hours` when set.
pub async fn effective_refund_policy(db: &DatabaseConnection, base: RefundPolicy) -> Result<RefundPolicy, ServiceError> {
    Ok(match get_i64(db, CANCELLATION_WINDOW_KEY).await? {
        Some(h) if window_in_range(h) => RefundPolicy::new(h),
        _ => base,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use crate::test_support::{get_db, seed_user};
    use models::RoleName;

    #[test]
    fn numeric_values() {
        assert_eq!(value_as_i64(&json!(48)), Some(48));
        assert_eq!(value_as_i64(&json!(" 12 ")), Some(12));
        assert_eq!(value_as_i64(&json!(true)), None);
    }

    #[test]
    fn cancellation_window_values_are_bounded() {
        assert!(validate_value(CANCELLATION_WINDOW_KEY, &json!(48)).is_ok());
        assert!(validate_value(CANCELLATION_WINDOW_KEY, &json!(MAX_CANCELLATION_WINDOW_HOURS)).is_ok());
        assert!(validate_value(CANCELLATION_WINDOW_KEY, &json!(-1)).is_err());
        assert!(validate_value(CANCELLATION_WINDOW_KEY, &json!(i64::MAX / 2)).is_err());
        assert!(validate_value(CANCELLATION_WINDOW_KEY, &json!("48")).is_err());
        assert!(validate_value("public.anything", &json!(i64::MAX)).is_ok());
    }

    #[tokio::test]
    async fn public_subset_and_policy_override() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await? else { return Ok(()) };
        let admin = seed_user(&db, RoleName::Admin).await?;
        let key = format!("public.site_name_{}", Uuid::new_v4().simple());
        set_config(&db, &key, json!("Bookings"), None, admin.id).await?;
        let public = public_settings(&db).await?;
        assert!(public.values().any(|v| v == &json!("Bookings")));

        assert!(set_config(&db, CANCELLATION_WINDOW_KEY, json!(-1), None, admin.id).await.is_err());
        assert!(set_config(&db, CANCELLATION_WINDOW_KEY, json!(i64::MAX / 2), None, admin.id).await.is_err());
        set_config(&db, CANCELLATION_WINDOW_KEY, json!(72), None, admin.id).await?;
        assert_eq!(effective_refund_policy(&db, RefundPolicy::new(24)).await?, RefundPolicy::new(72));
        delete_config(&db, CANCELLATION_WINDOW_KEY).await?;
        assert_eq!(effective_refund_policy(&db, RefundPolicy::new(24)).await?, RefundPolicy::new(24));
        delete_config(&db, &key).await?;
        Ok(())
    }
}

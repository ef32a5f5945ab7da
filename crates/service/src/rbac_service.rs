//! Roles and permissions.
//!
//! A user's `role` column names one role; a role grants a set of
//! `resource:action` permissions through `role_permission`.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use models::{permission, role, role_permission, RoleName};
use crate::errors::ServiceError;

pub const VENUES_WRITE: &str = "venues:write";
pub const SERVICES_WRITE: &str = "services:write";
pub const RESERVATIONS_MANAGE: &str = "reservations:manage";
pub const PAYMENTS_REFUND: &str = "payments:refund";
pub const USERS_MANAGE: &str = "users:manage";
pub const REPORTS_READ: &str = "reports:read";
pub const AUDIT_READ: &str = "audit:read";
pub const SETTINGS_WRITE: &str = "settings:write";

pub const ALL_PERMISSIONS: &[&str] = &[
    VENUES_WRITE,
    SERVICES_WRITE,
    RESERVATIONS_MANAGE,
    PAYMENTS_REFUND,
    USERS_MANAGE,
    REPORTS_READ,
    AUDIT_READ,
    SETTINGS_WRITE,
];

/// Permissions seeded for each built-in role.
pub fn default_grants(role: RoleName) -> &'static [&'static str] {
    match role {
        RoleName::Admin => ALL_PERMISSIONS,
        RoleName::VenueOwner => &[VENUES_WRITE, SERVICES_WRITE, RESERVATIONS_MANAGE],
        RoleName::Customer => &[],
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleWithPermissions {
    #[serde(flatten)]
    pub role: role::Model,
    pub permissions: Vec<String>,
}

async fn find_or_create_permission<C: sea_orm::ConnectionTrait>(db: &C, name: &str) -> Result<permission::Model, ServiceError> {
    if let Some(p) = permission::Entity::find().filter(permission::Column::Name.eq(name)).one(db).await? {
        return Ok(p);
    }
    Ok(permission::create(db, name, None).await?)
}

/// Seed built-in roles and permissions. Safe to run on every start.
#[instrument(skip(db))]
pub async fn ensure_defaults(db: &DatabaseConnection) -> Result<(), ServiceError> {
    let txn = db.begin().await?;
    for name in ALL_PERMISSIONS {
        find_or_create_permission(&txn, name).await?;
    }
    for role_name in RoleName::ALL {
        let r = match role::find_by_name(&txn, role_name.as_str()).await? {
            Some(r) => r,
            None => role::create(&txn, role_name.as_str(), Some(format!("built-in {} role", role_name))).await?,
        };
        for perm_name in default_grants(*role_name) {
            let p = find_or_create_permission(&txn, perm_name).await?;
            let linked = role_permission::Entity::find_by_id((r.id, p.id)).one(&txn).await?;
            if linked.is_none() {
                role_permission::ActiveModel { role_id: Set(r.id), permission_id: Set(p.id) }.insert(&txn).await?;
            }
        }
    }
    txn.commit().await?;
    info!("rbac_defaults_ensured");
    Ok(())
}

pub async fn list_permissions(db: &DatabaseConnection) -> Result<Vec<permission::Model>, ServiceError> {
    Ok(permission::Entity::find().order_by_asc(permission::Column::Name).all(db).await?)
}

pub async fn list_roles(db: &DatabaseConnection) -> Result<Vec<RoleWithPermissions>, ServiceError> {
    let rows = role::Entity::find()
        .order_by_asc(role::Column::Name)
        .find_with_related(permission::Entity)
        .all(db)
        .await?;
    Ok(rows
        .into_iter()
        .map(|(role, perms)| {
            let mut permissions: Vec<String> = perms.into_iter().map(|p| p.name).collect();
            permissions.sort();
            RoleWithPermissions { role, permissions }
        })
        .collect())
}

#[instrument(skip(db))]
pub async fn create_role(db: &DatabaseConnection, name: &str, description: Option<String>) -> Result<role::Model, ServiceError> {
    let normalized = role::validate_name(name)?;
    if role::find_by_name(db, &normalized).await?.is_some() {
        return Err(ServiceError::conflict(format!("role {normalized} already exists")));
    }
    Ok(role::create(db, &normalized, description).await?)
}

/// Replace the permission set of a role.
#[instrument(skip(db, permissions))]
pub async fn set_role_permissions(db: &DatabaseConnection, role_id: Uuid, permissions: &[String]) -> Result<RoleWithPermissions, ServiceError> {
    let txn = db.begin().await?;
    let r = role::Entity::find_by_id(role_id).one(&txn).await?.ok_or_else(|| ServiceError::not_found("role"))?;
    let mut ids = Vec::with_capacity(permissions.len());
    for name in permissions {
        let p = permission::Entity::find()
            .filter(permission::Column::Name.eq(name.as_str()))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::validation(format!("unknown permission: {name}")))?;
        ids.push(p.id);
    }
    role_permission::Entity::delete_many().filter(role_permission::Column::RoleId.eq(role_id)).exec(&txn).await?;
    for pid in &ids {
        role_permission::ActiveModel { role_id: Set(role_id), permission_id: Set(*pid) }.insert(&txn).await?;
    }
    txn.commit().await?;
    info!(role = %r.name, count = ids.len(), "role_permissions_replaced");

    let mut names: Vec<String> = r.find_related(permission::Entity).all(db).await?.into_iter().map(|p| p.name).collect();
    names.sort();
    Ok(RoleWithPermissions { role: r, permissions: names })
}

/// Whether `role_name` grants `permission_name`.
pub async fn role_has_permission(db: &DatabaseConnection, role_name: &str, permission_name: &str) -> Result<bool, ServiceError> {
    let Some(r) = role::find_by_name(db, role_name).await? else { return Ok(false) };
    let found = r
        .find_related(permission::Entity)
        .filter(permission::Column::Name.eq(permission_name))
        .one(db)
        .await?;
    Ok(found.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;

    #[test]
    fn owners_cannot_refund() {
        assert!(default_grants(RoleName::VenueOwner).contains(&VENUES_WRITE));
        assert!(!default_grants(RoleName::VenueOwner).contains(&PAYMENTS_REFUND));
        assert_eq!(default_grants(RoleName::Admin).len(), ALL_PERMISSIONS.len());
        assert!(default_grants(RoleName::Customer).is_empty());
    }

    #[tokio::test]
    async fn defaults_are_idempotent() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await? else { return Ok(()) };
        ensure_defaults(&db).await?;
        ensure_defaults(&db).await?;
        assert!(role_has_permission(&db, "ADMIN", PAYMENTS_REFUND).await?);
        assert!(role_has_permission(&db, "VENUE_OWNER", SERVICES_WRITE).await?);
        assert!(!role_has_permission(&db, "CUSTOMER", VENUES_WRITE).await?);

        let roles = list_roles(&db).await?;
        let admin = roles.iter().find(|r| r.role.name == "ADMIN").expect("admin role");
        assert_eq!(admin.permissions.len(), ALL_PERMISSIONS.len());
        Ok(())
    }
}

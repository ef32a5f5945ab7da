use chrono::Utc;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use models::{user, RoleName};
use crate::auth::Actor;
use crate::errors::ServiceError;
use crate::pagination::{fetch_page, like_pattern, Page, Pagination};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFilter {
    /// Matches name or email.
    pub search: Option<String>,
    pub role: Option<RoleName>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfile {
    pub name: Option<String>,
    pub phone: Option<String>,
}

/// Get a user by id.
pub async fn get_user(db: &DatabaseConnection, id: Uuid) -> Result<Option<user::Model>, ServiceError> {
    Ok(user::Entity::find_by_id(id).one(db).await?)
}

/// Get a user the caller is allowed to see (self or admin).
pub async fn get_user_for(db: &DatabaseConnection, actor: &Actor, id: Uuid) -> Result<user::Model, ServiceError> {
    if !actor.can_act_for(id) {
        return Err(ServiceError::forbidden("cannot access another user's profile"));
    }
    get_user(db, id).await?.ok_or_else(|| ServiceError::not_found("user"))
}

/// List users with optional filters, newest first.
#[instrument(skip(db))]
pub async fn list_users(db: &DatabaseConnection, filter: UserFilter, opts: Pagination) -> Result<Page<user::Model>, ServiceError> {
    let mut cond = Condition::all();
    if let Some(term) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = like_pattern(term);
        cond = cond.add(
            Condition::any()
                .add(Expr::expr(Func::lower(Expr::col(user::Column::Name))).like(pattern.clone()))
                .add(Expr::expr(Func::lower(Expr::col(user::Column::Email))).like(pattern)),
        );
    }
    if let Some(role) = filter.role {
        cond = cond.add(user::Column::Role.eq(role.as_str()));
    }
    if let Some(active) = filter.is_active {
        cond = cond.add(user::Column::IsActive.eq(active));
    }
    let select = user::Entity::find().filter(cond).order_by_desc(user::Column::CreatedAt);
    fetch_page(db, select, opts).await
}

/// Update name and/or phone. An empty phone clears it.
#[instrument(skip(db, input))]
pub async fn update_profile(db: &DatabaseConnection, actor: &Actor, id: Uuid, input: UpdateProfile) -> Result<user::Model, ServiceError> {
    let found = get_user_for(db, actor, id).await?;
    let mut am: user::ActiveModel = found.into();
    if let Some(name) = input.name {
        user::validate_name(&name)?;
        am.name = Set(name.trim().to_string());
    }
    if let Some(phone) = input.phone {
        let phone = phone.trim().to_string();
        am.phone = Set(if phone.is_empty() { None } else { Some(phone) });
    }
    am.updated_at = Set(Utc::now().into());
    Ok(am.update(db).await?)
}

/// Change a user's role. Admins cannot demote themselves.
#[instrument(skip(db))]
pub async fn set_role(db: &DatabaseConnection, actor: &Actor, id: Uuid, role: RoleName) -> Result<user::Model, ServiceError> {
    if actor.id == id && role != RoleName::Admin {
        return Err(ServiceError::conflict("admins cannot remove their own admin role"));
    }
    let mut am: user::ActiveModel = get_user(db, id).await?.ok_or_else(|| ServiceError::not_found("user"))?.into();
    am.role = Set(role.as_str().to_string());
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!(user_id = %id, role = %role, "user_role_changed");
    Ok(updated)
}

/// Deactivate (soft-delete) or reactivate a user.
#[instrument(skip(db))]
pub async fn set_active(db: &DatabaseConnection, actor: &Actor, id: Uuid, active: bool) -> Result<user::Model, ServiceError> {
    if !actor.can_act_for(id) {
        return Err(ServiceError::forbidden("cannot change another user's account"));
    }
    if !active && actor.is_admin() && actor.id == id {
        return Err(ServiceError::conflict("admins cannot deactivate themselves"));
    }
    if active && !actor.is_admin() {
        return Err(ServiceError::forbidden("only admins can reactivate accounts"));
    }
    let updated = user::set_active(db, id, active).await?;
    info!(user_id = %id, active, "user_activation_changed");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;

    #[tokio::test]
    async fn user_profile_and_listing() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await? else { return Ok(()) };

        let email = format!("svc_{}@example.com", Uuid::new_v4());
        let u = user::create(&db, &email, "Svc User", None, RoleName::Customer).await?;
        let me = Actor::new(u.id, RoleName::Customer);
        let other = Actor::new(Uuid::new_v4(), RoleName::Customer);
        let admin = Actor::new(Uuid::new_v4(), RoleName::Admin);

        assert!(matches!(get_user_for(&db, &other, u.id).await, Err(ServiceError::Forbidden(_))));
        let updated = update_profile(&db, &me, u.id, UpdateProfile { name: Some("New Name".into()), phone: Some("+351 1".into()) }).await?;
        assert_eq!(updated.name, "New Name");
        assert_eq!(updated.phone.as_deref(), Some("+351 1"));

        let page = list_users(&db, UserFilter { search: Some(email.to_uppercase()), ..Default::default() }, Pagination::new(1, 10)).await?;
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, u.id);

        let owner = set_role(&db, &admin, u.id, RoleName::VenueOwner).await?;
        assert_eq!(owner.role, "VENUE_OWNER");

        let off = set_active(&db, &me, u.id, false).await?;
        assert!(!off.is_active);
        assert!(matches!(set_active(&db, &me, u.id, true).await, Err(ServiceError::Forbidden(_))));
        assert!(set_active(&db, &admin, u.id, true).await?.is_active);

        user::hard_delete(&db, u.id).await?;
        Ok(())
    }
}

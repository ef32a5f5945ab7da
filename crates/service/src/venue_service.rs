use chrono::Utc;
use sea_orm::sea_query::{Alias, Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use models::{review, venue, RoleName, VenueType};
use crate::auth::Actor;
use crate::errors::ServiceError;
use crate::pagination::{fetch_page, like_pattern, Page, Pagination};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueFilter {
    pub city: Option<String>,
    pub venue_type: Option<VenueType>,
    /// Matches the venue name.
    pub search: Option<String>,
    pub owner_id: Option<Uuid>,
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVenue {
    pub name: Option<String>,
    pub description: Option<String>,
    pub venue_type: Option<VenueType>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub average_rating: Option<f64>,
    pub review_count: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueDetail {
    #[serde(flatten)]
    pub venue: venue::Model,
    #[serde(flatten)]
    pub rating: RatingSummary,
}

fn filter_condition(filter: &VenueFilter) -> Condition {
    let mut cond = Condition::all();
    if !filter.include_inactive {
        cond = cond.add(venue::Column::IsActive.eq(true));
    }
    if let Some(city) = filter.city.as_deref().filter(|c| !c.trim().is_empty()) {
        cond = cond.add(Expr::expr(Func::lower(Expr::col(venue::Column::City))).eq(city.trim().to_lowercase()));
    }
    if let Some(t) = filter.venue_type {
        cond = cond.add(venue::Column::VenueType.eq(t.as_str()));
    }
    if let Some(term) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        cond = cond.add(Expr::expr(Func::lower(Expr::col(venue::Column::Name))).like(like_pattern(term)));
    }
    if let Some(owner) = filter.owner_id {
        cond = cond.add(venue::Column::OwnerId.eq(owner));
    }
    cond
}

/// List venues, newest first. Inactive venues only appear for admins asking for them.
#[instrument(skip(db))]
pub async fn list_venues(db: &DatabaseConnection, actor: Option<&Actor>, mut filter: VenueFilter, opts: Pagination) -> Result<Page<venue::Model>, ServiceError> {
    if filter.include_inactive && !actor.map(|a| a.is_admin()).unwrap_or(false) {
        filter.include_inactive = false;
    }
    let select = venue::Entity::find().filter(filter_condition(&filter)).order_by_desc(venue::Column::CreatedAt);
    fetch_page(db, select, opts).await
}

pub async fn get_venue(db: &DatabaseConnection, id: Uuid) -> Result<venue::Model, ServiceError> {
    venue::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("venue"))
}

/// Venue plus its published-review rating.
pub async fn get_venue_detail(db: &DatabaseConnection, id: Uuid) -> Result<VenueDetail, ServiceError> {
    let venue = get_venue(db, id).await?;
    let rating = rating_summary(db, id).await?;
    Ok(VenueDetail { venue, rating })
}

pub async fn rating_summary(db: &DatabaseConnection, venue_id: Uuid) -> Result<RatingSummary, ServiceError> {
    let row: Option<(Option<f64>, i64)> = review::Entity::find()
        .select_only()
        .column_as(Expr::expr(Func::cast_as(Func::avg(Expr::col(review::Column::Rating)), Alias::new("DOUBLE PRECISION"))), "avg")
        .column_as(Expr::expr(Func::count(Expr::col(review::Column::Id))), "count")
        .filter(review::Column::VenueId.eq(venue_id))
        .filter(review::Column::IsPublished.eq(true))
        .into_tuple()
        .one(db)
        .await?;
    let (avg, count) = row.unwrap_or((None, 0));
    Ok(RatingSummary { average_rating: avg.map(|a| (a * 100.0).round() / 100.0), review_count: count.max(0) as u64 })
}

/// Owner must be a venue owner or admin; the venue is created under the caller.
#[instrument(skip(db, input), fields(owner = %actor.id))]
pub async fn create_venue(db: &DatabaseConnection, actor: &Actor, input: venue::NewVenue) -> Result<venue::Model, ServiceError> {
    if !matches!(actor.role, RoleName::Admin | RoleName::VenueOwner) {
        return Err(ServiceError::forbidden("only venue owners can create venues"));
    }
    let created = venue::create(db, actor.id, input).await?;
    info!(venue_id = %created.id, "venue_created");
    Ok(created)
}

/// Load a venue the actor may modify.
pub async fn get_owned_venue(db: &DatabaseConnection, actor: &Actor, id: Uuid) -> Result<venue::Model, ServiceError> {
    let v = get_venue(db, id).await?;
    if !actor.can_act_for(v.owner_id) {
        return Err(ServiceError::forbidden("not the owner of this venue"));
    }
    Ok(v)
}

#[instrument(skip(db, input))]
pub async fn update_venue(db: &DatabaseConnection, actor: &Actor, id: Uuid, input: UpdateVenue) -> Result<venue::Model, ServiceError> {
    let found = get_owned_venue(db, actor, id).await?;
    let mut am: venue::ActiveModel = found.into();
    if let Some(name) = input.name {
        venue::validate_name(&name)?;
        am.name = Set(name.trim().to_string());
    }
    if let Some(d) = input.description {
        am.description = Set(Some(d).filter(|d| !d.trim().is_empty()));
    }
    if let Some(t) = input.venue_type {
        am.venue_type = Set(t.as_str().to_string());
    }
    if let Some(a) = input.address {
        venue::validate_location(&a, "-", "-")?;
        am.address = Set(a.trim().to_string());
    }
    if let Some(c) = input.city {
        venue::validate_location("-", &c, "-")?;
        am.city = Set(c.trim().to_string());
    }
    if let Some(c) = input.country {
        venue::validate_location("-", "-", &c)?;
        am.country = Set(c.trim().to_string());
    }
    if let Some(p) = input.phone {
        am.phone = Set(Some(p).filter(|p| !p.trim().is_empty()));
    }
    if let Some(e) = input.email {
        let e = Some(e).filter(|e| !e.trim().is_empty());
        venue::validate_contact_email(e.as_deref())?;
        am.email = Set(e);
    }
    if let Some(active) = input.is_active {
        am.is_active = Set(active);
    }
    am.updated_at = Set(Utc::now().into());
    Ok(am.update(db).await?)
}

/// Soft delete: the venue stays for history but disappears from listings.
#[instrument(skip(db))]
pub async fn deactivate_venue(db: &DatabaseConnection, actor: &Actor, id: Uuid) -> Result<venue::Model, ServiceError> {
    let found = get_owned_venue(db, actor, id).await?;
    let mut am: venue::ActiveModel = found.into();
    am.is_active = Set(false);
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!(venue_id = %id, "venue_deactivated");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{get_db, new_venue, seed_user};

    #[test]
    fn inactive_filtered_by_default() {
        let cond = filter_condition(&VenueFilter::default());
        assert!(!cond.is_empty());
        let cond = filter_condition(&VenueFilter { include_inactive: true, ..Default::default() });
        assert!(cond.is_empty());
    }

    #[tokio::test]
    async fn venue_lifecycle() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await? else { return Ok(()) };
        let owner = seed_user(&db, RoleName::VenueOwner).await?;
        let customer = seed_user(&db, RoleName::Customer).await?;
        let owner_actor = Actor::new(owner.id, RoleName::VenueOwner);
        let customer_actor = Actor::new(customer.id, RoleName::Customer);

        assert!(matches!(create_venue(&db, &customer_actor, new_venue("Nope")).await, Err(ServiceError::Forbidden(_))));

        let name = format!("Venue {}", Uuid::new_v4());
        let v = create_venue(&db, &owner_actor, new_venue(&name)).await?;
        assert_eq!(v.owner_id, owner.id);

        let upd = UpdateVenue { city: Some("Porto".into()), ..Default::default() };
        assert!(matches!(update_venue(&db, &customer_actor, v.id, upd.clone()).await, Err(ServiceError::Forbidden(_))));
        let updated = update_venue(&db, &owner_actor, v.id, upd).await?;
        assert_eq!(updated.city, "Porto");

        let filter = VenueFilter { search: Some(name.clone()), city: Some("porto".into()), ..Default::default() };
        let page = list_venues(&db, None, filter.clone(), Pagination::default()).await?;
        assert_eq!(page.total, 1);

        deactivate_venue(&db, &owner_actor, v.id).await?;
        let page = list_venues(&db, None, filter, Pagination::default()).await?;
        assert_eq!(page.total, 0);

        let detail = get_venue_detail(&db, v.id).await?;
        assert_eq!(detail.rating.review_count, 0);
        assert!(detail.rating.average_rating.is_none());
        Ok(())
    }
}

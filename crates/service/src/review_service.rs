use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use models::{reservation, review, ReservationStatus};
use crate::auth::Actor;
use crate::errors::ServiceError;
use crate::pagination::{fetch_page, Page, Pagination};
use crate::venue_service;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReview {
    #[serde(default)]
    pub reservation_id: Option<Uuid>,
    pub rating: i32,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReview {
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

/// Create a review of a venue. A review tied to a stay needs that stay to be checked out.
#[instrument(skip(db, input), fields(user_id = %actor.id))]
pub async fn create_review(db: &DatabaseConnection, actor: &Actor, venue_id: Uuid, input: CreateReview) -> Result<review::Model, ServiceError> {
    review::validate_rating(input.rating)?;
    review::validate_comment(input.comment.as_deref())?;
    let venue = venue_service::get_venue(db, venue_id).await?;
    if !venue.is_active {
        return Err(ServiceError::conflict("venue is inactive"));
    }
    if let Some(rid) = input.reservation_id {
        let r = reservation::Entity::find_by_id(rid).one(db).await?.ok_or_else(|| ServiceError::not_found("reservation"))?;
        if r.user_id != actor.id {
            return Err(ServiceError::forbidden("reservation belongs to another user"));
        }
        if r.venue_id != venue_id {
            return Err(ServiceError::validation("reservation is for a different venue"));
        }
        if r.status()? != ReservationStatus::CheckedOut {
            return Err(ServiceError::conflict("only completed stays can be reviewed"));
        }
        let existing = review::Entity::find().filter(review::Column::ReservationId.eq(rid)).one(db).await?;
        if existing.is_some() {
            return Err(ServiceError::conflict("this stay has already been reviewed"));
        }
    }
    let now = Utc::now().into();
    let am = review::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(actor.id),
        venue_id: Set(venue_id),
        reservation_id: Set(input.reservation_id),
        rating: Set(input.rating),
        comment: Set(input.comment.filter(|c| !c.trim().is_empty())),
        is_published: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let created = am.insert(db).await?;
    info!(review_id = %created.id, %venue_id, "review_created");
    Ok(created)
}

/// Reviews of a venue, newest first. Unpublished ones only when `include_hidden`.
pub async fn list_for_venue(db: &DatabaseConnection, venue_id: Uuid, include_hidden: bool, opts: Pagination) -> Result<Page<review::Model>, ServiceError> {
    let mut select = review::Entity::find().filter(review::Column::VenueId.eq(venue_id));
    if !include_hidden {
        select = select.filter(review::Column::IsPublished.eq(true));
    }
    fetch_page(db, select.order_by_desc(review::Column::CreatedAt), opts).await
}

async fn get_review(db: &DatabaseConnection, id: Uuid) -> Result<review::Model, ServiceError> {
    review::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("review"))
}

pub async fn update_review(db: &DatabaseConnection, actor: &Actor, id: Uuid, input: UpdateReview) -> Result<review::Model, ServiceError> {
    let r = get_review(db, id).await?;
    if r.user_id != actor.id {
        return Err(ServiceError::forbidden("only the author can edit a review"));
    }
    let mut am: review::ActiveModel = r.into();
    if let Some(rating) = input.rating {
        review::validate_rating(rating)?;
        am.rating = Set(rating);
    }
    if let Some(comment) = input.comment {
        review::validate_comment(Some(&comment))?;
        am.comment = Set(Some(comment).filter(|c| !c.trim().is_empty()));
    }
    am.updated_at = Set(Utc::now().into());
    Ok(am.update(db).await?)
}

/// Publish or hide a review (admin).
#[instrument(skip(db))]
pub async fn moderate(db: &DatabaseConnection, id: Uuid, published: bool) -> Result<review::Model, ServiceError> {
    let mut am: review::ActiveModel = get_review(db, id).await?.into();
    am.is_published = Set(published);
    am.updated_at = Set(Utc::now().into());
    Ok(am.update(db).await?)
}

pub async fn delete_review(db: &DatabaseConnection, actor: &Actor, id: Uuid) -> Result<(), ServiceError> {
    let r = get_review(db, id).await?;
    if !actor.can_act_for(r.user_id) {
        return Err(ServiceError::forbidden("cannot delete another user's review"));
    }
    review::Entity::delete_by_id(id).exec(db).await?;
    info!(review_id = %id, "review_deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{get_db, new_venue, seed_user};
    use models::RoleName;

    #[tokio::test]
    async fn review_visibility_and_ownership() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await? else { return Ok(()) };
        let owner = seed_user(&db, RoleName::VenueOwner).await?;
        let guest = seed_user(&db, RoleName::Customer).await?;
        let owner_actor = Actor::new(owner.id, RoleName::VenueOwner);
        let guest_actor = Actor::new(guest.id, RoleName::Customer);
        let v = venue_service::create_venue(&db, &owner_actor, new_venue("Review Inn")).await?;

        let bad = create_review(&db, &guest_actor, v.id, CreateReview { reservation_id: None, rating: 6, comment: None }).await;
        assert!(bad.is_err());
        let r = create_review(&db, &guest_actor, v.id, CreateReview { reservation_id: None, rating: 4, comment: Some("lovely".into()) }).await?;

        assert!(matches!(update_review(&db, &owner_actor, r.id, UpdateReview { rating: Some(1), comment: None }).await, Err(ServiceError::Forbidden(_))));
        let r = update_review(&db, &guest_actor, r.id, UpdateReview { rating: Some(5), comment: None }).await?;
        assert_eq!(r.rating, 5);

        moderate(&db, r.id, false).await?;
        assert_eq!(list_for_venue(&db, v.id, false, Pagination::default()).await?.total, 0);
        assert_eq!(list_for_venue(&db, v.id, true, Pagination::default()).await?.total, 1);

        moderate(&db, r.id, true).await?;
        let summary = venue_service::rating_summary(&db, v.id).await?;
        assert_eq!(summary.review_count, 1);
        assert_eq!(summary.average_rating, Some(5.0));

        delete_review(&db, &guest_actor, r.id).await?;
        Ok(())
    }
}

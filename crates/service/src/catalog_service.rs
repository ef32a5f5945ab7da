//! Bookable services offered by venues, and date-range availability.

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use models::{reservation, service, PricingUnit, ReservationStatus};
use crate::auth::Actor;
use crate::errors::ServiceError;
use crate::pagination::{fetch_page, Page, Pagination};
use crate::venue_service;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceFilter {
    pub venue_id: Option<Uuid>,
    pub min_price_cents: Option<i64>,
    pub max_price_cents: Option<i64>,
    /// Only services that fit at least this many guests.
    pub min_capacity: Option<i32>,
    pub pricing_unit: Option<PricingUnit>,
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateService {
    pub name: Option<String>,
    pub description: Option<String>,
    pub pricing_unit: Option<PricingUnit>,
    pub price_cents: Option<i64>,
    pub capacity: Option<i32>,
    pub inventory: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub service_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub available: bool,
    pub remaining_units: i64,
    pub nights: i64,
}

fn filter_condition(filter: &ServiceFilter) -> Condition {
    let mut cond = Condition::all();
    if !filter.include_inactive {
        cond = cond.add(service::Column::IsActive.eq(true));
    }
    if let Some(v) = filter.venue_id {
        cond = cond.add(service::Column::VenueId.eq(v));
    }
    if let Some(min) = filter.min_price_cents {
        cond = cond.add(service::Column::PriceCents.gte(min));
    }
    if let Some(max) = filter.max_price_cents {
        cond = cond.add(service::Column::PriceCents.lte(max));
    }
    if let Some(c) = filter.min_capacity {
        cond = cond.add(service::Column::Capacity.gte(c));
    }
    if let Some(u) = filter.pricing_unit {
        cond = cond.add(service::Column::PricingUnit.eq(u.as_str()));
    }
    cond
}

#[instrument(skip(db))]
pub async fn list_services(db: &DatabaseConnection, filter: ServiceFilter, opts: Pagination) -> Result<Page<service::Model>, ServiceError> {
    if let (Some(min), Some(max)) = (filter.min_price_cents, filter.max_price_cents) {
        if min > max {
            return Err(ServiceError::validation("minPriceCents must be <= maxPriceCents"));
        }
    }
    let select = service::Entity::find()
        .filter(filter_condition(&filter))
        .order_by_asc(service::Column::PriceCents)
        .order_by_asc(service::Column::Name);
    fetch_page(db, select, opts).await
}

pub async fn get_service<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<service::Model, ServiceError> {
    service::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("service"))
}

/// Create a service under a venue the actor owns.
#[instrument(skip(db, input))]
pub async fn create_service(
    db: &DatabaseConnection,
    actor: &Actor,
    venue_id: Uuid,
    input: service::NewService,
    default_currency: &str,
) -> Result<service::Model, ServiceError> {
    let venue = venue_service::get_owned_venue(db, actor, venue_id).await?;
    if !venue.is_active {
        return Err(ServiceError::conflict("venue is inactive"));
    }
    let created = service::create(db, venue_id, input, default_currency).await?;
    info!(service_id = %created.id, %venue_id, "service_created");
    Ok(created)
}

async fn get_owned_service(db: &DatabaseConnection, actor: &Actor, id: Uuid) -> Result<service::Model, ServiceError> {
    let s = get_service(db, id).await?;
    venue_service::get_owned_venue(db, actor, s.venue_id).await?;
    Ok(s)
}

#[instrument(skip(db, input))]
pub async fn update_service(db: &DatabaseConnection, actor: &Actor, id: Uuid, input: UpdateService) -> Result<service::Model, ServiceError> {
    let found = get_owned_service(db, actor, id).await?;
    let mut am: service::ActiveModel = found.into();
    if let Some(name) = input.name {
        if name.trim().is_empty() {
            return Err(ServiceError::validation("service name required"));
        }
        am.name = Set(name.trim().to_string());
    }
    if let Some(d) = input.description {
        am.description = Set(Some(d).filter(|d| !d.trim().is_empty()));
    }
    if let Some(u) = input.pricing_unit {
        am.pricing_unit = Set(u.as_str().to_string());
    }
    if let Some(p) = input.price_cents {
        service::validate_price(p)?;
        am.price_cents = Set(p);
    }
    if let Some(c) = input.capacity {
        service::validate_capacity(c)?;
        am.capacity = Set(c);
    }
    if let Some(i) = input.inventory {
        service::validate_inventory(i)?;
        am.inventory = Set(i);
    }
    if let Some(active) = input.is_active {
        am.is_active = Set(active);
    }
    am.updated_at = Set(Utc::now().into());
    Ok(am.update(db).await?)
}

#[instrument(skip(db))]
pub async fn deactivate_service(db: &DatabaseConnection, actor: &Actor, id: Uuid) -> Result<service::Model, ServiceError> {
    let found = get_owned_service(db, actor, id).await?;
    let mut am: service::ActiveModel = found.into();
    am.is_active = Set(false);
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!(service_id = %id, "service_deactivated");
    Ok(updated)
}

/// Date ranges of `service_id` reservations that hold inventory and overlap `[check_in, check_out)`.
pub async fn overlapping_stays<C: ConnectionTrait>(
    db: &C,
    service_id: Uuid,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> Result<Vec<(NaiveDate, NaiveDate)>, ServiceError> {
    let releasing: Vec<&str> = ReservationStatus::ALL
        .iter()
        .filter(|s| !s.holds_inventory())
        .map(|s| s.as_str())
        .collect();
    let rows = reservation::Entity::find()
        .filter(reservation::Column::ServiceId.eq(service_id))
        .filter(reservation::Column::Status.is_not_in(releasing))
        .filter(reservation::Column::CheckIn.lt(check_out))
        .filter(reservation::Column::CheckOut.gt(check_in))
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|r| (r.check_in, r.check_out)).collect())
}

/// Remaining units for a date range: inventory less the busiest night's
/// occupancy. Inactive services are never available.
#[instrument(skip(db))]
pub async fn check_availability<C: ConnectionTrait>(
    db: &C,
    service_id: Uuid,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> Result<Availability, ServiceError> {
    if check_out <= check_in {
        return Err(ServiceError::validation("checkOut must be after checkIn"));
    }
    let svc = get_service(db, service_id).await?;
    let stays = overlapping_stays(db, service_id, check_in, check_out).await?;
    let taken = reservation::peak_occupancy(&stays, check_in, check_out);
    let remaining = if svc.is_active { (i64::from(svc.inventory) - taken as i64).max(0) } else { 0 };
    Ok(Availability {
        service_id,
        check_in,
        check_out,
        available: remaining > 0,
        remaining_units: remaining,
        nights: reservation::nights_between(check_in, check_out),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{get_db, new_service, new_venue, seed_user};
    use models::RoleName;

    #[test]
    fn price_bounds_map_to_conditions() {
        let f = ServiceFilter { min_price_cents: Some(100), max_price_cents: Some(200), ..Default::default() };
        assert!(!filter_condition(&f).is_empty());
    }

    #[tokio::test]
    async fn availability_counts_overlaps_only() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await? else { return Ok(()) };
        let owner = seed_user(&db, RoleName::VenueOwner).await?;
        let actor = Actor::new(owner.id, RoleName::VenueOwner);
        let venue = venue_service::create_venue(&db, &actor, new_venue("Avail Inn")).await?;
        let svc = create_service(&db, &actor, venue.id, new_service(PricingUnit::PerNight, 10_000, 2, 1), "usd").await?;
        assert_eq!(svc.currency, "usd");

        let d = |m, day| NaiveDate::from_ymd_opt(2031, m, day).unwrap();
        let a = check_availability(&db, svc.id, d(1, 10), d(1, 12)).await?;
        assert!(a.available);
        assert_eq!(a.remaining_units, 1);
        assert_eq!(a.nights, 2);

        let stranger = Actor::new(Uuid::new_v4(), RoleName::VenueOwner);
        let denied = update_service(&db, &stranger, svc.id, UpdateService { price_cents: Some(1), ..Default::default() }).await;
        assert!(matches!(denied, Err(ServiceError::Forbidden(_))));

        deactivate_service(&db, &actor, svc.id).await?;
        let a = check_availability(&db, svc.id, d(1, 10), d(1, 12)).await?;
        assert!(!a.available);
        Ok(())
    }

    #[tokio::test]
    async fn disjoint_stays_leave_a_unit_for_the_whole_range() -> Result<(), anyhow::Error> {
        use crate::reservation_service::{create_reservation, CreateReservation};
        let Some(db) = get_db().await? else { return Ok(()) };
        let owner = seed_user(&db, RoleName::VenueOwner).await?;
        let guest = seed_user(&db, RoleName::Customer).await?;
        let actor = Actor::new(owner.id, RoleName::VenueOwner);
        let guest = Actor::new(guest.id, RoleName::Customer);
        let venue = venue_service::create_venue(&db, &actor, new_venue("Twin Inn")).await?;
        let svc = create_service(&db, &actor, venue.id, new_service(PricingUnit::PerNight, 10_000, 2, 2), "usd").await?;

        let d = |m, day| NaiveDate::from_ymd_opt(2031, m, day).unwrap();
        let today = d(1, 1);
        let stay = |check_in, check_out| CreateReservation { service_id: svc.id, check_in, check_out, guests: 1, special_requests: None };
        create_reservation(&db, &guest, stay(d(3, 1), d(3, 2)), today).await?;
        create_reservation(&db, &guest, stay(d(3, 3), d(3, 4)), today).await?;

        let a = check_availability(&db, svc.id, d(3, 1), d(3, 4)).await?;
        assert!(a.available);
        assert_eq!(a.remaining_units, 1);
        create_reservation(&db, &guest, stay(d(3, 1), d(3, 4)), today).await?;

        // night of 03-01 now holds both units
        let a = check_availability(&db, svc.id, d(3, 1), d(3, 2)).await?;
        assert!(!a.available);
        let a = check_availability(&db, svc.id, d(3, 2), d(3, 3)).await?;
        assert_eq!(a.remaining_units, 1);
        Ok(())
    }
}

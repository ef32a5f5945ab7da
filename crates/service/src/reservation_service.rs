use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::sea_query::Query;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use common::metrics::{RESERVATIONS_CANCELLED_TOTAL, RESERVATIONS_CREATED_TOTAL};
use models::{reservation, service, venue, PricingUnit, ReservationStatus, RoleName};
use crate::auth::Actor;
use crate::catalog_service;
use crate::errors::ServiceError;
use crate::pagination::{fetch_page, Page, Pagination};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservation {
    pub service_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: i32,
    #[serde(default)]
    pub special_requests: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationFilter {
    pub status: Option<ReservationStatus>,
    pub venue_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    /// Stays checking in on or after this date.
    pub from: Option<NaiveDate>,
    /// Stays checking in on or before this date.
    pub to: Option<NaiveDate>,
}

/// Result of a cancel call; `already_cancelled` marks a repeated request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOutcome {
    pub reservation: reservation::Model,
    pub already_cancelled: bool,
}

/// Full refund when cancelled at least `cancellation_window_hours` before check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefundPolicy {
    pub cancellation_window_hours: i64,
}

impl RefundPolicy {
    pub fn new(cancellation_window_hours: i64) -> Self { Self { cancellation_window_hours } }
}

impl From<&configs::BookingConfig> for RefundPolicy {
    fn from(c: &configs::BookingConfig) -> Self { RefundPolicy::new(c.cancellation_window_hours) }
}

/// Amount to give back for a cancellation at `now`. Check-in is taken as midnight UTC.
pub fn refund_due(policy: RefundPolicy, check_in: NaiveDate, now: DateTime<Utc>, paid_cents: i64) -> i64 {
    let starts = check_in.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    let window = chrono::Duration::try_hours(policy.cancellation_window_hours);
    match (starts, window) {
        (Some(starts), Some(window)) if starts - now >= window => paid_cents.max(0),
        _ => 0,
    }
}

/// Price of a stay in minor units.
pub fn quote_total(svc: &service::Model, check_in: NaiveDate, check_out: NaiveDate, guests: i32) -> Result<i64, ServiceError> {
    let nights = reservation::nights_between(check_in, check_out);
    let guests = i64::from(guests.max(1));
    let total = match svc.pricing()? {
        PricingUnit::PerNight => svc.price_cents.checked_mul(nights),
        PricingUnit::PerPerson => svc.price_cents.checked_mul(guests).and_then(|v| v.checked_mul(nights)),
        PricingUnit::PerBooking => Some(svc.price_cents),
    };
    total.ok_or_else(|| ServiceError::validation("total amount overflows"))
}

/// Validate, check availability and insert in one transaction.
#[instrument(skip(db, input), fields(user_id = %actor.id, service_id = %input.service_id))]
pub async fn create_reservation(
    db: &DatabaseConnection,
    actor: &Actor,
    input: CreateReservation,
    today: NaiveDate,
) -> Result<reservation::Model, ServiceError> {
    reservation::validate_dates(input.check_in, input.check_out, today)?;

    let txn = db.begin().await?;
    // Row lock serializes concurrent bookings of the same service.
    let svc = service::Entity::find_by_id(input.service_id)
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or_else(|| ServiceError::not_found("service"))?;
    if !svc.is_active {
        return Err(ServiceError::conflict("service is not bookable"));
    }
    let v = venue::Entity::find_by_id(svc.venue_id).one(&txn).await?.ok_or_else(|| ServiceError::not_found("venue"))?;
    if !v.is_active {
        return Err(ServiceError::conflict("venue is not accepting reservations"));
    }
    reservation::validate_guests(input.guests, svc.capacity)?;

    let availability = catalog_service::check_availability(&txn, svc.id, input.check_in, input.check_out).await?;
    if !availability.available {
        return Err(ServiceError::conflict("no availability for the selected dates"));
    }

    let total = quote_total(&svc, input.check_in, input.check_out, input.guests)?;
    let status = if total == 0 { ReservationStatus::Confirmed } else { ReservationStatus::Pending };
    let now = Utc::now().into();
    let am = reservation::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(actor.id),
        service_id: Set(svc.id),
        venue_id: Set(svc.venue_id),
        check_in: Set(input.check_in),
        check_out: Set(input.check_out),
        guests: Set(input.guests),
        status: Set(status.as_str().to_string()),
        total_amount_cents: Set(total),
        currency: Set(svc.currency.clone()),
        special_requests: Set(input.special_requests.filter(|s| !s.trim().is_empty())),
        cancellation_reason: Set(None),
        cancelled_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let created = am.insert(&txn).await?;
    txn.commit().await?;

    RESERVATIONS_CREATED_TOTAL.inc();
    info!(reservation_id = %created.id, total, status = %status, "reservation_created");
    Ok(created)
}

async fn venue_owner(db: &DatabaseConnection, venue_id: Uuid) -> Result<Option<Uuid>, ServiceError> {
    Ok(venue::Entity::find_by_id(venue_id).one(db).await?.map(|v| v.owner_id))
}

/// The guest, the venue's owner and admins may see a reservation.
pub async fn get_reservation(db: &DatabaseConnection, actor: &Actor, id: Uuid) -> Result<reservation::Model, ServiceError> {
    let r = reservation::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("reservation"))?;
    if actor.can_act_for(r.user_id) {
        return Ok(r);
    }
    if actor.role == RoleName::VenueOwner && venue_owner(db, r.venue_id).await? == Some(actor.id) {
        return Ok(r);
    }
    Err(ServiceError::forbidden("not allowed to access this reservation"))
}

/// Guest-side listing, newest first.
pub async fn list_for_user(
    db: &DatabaseConnection,
    user_id: Uuid,
    status: Option<ReservationStatus>,
    opts: Pagination,
) -> Result<Page<reservation::Model>, ServiceError> {
    let mut select = reservation::Entity::find().filter(reservation::Column::UserId.eq(user_id));
    if let Some(s) = status {
        select = select.filter(reservation::Column::Status.eq(s.as_str()));
    }
    fetch_page(db, select.order_by_desc(reservation::Column::CreatedAt), opts).await
}

fn filter_condition(filter: &ReservationFilter) -> Condition {
    let mut cond = Condition::all();
    if let Some(s) = filter.status {
        cond = cond.add(reservation::Column::Status.eq(s.as_str()));
    }
    if let Some(v) = filter.venue_id {
        cond = cond.add(reservation::Column::VenueId.eq(v));
    }
    if let Some(s) = filter.service_id {
        cond = cond.add(reservation::Column::ServiceId.eq(s));
    }
    if let Some(u) = filter.user_id {
        cond = cond.add(reservation::Column::UserId.eq(u));
    }
    if let Some(from) = filter.from {
        cond = cond.add(reservation::Column::CheckIn.gte(from));
    }
    if let Some(to) = filter.to {
        cond = cond.add(reservation::Column::CheckIn.lte(to));
    }
    cond
}

/// Back-office listing. Admins see everything, owners their venues, customers their own.
#[instrument(skip(db))]
pub async fn list_reservations(
    db: &DatabaseConnection,
    actor: &Actor,
    filter: ReservationFilter,
    opts: Pagination,
) -> Result<Page<reservation::Model>, ServiceError> {
    let mut cond = filter_condition(&filter);
    match actor.role {
        RoleName::Admin => {}
        RoleName::VenueOwner => {
            cond = cond.add(
                reservation::Column::VenueId.in_subquery(
                    Query::select()
                        .column(venue::Column::Id)
                        .from(venue::Entity)
                        .and_where(venue::Column::OwnerId.eq(actor.id))
                        .to_owned(),
                ),
            );
        }
        RoleName::Customer => cond = cond.add(reservation::Column::UserId.eq(actor.id)),
    }
    let select = reservation::Entity::find().filter(cond).order_by_desc(reservation::Column::CreatedAt);
    fetch_page(db, select, opts).await
}

/// Move a reservation along its lifecycle (the venue's owner or an admin).
/// Cancellation goes through the payment-aware cancel path instead.
#[instrument(skip(db))]
pub async fn update_status(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
    next: ReservationStatus,
) -> Result<reservation::Model, ServiceError> {
    let r = get_reservation(db, actor, id).await?;
    if !(actor.is_admin() || venue_owner(db, r.venue_id).await? == Some(actor.id)) {
        return Err(ServiceError::forbidden("only the venue's owner can change reservation status"));
    }
    if next == ReservationStatus::Cancelled {
        return Err(ServiceError::validation("use the cancel operation to cancel a reservation"));
    }
    let current = r.status()?;
    if current == next {
        return Ok(r);
    }
    if !current.can_transition_to(next) {
        return Err(ServiceError::conflict(format!("cannot move reservation from {current} to {next}")));
    }
    let mut am: reservation::ActiveModel = r.into();
    am.status = Set(next.as_str().to_string());
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!(reservation_id = %id, from = %current, to = %next, "reservation_status_changed");
    Ok(updated)
}

/// Transition to CONFIRMED after payment; no-op when already past PENDING.
pub async fn confirm_after_payment<C: sea_orm::ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<reservation::Model>, ServiceError> {
    let Some(r) = reservation::Entity::find_by_id(id).one(db).await? else { return Ok(None) };
    if r.status()? != ReservationStatus::Pending {
        return Ok(Some(r));
    }
    let mut am: reservation::ActiveModel = r.into();
    am.status = Set(ReservationStatus::Confirmed.as_str().to_string());
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!(reservation_id = %id, "reservation_confirmed");
    Ok(Some(updated))
}

/// Cancel PENDING/CONFIRMED reservations. Cancelling twice returns the stored record.
#[instrument(skip(db, reason))]
pub async fn cancel_reservation(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
    reason: Option<String>,
) -> Result<CancelOutcome, ServiceError> {
    let r = get_reservation(db, actor, id).await?;
    let current = r.status()?;
    if current == ReservationStatus::Cancelled {
        return Ok(CancelOutcome { reservation: r, already_cancelled: true });
    }
    if !current.cancellable() {
        warn!(reservation_id = %id, status = %current, "cancel_rejected");
        return Err(ServiceError::conflict(format!("reservation in status {current} cannot be cancelled")));
    }
    let now = Utc::now().into();
    let mut am: reservation::ActiveModel = r.into();
    am.status = Set(ReservationStatus::Cancelled.as_str().to_string());
    am.cancellation_reason = Set(reason.filter(|s| !s.trim().is_empty()));
    am.cancelled_at = Set(Some(now));
    am.updated_at = Set(now);
    let updated = am.update(db).await?;
    RESERVATIONS_CANCELLED_TOTAL.inc();
    info!(reservation_id = %id, "reservation_cancelled");
    Ok(CancelOutcome { reservation: updated, already_cancelled: false })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn svc(unit: PricingUnit, price: i64) -> service::Model {
        let now = Utc::now().into();
        service::Model {
            id: Uuid::new_v4(),
            venue_id: Uuid::new_v4(),
            name: "Room".into(),
            description: None,
            pricing_unit: unit.as_str().into(),
            price_cents: price,
            currency: "usd".into(),
            capacity: 4,
            inventory: 1,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn d(m: u32, day: u32) -> NaiveDate { NaiveDate::from_ymd_opt(2031, m, day).unwrap() }

    #[test]
    fn quote_per_night() {
        assert_eq!(quote_total(&svc(PricingUnit::PerNight, 12_000), d(3, 1), d(3, 4), 2).unwrap(), 36_000);
    }

    #[test]
    fn quote_per_person_scales_with_guests_and_nights() {
        assert_eq!(quote_total(&svc(PricingUnit::PerPerson, 2_500), d(3, 1), d(3, 3), 3).unwrap(), 15_000);
    }

    #[test]
    fn quote_per_booking_is_flat() {
        assert_eq!(quote_total(&svc(PricingUnit::PerBooking, 9_900), d(3, 1), d(3, 8), 4).unwrap(), 9_900);
    }

    #[test]
    fn quote_overflow_is_an_error() {
        assert!(quote_total(&svc(PricingUnit::PerPerson, i64::MAX / 2), d(3, 1), d(3, 3), 3).is_err());
    }

    #[test]
    fn refund_inside_window_is_zero() {
        let policy = RefundPolicy::new(24);
        let check_in = d(5, 10);
        let early = Utc.with_ymd_and_hms(2031, 5, 8, 12, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2031, 5, 9, 12, 0, 0).unwrap();
        assert_eq!(refund_due(policy, check_in, early, 5_000), 5_000);
        assert_eq!(refund_due(policy, check_in, late, 5_000), 0);
        let exact = Utc.with_ymd_and_hms(2031, 5, 9, 0, 0, 0).unwrap();
        assert_eq!(refund_due(policy, check_in, exact, 5_000), 5_000);
        assert_eq!(refund_due(policy, check_in, exact + Duration::minutes(1), 5_000), 0);
    }

    #[test]
    fn oversized_window_never_refunds() {
        let now = Utc.with_ymd_and_hms(2031, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(refund_due(RefundPolicy::new(i64::MAX / 2), d(5, 10), now, 5_000), 0);
        assert_eq!(refund_due(RefundPolicy::new(i64::MAX), d(5, 10), now, 5_000), 0);
    }

    #[test]
    fn zero_window_refunds_until_check_in() {
        let policy = RefundPolicy::new(0);
        let now = Utc.with_ymd_and_hms(2031, 5, 9, 23, 59, 0).unwrap();
        assert_eq!(refund_due(policy, d(5, 10), now, 100), 100);
    }

    #[test]
    fn staff_filters() {
        let f = ReservationFilter { status: Some(ReservationStatus::Pending), from: Some(d(1, 1)), ..Default::default() };
        assert!(!filter_condition(&f).is_empty());
        assert!(filter_condition(&ReservationFilter::default()).is_empty());
    }

    #[tokio::test]
    async fn create_then_cancel_twice() -> Result<(), anyhow::Error> {
        use crate::test_support::{get_db, new_service, new_venue, seed_user};
        let Some(db) = get_db().await? else { return Ok(()) };
        let owner = seed_user(&db, RoleName::VenueOwner).await?;
        let guest = seed_user(&db, RoleName::Customer).await?;
        let owner_actor = Actor::new(owner.id, RoleName::VenueOwner);
        let guest_actor = Actor::new(guest.id, RoleName::Customer);
        let v = crate::venue_service::create_venue(&db, &owner_actor, new_venue("Res Inn")).await?;
        let s = catalog_service::create_service(&db, &owner_actor, v.id, new_service(PricingUnit::PerNight, 10_000, 2, 1), "usd").await?;

        let today = d(1, 1);
        let input = CreateReservation { service_id: s.id, check_in: d(6, 1), check_out: d(6, 3), guests: 2, special_requests: None };
        let r = create_reservation(&db, &guest_actor, input.clone(), today).await?;
        assert_eq!(r.status, "PENDING");
        assert_eq!(r.total_amount_cents, 20_000);

        // single unit is now taken for overlapping dates
        let clash = create_reservation(&db, &guest_actor, input.clone(), today).await;
        assert!(matches!(clash, Err(ServiceError::Conflict(_))));

        let too_many = CreateReservation { guests: 3, check_in: d(7, 1), check_out: d(7, 2), ..input.clone() };
        assert!(matches!(create_reservation(&db, &guest_actor, too_many, today).await, Err(ServiceError::Model(_))));

        let first = cancel_reservation(&db, &guest_actor, r.id, Some("change of plans".into())).await?;
        assert!(!first.already_cancelled);
        assert_eq!(first.reservation.status, "CANCELLED");
        let second = cancel_reservation(&db, &guest_actor, r.id, None).await?;
        assert!(second.already_cancelled);
        assert_eq!(second.reservation.cancelled_at, first.reservation.cancelled_at);

        // a cancelled stay frees the unit again
        let again = create_reservation(&db, &guest_actor, input, today).await?;
        let confirmed = update_status(&db, &owner_actor, again.id, ReservationStatus::Confirmed).await?;
        assert_eq!(confirmed.status, "CONFIRMED");
        let skip = update_status(&db, &owner_actor, again.id, ReservationStatus::CheckedOut).await;
        assert!(matches!(skip, Err(ServiceError::Conflict(_))));
        let page = list_reservations(&db, &owner_actor, ReservationFilter::default(), Pagination::default()).await?;
        assert!(page.items.iter().all(|x| x.venue_id == v.id));
        Ok(())
    }

    #[tokio::test]
    async fn owning_another_venue_grants_no_status_changes() -> Result<(), anyhow::Error> {
        use crate::test_support::{get_db, new_service, new_venue, seed_user};
        let Some(db) = get_db().await? else { return Ok(()) };
        let host = seed_user(&db, RoleName::VenueOwner).await?;
        let other = seed_user(&db, RoleName::VenueOwner).await?;
        let host = Actor::new(host.id, RoleName::VenueOwner);
        let other = Actor::new(other.id, RoleName::VenueOwner);
        let v = crate::venue_service::create_venue(&db, &host, new_venue("Host Inn")).await?;
        let s = catalog_service::create_service(&db, &host, v.id, new_service(PricingUnit::PerNight, 10_000, 2, 1), "usd").await?;

        // the other owner books as a guest and tries to skip payment
        let input = CreateReservation { service_id: s.id, check_in: d(9, 1), check_out: d(9, 2), guests: 1, special_requests: None };
        let r = create_reservation(&db, &other, input, d(1, 1)).await?;
        let res = update_status(&db, &other, r.id, ReservationStatus::Confirmed).await;
        assert!(matches!(res, Err(ServiceError::Forbidden(_))));
        let stored = reservation::Entity::find_by_id(r.id).one(&db).await?.unwrap();
        assert_eq!(stored.status, "PENDING");

        // cancelling is not a status change
        let res = update_status(&db, &host, r.id, ReservationStatus::Cancelled).await;
        assert!(matches!(res, Err(ServiceError::Validation(_))));

        let confirmed = update_status(&db, &host, r.id, ReservationStatus::Confirmed).await?;
        assert_eq!(confirmed.status, "CONFIRMED");
        Ok(())
    }
}

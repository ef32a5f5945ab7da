//! Admin dashboard numbers, revenue/reservation reports and CSV export.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use sea_orm::sea_query::{Alias, Expr, Func};
use sea_orm::{ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use models::{payment, reservation, user, venue, PaymentStatus};
use crate::audit_service::day_bounds;
use crate::errors::ServiceError;
use crate::payment_service::PaymentFilter;

const PAID_STATUSES: [PaymentStatus; 3] = [PaymentStatus::Completed, PaymentStatus::PartiallyRefunded, PaymentStatus::Refunded];

/// Rows beyond this are left out of a single CSV export.
pub const CSV_EXPORT_LIMIT: u64 = 10_000;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: u64,
    pub active_venues: u64,
    pub total_reservations: u64,
    pub reservations_by_status: BTreeMap<String, i64>,
    pub completed_revenue_cents: i64,
    pub refunded_cents: i64,
    pub net_revenue_cents: i64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RevenueDay {
    pub date: Option<NaiveDate>,
    pub gross_cents: i64,
    pub refunded_cents: i64,
    pub net_cents: i64,
    pub payment_count: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RevenueReport {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub days: Vec<RevenueDay>,
    pub totals: RevenueDay,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VenueCount {
    pub venue_id: Uuid,
    pub venue_name: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReservationReport {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub total: i64,
    pub by_status: BTreeMap<String, i64>,
    pub by_venue: Vec<VenueCount>,
}

fn paid_condition() -> Condition {
    PAID_STATUSES.iter().fold(Condition::any(), |c, s| c.add(payment::Column::Status.eq(s.as_str())))
}

#[instrument(skip(db))]
pub async fn dashboard_stats(db: &DatabaseConnection) -> Result<DashboardStats, ServiceError> {
    let total_users = user::Entity::find().count(db).await?;
    let active_venues = venue::Entity::find().filter(venue::Column::IsActive.eq(true)).count(db).await?;
    let by_status = reservations_by_status(db, Condition::all()).await?;
    let total_reservations = by_status.values().sum::<i64>().max(0) as u64;

    let sums: Option<(Option<i64>, Option<i64>)> = payment::Entity::find()
        .select_only()
        .column_as(Expr::expr(Func::cast_as(Func::sum(Expr::col(payment::Column::AmountCents)), Alias::new("BIGINT"))), "gross")
        .column_as(Expr::expr(Func::cast_as(Func::sum(Expr::col(payment::Column::RefundedAmountCents)), Alias::new("BIGINT"))), "refunded")
        .filter(paid_condition())
        .into_tuple()
        .one(db)
        .await?;
    let (gross, refunded) = sums.map(|(g, r)| (g.unwrap_or(0), r.unwrap_or(0))).unwrap_or((0, 0));

    Ok(DashboardStats {
        total_users,
        active_venues,
        total_reservations,
        reservations_by_status: by_status,
        completed_revenue_cents: gross,
        refunded_cents: refunded,
        net_revenue_cents: gross - refunded,
    })
}

async fn reservations_by_status(db: &DatabaseConnection, cond: Condition) -> Result<BTreeMap<String, i64>, ServiceError> {
    let rows: Vec<(String, i64)> = reservation::Entity::find()
        .select_only()
        .column(reservation::Column::Status)
        .column_as(Expr::expr(Func::count(Expr::col(reservation::Column::Id))), "count")
        .filter(cond)
        .group_by(reservation::Column::Status)
        .into_tuple()
        .all(db)
        .await?;
    Ok(rows.into_iter().collect())
}

/// Bucket paid payments by the UTC day they were created.
pub fn aggregate_revenue(payments: &[payment::Model]) -> (Vec<RevenueDay>, RevenueDay) {
    let mut days: BTreeMap<NaiveDate, RevenueDay> = BTreeMap::new();
    let mut totals = RevenueDay::default();
    for p in payments {
        let date = p.created_at.naive_utc().date();
        let day = days.entry(date).or_insert_with(|| RevenueDay { date: Some(date), ..Default::default() });
        for bucket in [&mut *day, &mut totals] {
            bucket.gross_cents += p.amount_cents;
            bucket.refunded_cents += p.refunded_amount_cents;
            bucket.net_cents += p.amount_cents - p.refunded_amount_cents;
            bucket.payment_count += 1;
        }
    }
    (days.into_values().collect(), totals)
}

/// Per-day gross, refunded and net amounts over `[from, to]` (inclusive days).
#[instrument(skip(db))]
pub async fn revenue_report(db: &DatabaseConnection, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<RevenueReport, ServiceError> {
    if let (Some(f), Some(t)) = (from, to) {
        if f > t {
            return Err(ServiceError::validation("from must not be after to"));
        }
    }
    let (start, end) = day_bounds(from, to);
    let mut cond = Condition::all().add(paid_condition());
    if let Some(s) = start {
        cond = cond.add(payment::Column::CreatedAt.gte(s));
    }
    if let Some(e) = end {
        cond = cond.add(payment::Column::CreatedAt.lt(e));
    }
    let rows = payment::Entity::find().filter(cond).order_by_asc(payment::Column::CreatedAt).all(db).await?;
    let (days, totals) = aggregate_revenue(&rows);
    Ok(RevenueReport { from, to, days, totals })
}

/// Reservation counts by status and by venue for stays checking in within `[from, to]`.
#[instrument(skip(db))]
pub async fn reservation_report(db: &DatabaseConnection, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<ReservationReport, ServiceError> {
    let mut cond = Condition::all();
    if let Some(f) = from {
        cond = cond.add(reservation::Column::CheckIn.gte(f));
    }
    if let Some(t) = to {
        cond = cond.add(reservation::Column::CheckIn.lte(t));
    }
    let by_status = reservations_by_status(db, cond.clone()).await?;

    let per_venue: Vec<(Uuid, i64)> = reservation::Entity::find()
        .select_only()
        .column(reservation::Column::VenueId)
        .column_as(Expr::expr(Func::count(Expr::col(reservation::Column::Id))), "count")
        .filter(cond)
        .group_by(reservation::Column::VenueId)
        .into_tuple()
        .all(db)
        .await?;
    let ids: Vec<Uuid> = per_venue.iter().map(|(id, _)| *id).collect();
    let names: HashMap<Uuid, String> = if ids.is_empty() {
        HashMap::new()
    } else {
        venue::Entity::find()
            .filter(venue::Column::Id.is_in(ids))
            .all(db)
            .await?
            .into_iter()
            .map(|v| (v.id, v.name))
            .collect()
    };
    let mut by_venue: Vec<VenueCount> = per_venue
        .into_iter()
        .map(|(venue_id, count)| VenueCount {
            venue_id,
            venue_name: names.get(&venue_id).cloned().unwrap_or_default(),
            count,
        })
        .collect();
    by_venue.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.venue_name.cmp(&b.venue_name)));

    Ok(ReservationReport { from, to, total: by_status.values().sum(), by_status, by_venue })
}

const CSV_HEADER: [&str; 10] = [
    "id",
    "reservation_id",
    "user_id",
    "status",
    "amount_cents",
    "refunded_amount_cents",
    "currency",
    "provider",
    "provider_payment_id",
    "created_at",
];

#[derive(Serialize)]
struct PaymentCsvRow<'a> {
    id: Uuid,
    reservation_id: Uuid,
    user_id: Uuid,
    status: &'a str,
    amount_cents: i64,
    refunded_amount_cents: i64,
    currency: &'a str,
    provider: &'a str,
    provider_payment_id: &'a str,
    created_at: String,
}

pub fn write_payments_csv(rows: &[payment::Model]) -> Result<String, ServiceError> {
    let mut w = csv::Writer::from_writer(Vec::new());
    if rows.is_empty() {
        w.write_record(CSV_HEADER)?;
    }
    for p in rows {
        w.serialize(PaymentCsvRow {
            id: p.id,
            reservation_id: p.reservation_id,
            user_id: p.user_id,
            status: &p.status,
            amount_cents: p.amount_cents,
            refunded_amount_cents: p.refunded_amount_cents,
            currency: &p.currency,
            provider: &p.provider,
            provider_payment_id: p.provider_payment_id.as_deref().unwrap_or(""),
            created_at: p.created_at.to_rfc3339(),
        })?;
    }
    let bytes = w.into_inner().map_err(|e| ServiceError::Internal(format!("csv export failed: {e}")))?;
    String::from_utf8(bytes).map_err(|e| ServiceError::Internal(e.to_string()))
}

/// CSV export of payments matching the admin filter, oldest first.
#[instrument(skip(db))]
pub async fn payments_csv(db: &DatabaseConnection, filter: PaymentFilter) -> Result<String, ServiceError> {
    let rows = payment::Entity::find()
        .filter(filter.condition())
        .order_by_asc(payment::Column::CreatedAt)
        .limit(CSV_EXPORT_LIMIT)
        .all(db)
        .await?;
    write_payments_csv(&rows)
}

//! Append-only log of administrative actions.

use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};
use uuid::Uuid;

use models::admin_audit_log;
use crate::errors::ServiceError;
use crate::pagination::{fetch_page, Page, Pagination};

pub const ACTION_REFUND: &str = "payment.refund";
pub const ACTION_BULK_REFUND: &str = "payment.bulk_refund";
pub const ACTION_BULK_CANCEL: &str = "payment.bulk_cancel";
pub const ACTION_RECEIPT_VERIFY: &str = "receipt.bulk_verify";
pub const ACTION_USER_ROLE: &str = "user.set_role";
pub const ACTION_USER_ACTIVATION: &str = "user.set_active";
pub const ACTION_ROLE_CREATE: &str = "role.create";
pub const ACTION_ROLE_PERMISSIONS: &str = "role.set_permissions";
pub const ACTION_CONFIG_SET: &str = "config.set";
pub const ACTION_CONFIG_DELETE: &str = "config.delete";
pub const ACTION_REVIEW_MODERATE: &str = "review.moderate";
pub const ACTION_REVIEW_DELETE: &str = "review.delete";
pub const ACTION_RESERVATION_STATUS: &str = "reservation.set_status";

#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub admin_id: Uuid,
    pub action: &'static str,
    pub entity_type: &'static str,
    pub entity_id: Option<Uuid>,
    pub details: Option<Value>,
    pub ip_address: Option<String>,
}

impl NewAuditEntry {
    pub fn new(admin_id: Uuid, action: &'static str, entity_type: &'static str, entity_id: Option<Uuid>) -> Self {
        Self { admin_id, action, entity_type, entity_id, details: None, ip_address: None }
    }

    pub fn details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn ip(mut self, ip: Option<String>) -> Self {
        self.ip_address = ip;
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditFilter {
    pub admin_id: Option<Uuid>,
    pub action: Option<String>,
    pub entity_type: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[instrument(skip(db, entry), fields(action = entry.action, admin_id = %entry.admin_id))]
pub async fn record(db: &DatabaseConnection, entry: NewAuditEntry) -> Result<admin_audit_log::Model, ServiceError> {
    let am = admin_audit_log::ActiveModel {
        id: Set(Uuid::new_v4()),
        admin_id: Set(entry.admin_id),
        action: Set(entry.action.to_string()),
        entity_type: Set(entry.entity_type.to_string()),
        entity_id: Set(entry.entity_id),
        details: Set(entry.details),
        ip_address: Set(entry.ip_address),
        created_at: Set(Utc::now().into()),
    };
    let saved = am.insert(db).await?;
    debug!(audit_id = %saved.id, "audit_recorded");
    Ok(saved)
}

/// Inclusive date range as `[from 00:00, to+1 00:00)` in UTC.
pub(crate) fn day_bounds(from: Option<NaiveDate>, to: Option<NaiveDate>) -> (Option<chrono::DateTime<Utc>>, Option<chrono::DateTime<Utc>>) {
    let start = from.and_then(|d| d.and_hms_opt(0, 0, 0)).map(|d| d.and_utc());
    let end = to.and_then(|d| d.succ_opt()).and_then(|d| d.and_hms_opt(0, 0, 0)).map(|d| d.and_utc());
    (start, end)
}

pub async fn list(db: &DatabaseConnection, filter: AuditFilter, opts: Pagination) -> Result<Page<admin_audit_log::Model>, ServiceError> {
    let mut cond = Condition::all();
    if let Some(a) = filter.admin_id {
        cond = cond.add(admin_audit_log::Column::AdminId.eq(a));
    }
    if let Some(action) = filter.action.filter(|s| !s.is_empty()) {
        cond = cond.add(admin_audit_log::Column::Action.eq(action));
    }
    if let Some(t) = filter.entity_type.filter(|s| !s.is_empty()) {
        cond = cond.add(admin_audit_log::Column::EntityType.eq(t));
    }
    let (start, end) = day_bounds(filter.from, filter.to);
    if let Some(s) = start {
        cond = cond.add(admin_audit_log::Column::CreatedAt.gte(s));
    }
    if let Some(e) = end {
        cond = cond.add(admin_audit_log::Column::CreatedAt.lt(e));
    }
    let select = admin_audit_log::Entity::find().filter(cond).order_by_desc(admin_audit_log::Column::CreatedAt);
    fetch_page(db, select, opts).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{get_db, seed_user};
    use models::RoleName;

    #[test]
    fn day_bounds_are_half_open() {
        let d = NaiveDate::from_ymd_opt(2031, 2, 28).unwrap();
        let (s, e) = day_bounds(Some(d), Some(d));
        assert_eq!(s.unwrap().to_rfc3339(), "2031-02-28T00:00:00+00:00");
        assert_eq!(e.unwrap().to_rfc3339(), "2031-03-01T00:00:00+00:00");
        assert_eq!(day_bounds(None, None), (None, None));
    }

    #[tokio::test]
    async fn record_and_filter() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await? else { return Ok(()) };
        let admin = seed_user(&db, RoleName::Admin).await?;
        let target = Uuid::new_v4();
        record(&db, NewAuditEntry::new(admin.id, ACTION_REFUND, "payment", Some(target)).details(serde_json::json!({"amountCents": 100}))).await?;
        record(&db, NewAuditEntry::new(admin.id, ACTION_CONFIG_SET, "system_config", None)).await?;

        let page = list(&db, AuditFilter { admin_id: Some(admin.id), action: Some(ACTION_REFUND.into()), ..Default::default() }, Pagination::default()).await?;
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].entity_id, Some(target));
        Ok(())
    }
}

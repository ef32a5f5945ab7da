//! Back-office endpoints. Every route requires an ADMIN token and every
//! mutation leaves an entry in the audit log.

use std::path::PathBuf;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use common::types::ApiResponse;
use models::status::{ReservationStatus, RoleName};
use models::{admin_audit_log, payment, permission, receipt, reservation, review, role, system_config, user};
use serde::Deserialize;
use serde_json::{json, Value};
use service::audit_service::{self, AuditFilter, NewAuditEntry};
use service::bulk_service::{self, BulkResult};
use service::pagination::{Page, Pagination};
use service::payment_service::PaymentFilter;
use service::rbac_service::{self, RoleWithPermissions};
use service::report_service::{self, DashboardStats, ReservationReport, RevenueReport};
use service::{receipt_service, reservation_service, review_service, settings_service, user_service};
use tracing::{info, warn};
use uuid::Uuid;

use super::{ok, ok_with, ApiResult};
use crate::auth::{client_ip, AdminUser};
use crate::errors::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/payments", get(list_payments))
        .route("/payments/bulk-refund", post(bulk_refund))
        .route("/payments/bulk-cancel", post(bulk_cancel))
        .route("/payments/:id/refund", post(refund))
        .route("/receipts/bulk-verify", post(bulk_verify))
        .route("/receipts/:id/verify", post(verify_receipt))
        .route("/audit-logs", get(audit_logs))
        .route("/reports/revenue", get(revenue_report))
        .route("/reports/reservations", get(reservation_report))
        .route("/reports/payments.csv", get(payments_csv))
        .route("/roles", get(list_roles).post(create_role))
        .route("/roles/:id/permissions", put(set_role_permissions))
        .route("/permissions", get(list_permissions))
        .route("/users/:id/role", patch(set_user_role))
        .route("/users/:id/active", patch(set_user_active))
        .route("/config", get(list_config))
        .route("/config/:key", put(set_config).delete(delete_config))
        .route("/reviews/:id/moderate", patch(moderate_review))
        .route("/reviews/:id", axum::routing::delete(delete_review))
        .route("/reservations/:id/status", patch(set_reservation_status))
}

/// Write an audit entry; a failed write is logged and never fails the request.
async fn audit(state: &AppState, headers: &HeaderMap, entry: NewAuditEntry) {
    let action = entry.action;
    if let Err(e) = audit_service::record(&state.db, entry.ip(client_ip(headers))).await {
        warn!(error = %e, action, "audit_record_failed");
    }
}

fn bulk_details(result: &BulkResult) -> Value {
    json!({ "succeeded": result.succeeded.len(), "failed": result.failed.len() })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundRequest {
    pub amount_cents: Option<i64>,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkIds {
    pub ids: Vec<Uuid>,
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct NewRole {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RolePermissions {
    pub permissions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetRole {
    pub role: RoleName,
}

#[derive(Debug, Deserialize)]
pub struct SetActive {
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct ConfigValue {
    pub value: Value,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Moderation {
    pub published: bool,
}

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: ReservationStatus,
}

pub async fn dashboard(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<DashboardStats> {
    ok(report_service::dashboard_stats(&state.db).await?)
}

pub async fn list_payments(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(filter): Query<PaymentFilter>,
    Query(page): Query<Pagination>,
) -> ApiResult<Page<payment::Model>> {
    ok(state.payments.list(filter, page).await?)
}

pub async fn refund(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    body: Option<Json<RefundRequest>>,
) -> ApiResult<payment::Model> {
    let (amount, reason) = body.map(|Json(b)| (b.amount_cents, b.reason)).unwrap_or_default();
    let updated = state.payments.refund_payment(&admin, id, amount, reason.clone()).await?;
    let entry = NewAuditEntry::new(admin.id, audit_service::ACTION_REFUND, "payment", Some(id))
        .details(json!({ "amountCents": amount, "reason": reason, "status": updated.status }));
    audit(&state, &headers, entry).await;
    ok_with(updated, "refund issued")
}

pub async fn bulk_refund(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    headers: HeaderMap,
    Json(body): Json<BulkIds>,
) -> ApiResult<BulkResult> {
    let result = bulk_service::bulk_refund(&state.payments, &admin, &body.ids, body.reason, state.max_bulk_items()).await?;
    let entry = NewAuditEntry::new(admin.id, audit_service::ACTION_BULK_REFUND, "payment", None).details(bulk_details(&result));
    audit(&state, &headers, entry).await;
    ok(result)
}

pub async fn bulk_cancel(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    headers: HeaderMap,
    Json(body): Json<BulkIds>,
) -> ApiResult<BulkResult> {
    let result = bulk_service::bulk_cancel_pending(&state.payments, &admin, &body.ids, state.max_bulk_items()).await?;
    let entry = NewAuditEntry::new(admin.id, audit_service::ACTION_BULK_CANCEL, "payment", None).details(bulk_details(&result));
    audit(&state, &headers, entry).await;
    ok(result)
}

pub async fn bulk_verify(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    headers: HeaderMap,
    Json(body): Json<BulkIds>,
) -> ApiResult<BulkResult> {
    let result = receipt_service::bulk_verify_receipts(&state.db, &body.ids, admin.id, state.max_bulk_items()).await?;
    let entry = NewAuditEntry::new(admin.id, audit_service::ACTION_RECEIPT_VERIFY, "receipt", None).details(bulk_details(&result));
    audit(&state, &headers, entry).await;
    ok(result)
}

pub async fn verify_receipt(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> ApiResult<receipt::Model> {
    let verified = receipt_service::verify_receipt(&state.db, id, admin.id).await?;
    audit(&state, &headers, NewAuditEntry::new(admin.id, audit_service::ACTION_RECEIPT_VERIFY, "receipt", Some(id))).await;
    ok(verified)
}

pub async fn audit_logs(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(filter): Query<AuditFilter>,
    Query(page): Query<Pagination>,
) -> ApiResult<Page<admin_audit_log::Model>> {
    ok(audit_service::list(&state.db, filter, page).await?)
}

pub async fn revenue_report(State(state): State<AppState>, _admin: AdminUser, Query(range): Query<DateRange>) -> ApiResult<RevenueReport> {
    ok(report_service::revenue_report(&state.db, range.from, range.to).await?)
}

pub async fn reservation_report(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(range): Query<DateRange>,
) -> ApiResult<ReservationReport> {
    ok(report_service::reservation_report(&state.db, range.from, range.to).await?)
}

/// CSV download; a copy is kept under `<data_dir>/exports` for later reference.
pub async fn payments_csv(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(filter): Query<PaymentFilter>,
) -> Result<Response, ApiError> {
    let body = report_service::payments_csv(&state.db, filter).await?;
    let name = format!("payments-{}.csv", Utc::now().format("%Y%m%d%H%M%S"));
    let dir = PathBuf::from(&state.config.server.data_dir).join("exports");
    let archived = match tokio::fs::create_dir_all(&dir).await {
        Ok(()) => tokio::fs::write(dir.join(&name), body.as_bytes()).await,
        Err(e) => Err(e),
    };
    match archived {
        Ok(()) => info!(file = %name, "payments_csv_archived"),
        Err(e) => warn!(error = %e, "payments_csv_archive_failed"),
    }
    let disposition = format!("attachment; filename=\"{name}\"");
    Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()), (header::CONTENT_DISPOSITION, disposition)], body)
        .into_response())
}

pub async fn list_roles(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Vec<RoleWithPermissions>> {
    ok(rbac_service::list_roles(&state.db).await?)
}

pub async fn create_role(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    headers: HeaderMap,
    Json(body): Json<NewRole>,
) -> ApiResult<role::Model> {
    let created = rbac_service::create_role(&state.db, &body.name, body.description).await?;
    let entry = NewAuditEntry::new(admin.id, audit_service::ACTION_ROLE_CREATE, "role", Some(created.id))
        .details(json!({ "name": created.name }));
    audit(&state, &headers, entry).await;
    ok_with(created, "role created")
}

pub async fn set_role_permissions(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<RolePermissions>,
) -> ApiResult<RoleWithPermissions> {
    let updated = rbac_service::set_role_permissions(&state.db, id, &body.permissions).await?;
    let entry = NewAuditEntry::new(admin.id, audit_service::ACTION_ROLE_PERMISSIONS, "role", Some(id))
        .details(json!({ "permissions": updated.permissions }));
    audit(&state, &headers, entry).await;
    ok(updated)
}

pub async fn list_permissions(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Vec<permission::Model>> {
    ok(rbac_service::list_permissions(&state.db).await?)
}

pub async fn set_user_role(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<SetRole>,
) -> ApiResult<user::Model> {
    let updated = user_service::set_role(&state.db, &admin, id, body.role).await?;
    let entry = NewAuditEntry::new(admin.id, audit_service::ACTION_USER_ROLE, "user", Some(id))
        .details(json!({ "role": body.role }));
    audit(&state, &headers, entry).await;
    ok(updated)
}

pub async fn set_user_active(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<SetActive>,
) -> ApiResult<user::Model> {
    let updated = user_service::set_active(&state.db, &admin, id, body.active).await?;
    let entry = NewAuditEntry::new(admin.id, audit_service::ACTION_USER_ACTIVATION, "user", Some(id))
        .details(json!({ "active": body.active }));
    audit(&state, &headers, entry).await;
    ok(updated)
}

pub async fn list_config(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Vec<system_config::Model>> {
    ok(settings_service::list_configs(&state.db).await?)
}

pub async fn set_config(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    headers: HeaderMap,
    Path(key): Path<String>,
    Json(body): Json<ConfigValue>,
) -> ApiResult<system_config::Model> {
    let saved = settings_service::set_config(&state.db, &key, body.value, body.description, admin.id).await?;
    let entry = NewAuditEntry::new(admin.id, audit_service::ACTION_CONFIG_SET, "system_config", None)
        .details(json!({ "key": key, "value": saved.value }));
    audit(&state, &headers, entry).await;
    ok(saved)
}

pub async fn delete_config(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    headers: HeaderMap,
    Path(key): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    settings_service::delete_config(&state.db, &key).await?;
    let entry = NewAuditEntry::new(admin.id, audit_service::ACTION_CONFIG_DELETE, "system_config", None).details(json!({ "key": key }));
    audit(&state, &headers, entry).await;
    Ok(Json(ApiResponse::message("config deleted")))
}

pub async fn moderate_review(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<Moderation>,
) -> ApiResult<review::Model> {
    let updated = review_service::moderate(&state.db, id, body.published).await?;
    let entry = NewAuditEntry::new(admin.id, audit_service::ACTION_REVIEW_MODERATE, "review", Some(id))
        .details(json!({ "published": body.published }));
    audit(&state, &headers, entry).await;
    ok(updated)
}

pub async fn delete_review(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    review_service::delete_review(&state.db, &admin, id).await?;
    audit(&state, &headers, NewAuditEntry::new(admin.id, audit_service::ACTION_REVIEW_DELETE, "review", Some(id))).await;
    Ok(Json(ApiResponse::message("review deleted")))
}

pub async fn set_reservation_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusChange>,
) -> ApiResult<reservation::Model> {
    let updated = if body.status == ReservationStatus::Cancelled {
        super::reservations::cancel_with_policy(&state, &admin, id, None).await?.reservation
    } else {
        reservation_service::update_status(&state.db, &admin, id, body.status).await?
    };
    let entry = NewAuditEntry::new(admin.id, audit_service::ACTION_RESERVATION_STATUS, "reservation", Some(id))
        .details(json!({ "status": body.status }));
    audit(&state, &headers, entry).await;
    ok(updated)
}

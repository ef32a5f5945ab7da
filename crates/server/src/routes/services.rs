use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use models::service::{self as svc_model, NewService};
use serde::Deserialize;
use service::catalog_service::{self, Availability, ServiceFilter, UpdateService};
use service::pagination::{Page, Pagination};
use uuid::Uuid;

use super::{ok, ok_with, ApiResult};
use crate::auth::{CurrentUser, MaybeUser};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(get_one).patch(update).delete(deactivate))
        .route("/:id/availability", get(availability))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateServiceRequest {
    pub venue_id: Uuid,
    #[serde(flatten)]
    pub service: NewService,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

pub async fn list(
    State(state): State<AppState>,
    MaybeUser(actor): MaybeUser,
    Query(mut filter): Query<ServiceFilter>,
    Query(page): Query<Pagination>,
) -> ApiResult<Page<svc_model::Model>> {
    // retired services stay hidden from the public catalogue
    if !actor.map(|a| a.is_admin()).unwrap_or(false) {
        filter.include_inactive = false;
    }
    ok(catalog_service::list_services(&state.db, filter, page).await?)
}

pub async fn create(State(state): State<AppState>, user: CurrentUser, Json(req): Json<CreateServiceRequest>) -> ApiResult<svc_model::Model> {
    let created =
        catalog_service::create_service(&state.db, &user.actor, req.venue_id, req.service, &state.config.payments.currency).await?;
    ok_with(created, "service created")
}

pub async fn get_one(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<svc_model::Model> {
    ok(catalog_service::get_service(&state.db, id).await?)
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateService>,
) -> ApiResult<svc_model::Model> {
    ok(catalog_service::update_service(&state.db, &user.actor, id, input).await?)
}

pub async fn deactivate(State(state): State<AppState>, user: CurrentUser, Path(id): Path<Uuid>) -> ApiResult<svc_model::Model> {
    ok_with(catalog_service::deactivate_service(&state.db, &user.actor, id).await?, "service deactivated")
}

#[utoipa::path(get, path = "/api/services/{id}/availability", tag = "services", params(("id" = Uuid, Path, description = "Service ID"), ("checkIn" = String, Query, description = "YYYY-MM-DD"), ("checkOut" = String, Query, description = "YYYY-MM-DD")), responses((status = 200, description = "Availability"), (status = 400, description = "Invalid range")))]
pub async fn availability(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(q): Query<AvailabilityQuery>,
) -> ApiResult<Availability> {
    ok(catalog_service::check_availability(&state.db, id, q.check_in, q.check_out).await?)
}

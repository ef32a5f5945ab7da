use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use models::{review, service as svc_model, venue};
use service::catalog_service::{self, ServiceFilter};
use service::pagination::{Page, Pagination};
use service::review_service::{self, CreateReview};
use service::venue_service::{self, UpdateVenue, VenueDetail, VenueFilter};
use uuid::Uuid;

use super::{ok, ok_with, ApiResult};
use crate::auth::{CurrentUser, MaybeUser};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(get_one).patch(update).delete(deactivate))
        .route("/:id/services", get(list_services))
        .route("/:id/reviews", get(list_reviews).post(create_review))
}

#[utoipa::path(get, path = "/api/venues", tag = "venues", responses((status = 200, description = "Paginated venues")))]
pub async fn list(
    State(state): State<AppState>,
    MaybeUser(actor): MaybeUser,
    Query(filter): Query<VenueFilter>,
    Query(page): Query<Pagination>,
) -> ApiResult<Page<venue::Model>> {
    ok(venue_service::list_venues(&state.db, actor.as_ref(), filter, page).await?)
}

pub async fn create(State(state): State<AppState>, user: CurrentUser, Json(input): Json<venue::NewVenue>) -> ApiResult<venue::Model> {
    ok_with(venue_service::create_venue(&state.db, &user.actor, input).await?, "venue created")
}

#[utoipa::path(get, path = "/api/venues/{id}", tag = "venues", params(("id" = Uuid, Path, description = "Venue ID")), responses((status = 200, description = "Venue with rating"), (status = 404, description = "Not found")))]
pub async fn get_one(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<VenueDetail> {
    ok(venue_service::get_venue_detail(&state.db, id).await?)
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateVenue>,
) -> ApiResult<venue::Model> {
    ok(venue_service::update_venue(&state.db, &user.actor, id, input).await?)
}

pub async fn deactivate(State(state): State<AppState>, user: CurrentUser, Path(id): Path<Uuid>) -> ApiResult<venue::Model> {
    ok_with(venue_service::deactivate_venue(&state.db, &user.actor, id).await?, "venue deactivated")
}

pub async fn list_services(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(page): Query<Pagination>,
) -> ApiResult<Page<svc_model::Model>> {
    let filter = ServiceFilter { venue_id: Some(id), ..Default::default() };
    ok(catalog_service::list_services(&state.db, filter, page).await?)
}

pub async fn list_reviews(
    State(state): State<AppState>,
    MaybeUser(actor): MaybeUser,
    Path(id): Path<Uuid>,
    Query(page): Query<Pagination>,
) -> ApiResult<Page<review::Model>> {
    let include_hidden = actor.map(|a| a.is_admin()).unwrap_or(false);
    ok(review_service::list_for_venue(&state.db, id, include_hidden, page).await?)
}

pub async fn create_review(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<CreateReview>,
) -> ApiResult<review::Model> {
    ok_with(review_service::create_review(&state.db, &user.actor, id, input).await?, "review created")
}

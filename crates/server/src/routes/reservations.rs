use axum::extract::{Path, Query, State};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::Utc;
use models::{reservation, ReservationStatus};
use serde::Deserialize;
use service::auth::Actor;
use service::pagination::{Page, Pagination};
use service::payment_service::CancellationResult;
use service::reservation_service::{self, CreateReservation, ReservationFilter};
use service::settings_service;
use uuid::Uuid;

use super::{ok, ok_with, ApiResult};
use crate::auth::CurrentUser;
use crate::errors::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(get_one))
        .route("/:id/status", patch(update_status))
        .route("/:id/cancel", post(cancel))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: ReservationStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

/// Guests see their own, owners their venues', admins everything.
pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(filter): Query<ReservationFilter>,
    Query(page): Query<Pagination>,
) -> ApiResult<Page<reservation::Model>> {
    ok(reservation_service::list_reservations(&state.db, &user.actor, filter, page).await?)
}

#[utoipa::path(post, path = "/api/reservations", tag = "reservations", request_body = crate::openapi::CreateReservationRequest, responses((status = 200, description = "Created"), (status = 400, description = "Invalid input"), (status = 409, description = "Not available")))]
pub async fn create(State(state): State<AppState>, user: CurrentUser, Json(input): Json<CreateReservation>) -> ApiResult<reservation::Model> {
    let today = Utc::now().date_naive();
    let created = reservation_service::create_reservation(&state.db, &user.actor, input, today).await?;
    ok_with(created, "reservation created")
}

pub async fn get_one(State(state): State<AppState>, user: CurrentUser, Path(id): Path<Uuid>) -> ApiResult<reservation::Model> {
    ok(reservation_service::get_reservation(&state.db, &user.actor, id).await?)
}

pub async fn update_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusUpdate>,
) -> ApiResult<reservation::Model> {
    if body.status == ReservationStatus::Cancelled {
        return ok(cancel_with_policy(&state, &user.actor, id, None).await?.reservation);
    }
    ok(reservation_service::update_status(&state.db, &user.actor, id, body.status).await?)
}

pub(crate) async fn cancel_with_policy(
    state: &AppState,
    actor: &Actor,
    id: Uuid,
    reason: Option<String>,
) -> Result<CancellationResult, ApiError> {
    let policy = settings_service::effective_refund_policy(&state.db, state.refund_policy()).await?;
    Ok(state.payments.cancel_reservation_with_refund(actor, id, reason, policy).await?)
}

#[utoipa::path(post, path = "/api/reservations/{id}/cancel", tag = "reservations", params(("id" = Uuid, Path, description = "Reservation ID")), request_body = crate::openapi::CancelReservationRequest, responses((status = 200, description = "Cancelled (repeat calls return the stored record)"), (status = 409, description = "Not cancellable")))]
pub async fn cancel(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    body: Option<Json<CancelRequest>>,
) -> ApiResult<CancellationResult> {
    let reason = body.and_then(|Json(b)| b.reason);
    let result = cancel_with_policy(&state, &user.actor, id, reason).await?;
    let message = if result.already_cancelled { "reservation was already cancelled" } else { "reservation cancelled" };
    ok_with(result, message)
}

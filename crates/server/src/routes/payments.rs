use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use models::{payment, receipt};
use serde::Deserialize;
use service::pagination::{Page, Pagination};
use service::payment_service::{PaymentIntentResponse, WebhookOutcome};
use service::receipt_service;
use tracing::warn;
use uuid::Uuid;

use super::{ok, ApiResult};
use crate::auth::CurrentUser;
use crate::errors::ApiError;
use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/create-intent", post(create_intent))
        .route("/webhook", post(webhook))
        .route("/:id", get(get_one))
        .route("/:id/confirm", post(confirm))
        .route("/:id/receipt", get(get_receipt))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentRequest {
    pub reservation_id: Uuid,
}

#[utoipa::path(post, path = "/api/payments/create-intent", tag = "payments", request_body = crate::openapi::CreateIntentRequest, responses((status = 200, description = "Payment and client secret"), (status = 409, description = "Reservation not payable"), (status = 502, description = "Gateway error")))]
pub async fn create_intent(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateIntentRequest>,
) -> ApiResult<PaymentIntentResponse> {
    ok(state.payments.create_payment_intent(&user.actor, req.reservation_id).await?)
}

pub async fn confirm(State(state): State<AppState>, user: CurrentUser, Path(id): Path<Uuid>) -> ApiResult<payment::Model> {
    ok(state.payments.confirm_payment(&user.actor, id).await?)
}

/// Gateway callback; authenticated by its signature, not by a user token.
#[utoipa::path(post, path = "/api/payments/webhook", tag = "payments", responses((status = 200, description = "Processed, duplicate or ignored"), (status = 400, description = "Bad signature")))]
pub async fn webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> ApiResult<WebhookOutcome> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest(format!("missing {SIGNATURE_HEADER} header")))?;
    match state.payments.handle_webhook(&body, signature).await {
        Ok(outcome) => ok(outcome),
        Err(e) => {
            warn!(error = %e, "webhook_rejected");
            Err(e.into())
        }
    }
}

pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(page): Query<Pagination>,
) -> ApiResult<Page<payment::Model>> {
    ok(state.payments.list_for_user(user.actor.id, page).await?)
}

pub async fn get_one(State(state): State<AppState>, user: CurrentUser, Path(id): Path<Uuid>) -> ApiResult<payment::Model> {
    ok(state.payments.get_payment(&user.actor, id).await?)
}

pub async fn get_receipt(State(state): State<AppState>, user: CurrentUser, Path(id): Path<Uuid>) -> ApiResult<receipt::Model> {
    ok(receipt_service::get_by_payment(&state.db, &user.actor, id).await?)
}

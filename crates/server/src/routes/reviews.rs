use axum::extract::{Path, State};
use axum::routing::patch;
use axum::{Json, Router};
use common::types::ApiResponse;
use models::review;
use service::review_service::{self, UpdateReview};
use uuid::Uuid;

use super::{ok, ApiResult};
use crate::auth::CurrentUser;
use crate::errors::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/:id", patch(update).delete(remove))
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateReview>,
) -> ApiResult<review::Model> {
    ok(review_service::update_review(&state.db, &user.actor, id, input).await?)
}

pub async fn remove(State(state): State<AppState>, user: CurrentUser, Path(id): Path<Uuid>) -> Result<Json<ApiResponse<()>>, ApiError> {
    review_service::delete_review(&state.db, &user.actor, id).await?;
    Ok(Json(ApiResponse::message("review deleted")))
}

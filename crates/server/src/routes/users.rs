use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use models::user;
use service::pagination::{Page, Pagination};
use service::user_service::{self, UpdateProfile, UserFilter};
use uuid::Uuid;

use super::{ok, ok_with, ApiResult};
use crate::auth::{AdminUser, CurrentUser};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/:id", get(get_one).patch(update).delete(deactivate))
}

pub async fn list(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(filter): Query<UserFilter>,
    Query(page): Query<Pagination>,
) -> ApiResult<Page<user::Model>> {
    ok(user_service::list_users(&state.db, filter, page).await?)
}

pub async fn get_one(State(state): State<AppState>, me: CurrentUser, Path(id): Path<Uuid>) -> ApiResult<user::Model> {
    ok(user_service::get_user_for(&state.db, &me.actor, id).await?)
}

pub async fn update(
    State(state): State<AppState>,
    me: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateProfile>,
) -> ApiResult<user::Model> {
    ok(user_service::update_profile(&state.db, &me.actor, id, input).await?)
}

/// Accounts are deactivated rather than removed; reservations and payments keep their owner.
pub async fn deactivate(State(state): State<AppState>, me: CurrentUser, Path(id): Path<Uuid>) -> ApiResult<user::Model> {
    ok_with(user_service::set_active(&state.db, &me.actor, id, false).await?, "account deactivated")
}

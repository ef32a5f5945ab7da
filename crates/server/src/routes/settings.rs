use std::collections::BTreeMap;

use axum::extract::State;
use axum::routing::{get, put};
use axum::{Json, Router};
use common::types::ApiResponse;
use models::user;
use serde::Deserialize;
use serde_json::Value;
use service::settings_service;
use service::user_service::{self, UpdateProfile};

use super::{ok, ApiResult};
use crate::auth::CurrentUser;
use crate::errors::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/public", get(public))
        .route("/profile", get(profile).patch(update_profile))
        .route("/password", put(change_password))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePassword {
    pub current_password: String,
    pub new_password: String,
}

/// Settings under the `public.` prefix, readable without a token.
pub async fn public(State(state): State<AppState>) -> ApiResult<BTreeMap<String, Value>> {
    ok(settings_service::public_settings(&state.db).await?)
}

pub async fn profile(State(state): State<AppState>, me: CurrentUser) -> ApiResult<user::Model> {
    ok(user_service::get_user_for(&state.db, &me.actor, me.actor.id).await?)
}

pub async fn update_profile(State(state): State<AppState>, me: CurrentUser, Json(input): Json<UpdateProfile>) -> ApiResult<user::Model> {
    ok(user_service::update_profile(&state.db, &me.actor, me.actor.id, input).await?)
}

pub async fn change_password(
    State(state): State<AppState>,
    me: CurrentUser,
    Json(body): Json<ChangePassword>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.auth.change_password(me.actor.id, &body.current_password, &body.new_password).await?;
    Ok(Json(ApiResponse::message("password updated")))
}

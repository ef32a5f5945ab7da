use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use common::types::ApiResponse;
use service::auth::domain::{AuthSession, AuthUser, LoginInput, RegisterInput};
use service::email::templates;
use tracing::info;

use super::{ok_with, ApiResult};
use crate::auth::{CurrentUser, AUTH_COOKIE};
use crate::errors::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

#[utoipa::path(post, path = "/api/auth/register", tag = "auth", request_body = crate::openapi::RegisterRequest, responses((status = 200, description = "Registered"), (status = 400, description = "Bad Request"), (status = 409, description = "Conflict")))]
pub async fn register(State(state): State<AppState>, Json(input): Json<RegisterInput>) -> ApiResult<AuthUser> {
    let user = state.auth.register(input).await?;
    state.mailer.dispatch(templates::welcome(&user.email, &user.name));
    info!(user_id = %user.id, "user_registered");
    ok_with(user, "registered")
}

#[utoipa::path(post, path = "/api/auth/login", tag = "auth", request_body = crate::openapi::LoginRequest, responses((status = 200, description = "Logged in"), (status = 401, description = "Unauthorized")))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(input): Json<LoginInput>,
) -> Result<(CookieJar, Json<ApiResponse<AuthSession>>), ApiError> {
    let session = state.auth.login(input).await?;
    let mut cookie = Cookie::new(AUTH_COOKIE, session.token.clone());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_secure(state.config.auth.secure_cookies);
    cookie.set_same_site(SameSite::Lax);
    Ok((jar.add(cookie), Json(ApiResponse::ok(session))))
}

pub async fn logout(jar: CookieJar) -> (CookieJar, Json<ApiResponse<()>>) {
    let mut cookie = Cookie::from(AUTH_COOKIE);
    cookie.set_path("/");
    (jar.remove(cookie), Json(ApiResponse::message("logged out")))
}

#[utoipa::path(get, path = "/api/auth/me", tag = "auth", responses((status = 200, description = "Current user"), (status = 401, description = "Unauthorized")))]
pub async fn me(State(state): State<AppState>, user: CurrentUser) -> ApiResult<AuthUser> {
    let me = state.auth.current_user(user.actor.id).await?;
    super::ok(me)
}

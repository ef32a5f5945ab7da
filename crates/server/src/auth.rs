//! Token extraction and the authenticated-caller extractors.
//!
//! `authenticate` runs on every request: a present but invalid token is
//! rejected with 401, a valid one is checked against the stored account
//! (deactivated users get 403, the role comes from storage) and leaves its
//! `Claims` in the request extensions. Handlers opt in with `CurrentUser`,
//! `AdminUser` or `MaybeUser`.

use axum::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use service::auth::{Actor, Claims};
use tracing::warn;

use crate::errors::ApiError;
use crate::state::AppState;

pub const AUTH_COOKIE: &str = "auth_token";

/// Bearer token from `Authorization`, falling back to the `auth_token` cookie.
pub fn extract_token(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        let raw = value.to_str().map_err(|_| ApiError::Unauthorized("invalid Authorization header".into()))?;
        let token = raw
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("expected a Bearer token".into()))?
            .trim();
        if token.is_empty() {
            return Err(ApiError::Unauthorized("empty bearer token".into()));
        }
        return Ok(Some(token.to_string()));
    }
    let jar = CookieJar::from_headers(headers);
    Ok(jar.get(AUTH_COOKIE).map(|c| c.value().to_string()).filter(|t| !t.is_empty()))
}

pub async fn authenticate(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let token = match extract_token(req.headers()) {
        Ok(t) => t,
        Err(e) => return e.into_response(),
    };
    if let Some(token) = token {
        let claims = match state.auth.decode(&token) {
            Ok(claims) => claims,
            Err(e) => {
                warn!(path = %req.uri().path(), error = %e, "token validation failed");
                return ApiError::Unauthorized("invalid or expired token".into()).into_response();
            }
        };
        match state.auth.resolve_claims(claims).await {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
            }
            Err(e) => {
                warn!(path = %req.uri().path(), error = %e, "token_account_rejected");
                return ApiError::from(e).into_response();
            }
        }
    }
    next.run(req).await
}

/// Authenticated caller; 401 when the request carries no token.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub actor: Actor,
    pub claims: Claims,
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts.extensions.get::<Claims>().cloned().ok_or_else(ApiError::unauthenticated)?;
        Ok(CurrentUser { actor: Actor::from(&claims), claims })
    }
}

/// Authenticated admin; 401 without a token, 403 for other roles.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Actor);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !user.actor.is_admin() {
            return Err(ApiError::Forbidden("admin role required".into()));
        }
        Ok(AdminUser(user.actor))
    }
}

/// Caller if authenticated, for endpoints that are public but role-aware.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Actor>);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(parts.extensions.get::<Claims>().map(Actor::from)))
    }
}

/// Best-effort client address for audit entries.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut h = HeaderMap::new();
        h.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        h.insert(header::COOKIE, HeaderValue::from_static("auth_token=xyz"));
        assert_eq!(extract_token(&h).unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn cookie_fallback() {
        let mut h = HeaderMap::new();
        h.insert(header::COOKIE, HeaderValue::from_static("theme=dark; auth_token=xyz"));
        assert_eq!(extract_token(&h).unwrap().as_deref(), Some("xyz"));
        assert_eq!(extract_token(&HeaderMap::new()).unwrap(), None);
    }

    #[test]
    fn malformed_authorization_is_rejected() {
        let mut h = HeaderMap::new();
        h.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic Zm9v"));
        assert!(extract_token(&h).is_err());
    }

    #[test]
    fn forwarded_for_takes_first_hop() {
        let mut h = HeaderMap::new();
        h.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.1, 10.0.0.2"));
        assert_eq!(client_ip(&h).as_deref(), Some("10.0.0.1"));
    }
}

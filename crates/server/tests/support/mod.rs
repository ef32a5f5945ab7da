#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, Response};
use axum::Router;
use configs::AppConfig;
use models::status::RoleName;
use sea_orm::DatabaseConnection;
use serde_json::Value;
use server::routes::build_router;
use server::state::AppState;
use service::auth::repository::mock::MockAuthRepository;
use service::auth::repository::AuthRepository;
use service::email::Mailer;
use service::gateway::mock::MockGateway;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

pub fn test_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.auth.jwt_secret = "router-test-secret".into();
    cfg.server.data_dir = std::env::temp_dir().join("booking-router-tests").to_string_lossy().into_owned();
    cfg
}

pub fn state_with(db: DatabaseConnection) -> (AppState, Arc<MockGateway>) {
    let gateway = Arc::new(MockGateway::new());
    let state = AppState::with_parts(db, test_config(), gateway.clone(), Mailer::log_only());
    (state, gateway)
}

/// Router over a disconnected database with accounts kept in memory; only
/// paths that fail before touching storage are usable.
pub fn offline_app() -> (Router, AppState, Arc<MockAuthRepository>) {
    let users = Arc::new(MockAuthRepository::default());
    let state = AppState::with_auth_repo(
        DatabaseConnection::Disconnected,
        test_config(),
        users.clone(),
        Arc::new(MockGateway::new()),
        Mailer::log_only(),
    );
    (build_router(state.clone(), CorsLayer::very_permissive()), state, users)
}

/// Store a fresh account with `role` and sign a token for it.
pub async fn token_for(state: &AppState, users: &MockAuthRepository, role: RoleName) -> String {
    let email = format!("{}@example.com", Uuid::new_v4());
    let user = users.create_user(&email, "Tester", None, role).await.expect("create user");
    let (token, _) = state.auth.issue_token(&user).expect("issue token");
    token
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri).header("content-type", "application/json");
    if let Some(t) = token {
        builder = builder.header("authorization", format!("Bearer {t}"));
    }
    builder.body(Body::from(serde_json::to_vec(&body).expect("json"))).expect("request")
}

pub fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(t) = token {
        builder = builder.header("authorization", format!("Bearer {t}"));
    }
    builder.body(Body::empty()).expect("request")
}

pub async fn body_json(resp: Response<Body>) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.expect("body");
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

/// Migrated connection from `DATABASE_URL`; `None` skips the calling test.
pub async fn get_db() -> anyhow::Result<Option<DatabaseConnection>> {
    use migration::MigratorTrait;

    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(None);
    }
    let _ = dotenvy::dotenv();
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("skip: DATABASE_URL not set");
        return Ok(None);
    };
    let cfg = configs::DatabaseConfig { url, ..Default::default() };
    let db = models::db::connect_with_config(&cfg).await?;
    migration::Migrator::up(&db, None).await?;
    service::rbac_service::ensure_defaults(&db).await?;
    Ok(Some(db))
}

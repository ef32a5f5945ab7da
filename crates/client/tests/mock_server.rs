use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use client::types::{NewReservation, VenueQuery};
use client::{ApiClient, ClientError, MemoryTokenStore, TokenStore};
use serde_json::{json, Value};
use uuid::Uuid;

const TOKEN: &str = "tok-123";

fn envelope(data: Value) -> Json<Value> { Json(json!({ "success": true, "data": data })) }

fn failure(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "success": false, "message": message })))
}

fn user_json() -> Value {
    json!({ "id": Uuid::nil(), "email": "a@example.com", "name": "A", "role": "CUSTOMER", "isActive": true })
}

async fn login(Json(body): Json<Value>) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if body["password"] != "right" {
        return Err(failure(StatusCode::UNAUTHORIZED, "invalid credentials"));
    }
    Ok(envelope(json!({ "user": user_json(), "token": TOKEN, "expiresAt": 1_900_000_000 })))
}

async fn me(headers: HeaderMap) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some(v) if v == format!("Bearer {TOKEN}") => Ok(envelope(user_json())),
        _ => Err(failure(StatusCode::UNAUTHORIZED, "authentication required")),
    }
}

async fn venues(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    let city = q.get("city").cloned().unwrap_or_default();
    let venue = json!({
        "id": Uuid::new_v4(), "ownerId": Uuid::new_v4(), "name": format!("Hotel {city}"), "description": null,
        "venueType": "HOTEL", "address": "1 Main St", "city": city, "country": "PT", "isActive": true
    });
    envelope(json!({ "items": [venue], "page": 1, "limit": 20, "total": 1, "totalPages": 1 }))
}

async fn create_reservation() -> (StatusCode, Json<Value>) {
    failure(StatusCode::BAD_REQUEST, "checkOut must be after checkIn")
}

async fn receipt(Path(_id): Path<Uuid>) -> Json<Value> {
    Json(json!({ "success": true }))
}

async fn logout() -> Json<Value> {
    Json(json!({ "success": true, "message": "logged out" }))
}

async fn spawn_mock() -> String {
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
        .route("/api/auth/logout", post(logout))
        .route("/api/venues", get(venues))
        .route("/api/reservations", post(create_reservation))
        .route("/api/payments/:id/receipt", get(receipt));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn login_stores_token_and_me_uses_it() {
    let base = spawn_mock().await;
    let store = Arc::new(MemoryTokenStore::new());
    let api = ApiClient::with_token_store(&base, store.clone()).unwrap();

    assert!(matches!(api.me().await, Err(ClientError::Unauthorized(_))));

    let session = api.login("a@example.com", "right").await.unwrap();
    assert_eq!(session.token, TOKEN);
    assert_eq!(store.get().as_deref(), Some(TOKEN));

    let me = api.me().await.unwrap();
    assert_eq!(me.email, "a@example.com");

    api.logout().await.unwrap();
    assert_eq!(store.get(), None);
}

#[tokio::test]
async fn failed_login_surfaces_server_message() {
    let base = spawn_mock().await;
    let api = ApiClient::new(&base).unwrap();
    match api.login("a@example.com", "wrong").await {
        Err(ClientError::Unauthorized(msg)) => assert_eq!(msg, "invalid credentials"),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(api.tokens().get(), None);
}

#[tokio::test]
async fn query_parameters_reach_the_server() {
    let base = spawn_mock().await;
    let api = ApiClient::new(&format!("{base}/")).unwrap();
    let page = api.list_venues(&VenueQuery { city: Some("Lisbon".into()), ..Default::default() }).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].name, "Hotel Lisbon");
}

#[tokio::test]
async fn validation_errors_map_to_validation_variant() {
    let base = spawn_mock().await;
    let api = ApiClient::with_token_store(&base, Arc::new(MemoryTokenStore::with_token(TOKEN))).unwrap();
    let input = NewReservation {
        service_id: Uuid::new_v4(),
        check_in: NaiveDate::from_ymd_opt(2030, 1, 5).unwrap(),
        check_out: NaiveDate::from_ymd_opt(2030, 1, 3).unwrap(),
        guests: 2,
        special_requests: None,
    };
    match api.create_reservation(&input).await {
        Err(ClientError::Validation(msg)) => assert!(msg.contains("checkOut")),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn success_without_data_is_invalid_response() {
    let base = spawn_mock().await;
    let api = ApiClient::new(&base).unwrap();
    assert!(matches!(api.get_receipt(Uuid::new_v4()).await, Err(ClientError::InvalidResponse(_))));
}

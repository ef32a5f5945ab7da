mod support;

use axum::http::StatusCode;
use chrono::NaiveDate;
use models::status::RoleName;
use models::{payment, PricingUnit, VenueType};
use sea_orm::EntityTrait;
use serde_json::json;
use server::routes::build_router;
use service::auth::domain::AuthUser;
use service::auth::Actor;
use service::reservation_service::{self, CreateReservation};
use service::{catalog_service, venue_service};
use tower::ServiceExt;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use support::{body_json, get_db, json_request, state_with};

async fn seed(db: &sea_orm::DatabaseConnection, role: RoleName) -> anyhow::Result<AuthUser> {
    let email = format!("admin_flow_{}@example.com", Uuid::new_v4());
    let u = models::user::create(db, &email, "Tester", None, role).await?;
    Ok(AuthUser { id: u.id, email: u.email, name: u.name, role, is_active: true })
}

#[tokio::test]
async fn admin_cancel_through_status_route_refunds_payment() -> anyhow::Result<()> {
    let Some(db) = get_db().await? else { return Ok(()) };
    let (state, gateway) = state_with(db.clone());
    let app = build_router(state.clone(), CorsLayer::very_permissive());

    let owner = seed(&db, RoleName::VenueOwner).await?;
    let guest = seed(&db, RoleName::Customer).await?;
    let admin = seed(&db, RoleName::Admin).await?;
    let owner_actor = Actor::new(owner.id, RoleName::VenueOwner);
    let guest_actor = Actor::new(guest.id, RoleName::Customer);

    let venue = venue_service::create_venue(
        &db,
        &owner_actor,
        models::venue::NewVenue {
            name: "Admin Flow Inn".into(),
            description: None,
            venue_type: VenueType::Hotel,
            address: "2 Quay Rd".into(),
            city: "Porto".into(),
            country: "PT".into(),
            phone: None,
            email: None,
        },
    )
    .await?;
    let svc = catalog_service::create_service(
        &db,
        &owner_actor,
        venue.id,
        models::service::NewService {
            name: "Suite".into(),
            description: None,
            pricing_unit: PricingUnit::PerNight,
            price_cents: 15_000,
            currency: None,
            capacity: 2,
            inventory: 3,
        },
        "usd",
    )
    .await?;
    let today = NaiveDate::from_ymd_opt(2031, 1, 1).unwrap();
    let input = CreateReservation {
        service_id: svc.id,
        check_in: NaiveDate::from_ymd_opt(2031, 10, 1).unwrap(),
        check_out: NaiveDate::from_ymd_opt(2031, 10, 2).unwrap(),
        guests: 1,
        special_requests: None,
    };
    let r = reservation_service::create_reservation(&db, &guest_actor, input, today).await?;

    let intent = state.payments.create_payment_intent(&guest_actor, r.id).await?;
    let intent_id = intent.payment.provider_payment_id.clone().unwrap();
    gateway.set_intent_status(&intent_id, "succeeded", None);
    state.payments.confirm_payment(&guest_actor, intent.payment.id).await?;

    let (token, _) = state.auth.issue_token(&admin)?;
    let uri = format!("/api/admin/reservations/{}/status", r.id);
    let resp = app.oneshot(json_request("PATCH", &uri, Some(&token), json!({ "status": "CANCELLED" }))).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["data"]["status"], "CANCELLED");

    let p = payment::Entity::find_by_id(intent.payment.id).one(&db).await?.unwrap();
    assert_eq!(p.status, "REFUNDED");
    assert_eq!(p.refunded_amount_cents, 15_000);
    assert_eq!(gateway.refunds().len(), 1);
    Ok(())
}

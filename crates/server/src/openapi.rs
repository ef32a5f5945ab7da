use utoipa::OpenApi;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct RegisterRequest { pub email: String, pub name: String, pub password: String, pub phone: Option<String> }

#[derive(ToSchema)]
pub struct LoginRequest { pub email: String, pub password: String }

#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct CreateReservationRequest {
    pub service_id: Uuid,
    /// YYYY-MM-DD
    pub check_in: String,
    /// YYYY-MM-DD, after `checkIn`
    pub check_out: String,
    pub guests: i32,
    pub special_requests: Option<String>,
}

#[derive(ToSchema)]
pub struct CancelReservationRequest { pub reason: Option<String> }

#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct CreateIntentRequest { pub reservation_id: Uuid }

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::auth_routes::register,
        crate::routes::auth_routes::login,
        crate::routes::auth_routes::me,
        crate::routes::venues::list,
        crate::routes::venues::get_one,
        crate::routes::services::availability,
        crate::routes::reservations::create,
        crate::routes::reservations::cancel,
        crate::routes::payments::create_intent,
        crate::routes::payments::webhook,
    ),
    components(
        schemas(
            HealthResponse,
            RegisterRequest,
            LoginRequest,
            CreateReservationRequest,
            CancelReservationRequest,
            CreateIntentRequest,
        )
    ),
    tags(
        (name = "health"),
        (name = "auth"),
        (name = "venues"),
        (name = "services"),
        (name = "reservations"),
        (name = "payments")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_booking_paths() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for expected in ["/health", "/api/auth/login", "/api/reservations", "/api/payments/webhook"] {
            assert!(paths.iter().any(|p| p.as_str() == expected), "missing {expected}");
        }
    }
}

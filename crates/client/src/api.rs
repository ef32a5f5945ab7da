//! Typed wrappers over the public API, grouped by resource.

use chrono::NaiveDate;
use reqwest::Method;
use serde_json::json;
use uuid::Uuid;

use crate::error::ClientResult;
use crate::http::ApiClient;
use crate::types::{
    Availability, Cancellation, LoginRequest, NewReservation, Page, Payment, PaymentIntent, Receipt, RegisterRequest,
    Reservation, Service, Session, User, Venue, VenueQuery,
};

fn paging(page: u32, limit: u32) -> [(&'static str, u32); 2] { [("page", page), ("limit", limit)] }

impl ApiClient {
    pub async fn register(&self, input: &RegisterRequest) -> ClientResult<User> {
        self.handle_request(self.request(Method::POST, "/api/auth/register").json(input)).await
    }

    /// Log in and keep the returned token for later calls.
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<Session> {
        let body = LoginRequest { email: email.to_string(), password: password.to_string() };
        let session: Session = self.handle_request(self.request(Method::POST, "/api/auth/login").json(&body)).await?;
        self.tokens().set(&session.token);
        Ok(session)
    }

    pub async fn logout(&self) -> ClientResult<()> {
        let res = self.handle_empty(self.request(Method::POST, "/api/auth/logout")).await;
        self.tokens().clear();
        res.map(|_| ())
    }

    pub async fn me(&self) -> ClientResult<User> {
        self.handle_request(self.request(Method::GET, "/api/auth/me")).await
    }

    pub async fn list_venues(&self, query: &VenueQuery) -> ClientResult<Page<Venue>> {
        self.handle_request(self.request(Method::GET, "/api/venues").query(query)).await
    }

    pub async fn get_venue(&self, id: Uuid) -> ClientResult<Venue> {
        self.handle_request(self.request(Method::GET, &format!("/api/venues/{id}"))).await
    }

    pub async fn list_venue_services(&self, venue_id: Uuid, page: u32, limit: u32) -> ClientResult<Page<Service>> {
        let req = self.request(Method::GET, &format!("/api/venues/{venue_id}/services")).query(&paging(page, limit));
        self.handle_request(req).await
    }

    pub async fn get_service(&self, id: Uuid) -> ClientResult<Service> {
        self.handle_request(self.request(Method::GET, &format!("/api/services/{id}"))).await
    }

    pub async fn availability(&self, service_id: Uuid, check_in: NaiveDate, check_out: NaiveDate) -> ClientResult<Availability> {
        let req = self
            .request(Method::GET, &format!("/api/services/{service_id}/availability"))
            .query(&[("checkIn", check_in.to_string()), ("checkOut", check_out.to_string())]);
        self.handle_request(req).await
    }

    pub async fn create_reservation(&self, input: &NewReservation) -> ClientResult<Reservation> {
        self.handle_request(self.request(Method::POST, "/api/reservations").json(input)).await
    }

    pub async fn list_reservations(&self, page: u32, limit: u32) -> ClientResult<Page<Reservation>> {
        self.handle_request(self.request(Method::GET, "/api/reservations").query(&paging(page, limit))).await
    }

    pub async fn get_reservation(&self, id: Uuid) -> ClientResult<Reservation> {
        self.handle_request(self.request(Method::GET, &format!("/api/reservations/{id}"))).await
    }

    pub async fn cancel_reservation(&self, id: Uuid, reason: Option<&str>) -> ClientResult<Cancellation> {
        let req = self.request(Method::POST, &format!("/api/reservations/{id}/cancel")).json(&json!({ "reason": reason }));
        self.handle_request(req).await
    }

    pub async fn create_payment_intent(&self, reservation_id: Uuid) -> ClientResult<PaymentIntent> {
        let req = self.request(Method::POST, "/api/payments/create-intent").json(&json!({ "reservationId": reservation_id }));
        self.handle_request(req).await
    }

    pub async fn confirm_payment(&self, id: Uuid) -> ClientResult<Payment> {
        self.handle_request(self.request(Method::POST, &format!("/api/payments/{id}/confirm"))).await
    }

    pub async fn list_payments(&self, page: u32, limit: u32) -> ClientResult<Page<Payment>> {
        self.handle_request(self.request(Method::GET, "/api/payments").query(&paging(page, limit))).await
    }

    pub async fn get_receipt(&self, payment_id: Uuid) -> ClientResult<Receipt> {
        self.handle_request(self.request(Method::GET, &format!("/api/payments/{payment_id}/receipt"))).await
    }
}

//! Hosted payment processor integration.
//!
//! `PaymentGateway` is the seam between the payment service and the
//! processor; `StripeGateway` talks to Stripe's REST API and
//! `mock::MockGateway` keeps intents in memory for tests.

pub mod mock;
pub mod stripe;
pub mod webhook;

use async_trait::async_trait;
use models::PaymentStatus;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use stripe::StripeGateway;
pub use webhook::{sign_payload, verify_webhook_signature};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("payment gateway is not configured")]
    NotConfigured,
    #[error("gateway request failed: {0}")]
    Http(String),
    #[error("gateway rejected request ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("unexpected gateway response: {0}")]
    InvalidResponse(String),
    #[error("invalid webhook signature: {0}")]
    InvalidSignature(String),
    #[error("invalid webhook payload: {0}")]
    InvalidPayload(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self { GatewayError::Http(e.to_string()) }
}

#[derive(Debug, Clone)]
pub struct CreateIntent {
    pub amount_cents: i64,
    pub currency: String,
    pub payment_id: Uuid,
    pub reservation_id: Uuid,
    pub customer_email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    /// Processor status, e.g. `requires_payment_method`, `succeeded`.
    pub status: String,
    pub amount_cents: i64,
    pub currency: String,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayRefund {
    pub id: String,
    pub amount_cents: i64,
    pub status: String,
}

/// A verified webhook event, reduced to what the payment service needs.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayEvent {
    pub id: String,
    pub event_type: String,
    pub payment_intent_id: Option<String>,
    pub failure_message: Option<String>,
    pub amount_cents: Option<i64>,
    pub amount_refunded_cents: Option<i64>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Provider name stored on payment rows.
    fn name(&self) -> &'static str;

    async fn create_payment_intent(&self, req: CreateIntent) -> Result<PaymentIntent, GatewayError>;
    async fn retrieve_payment_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError>;
    async fn cancel_payment_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError>;
    async fn create_refund(&self, intent_id: &str, amount_cents: i64, reason: Option<&str>) -> Result<GatewayRefund, GatewayError>;

    /// Check the signature header and parse the event body.
    fn verify_webhook(&self, payload: &[u8], signature: &str) -> Result<GatewayEvent, GatewayError>;
}

/// Map a processor intent status onto our payment status.
pub fn intent_status_to_payment_status(intent: &PaymentIntent) -> Option<PaymentStatus> {
    match intent.status.as_str() {
        "requires_payment_method" if intent.last_error.is_some() => Some(PaymentStatus::Failed),
        "requires_payment_method" | "requires_confirmation" => Some(PaymentStatus::Pending),
        "requires_action" | "processing" | "requires_capture" => Some(PaymentStatus::Processing),
        "succeeded" => Some(PaymentStatus::Completed),
        "canceled" => Some(PaymentStatus::Cancelled),
        _ => None,
    }
}

/// Map a webhook event onto the payment status it implies. Unknown events map to `None`.
pub fn event_to_payment_status(event: &GatewayEvent) -> Option<PaymentStatus> {
    match event.event_type.as_str() {
        "payment_intent.processing" | "payment_intent.requires_action" => Some(PaymentStatus::Processing),
        "payment_intent.succeeded" => Some(PaymentStatus::Completed),
        "payment_intent.payment_failed" => Some(PaymentStatus::Failed),
        "payment_intent.canceled" => Some(PaymentStatus::Cancelled),
        "charge.refunded" => match (event.amount_cents, event.amount_refunded_cents) {
            (Some(total), Some(refunded)) if refunded < total => Some(PaymentStatus::PartiallyRefunded),
            _ => Some(PaymentStatus::Refunded),
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent(status: &str, err: Option<&str>) -> PaymentIntent {
        PaymentIntent {
            id: "pi_1".into(),
            client_secret: None,
            status: status.into(),
            amount_cents: 100,
            currency: "usd".into(),
            last_error: err.map(String::from),
        }
    }

    fn event(kind: &str) -> GatewayEvent {
        GatewayEvent {
            id: "evt_1".into(),
            event_type: kind.into(),
            payment_intent_id: Some("pi_1".into()),
            failure_message: None,
            amount_cents: None,
            amount_refunded_cents: None,
        }
    }

    #[test]
    fn intent_statuses() {
        assert_eq!(intent_status_to_payment_status(&intent("succeeded", None)), Some(PaymentStatus::Completed));
        assert_eq!(intent_status_to_payment_status(&intent("processing", None)), Some(PaymentStatus::Processing));
        assert_eq!(intent_status_to_payment_status(&intent("canceled", None)), Some(PaymentStatus::Cancelled));
        assert_eq!(intent_status_to_payment_status(&intent("requires_payment_method", None)), Some(PaymentStatus::Pending));
        assert_eq!(
            intent_status_to_payment_status(&intent("requires_payment_method", Some("card declined"))),
            Some(PaymentStatus::Failed)
        );
        assert_eq!(intent_status_to_payment_status(&intent("weird", None)), None);
    }

    #[test]
    fn events_map_one_to_one() {
        assert_eq!(event_to_payment_status(&event("payment_intent.succeeded")), Some(PaymentStatus::Completed));
        assert_eq!(event_to_payment_status(&event("payment_intent.payment_failed")), Some(PaymentStatus::Failed));
        assert_eq!(event_to_payment_status(&event("payment_intent.canceled")), Some(PaymentStatus::Cancelled));
        assert_eq!(event_to_payment_status(&event("payment_intent.processing")), Some(PaymentStatus::Processing));
        assert_eq!(event_to_payment_status(&event("customer.created")), None);
    }

    #[test]
    fn partial_refund_event() {
        let mut e = event("charge.refunded");
        e.amount_cents = Some(1000);
        e.amount_refunded_cents = Some(400);
        assert_eq!(event_to_payment_status(&e), Some(PaymentStatus::PartiallyRefunded));
        e.amount_refunded_cents = Some(1000);
        assert_eq!(event_to_payment_status(&e), Some(PaymentStatus::Refunded));
    }
}

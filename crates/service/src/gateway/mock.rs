//! In-memory gateway used by tests and local runs without processor keys.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use super::webhook::{parse_event, verify_webhook_signature};
use super::{CreateIntent, GatewayError, GatewayEvent, GatewayRefund, PaymentGateway, PaymentIntent};

pub const MOCK_WEBHOOK_SECRET: &str = "whsec_mock";

#[derive(Default)]
pub struct MockGateway {
    intents: Mutex<HashMap<String, PaymentIntent>>,
    refunds: Mutex<Vec<GatewayRefund>>,
    fail_refunds: AtomicBool,
}

impl MockGateway {
    pub fn new() -> Self { Self::default() }

    fn intents(&self) -> Result<MutexGuard<'_, HashMap<String, PaymentIntent>>, GatewayError> {
        self.intents.lock().map_err(|_| GatewayError::Http("mock lock poisoned".into()))
    }

    /// Simulate the processor moving an intent, e.g. to `succeeded`.
    pub fn set_intent_status(&self, intent_id: &str, status: &str, error: Option<&str>) {
        if let Ok(mut map) = self.intents.lock() {
            if let Some(i) = map.get_mut(intent_id) {
                i.status = status.to_string();
                i.last_error = error.map(String::from);
            }
        }
    }

    pub fn fail_refunds(&self, fail: bool) { self.fail_refunds.store(fail, Ordering::SeqCst); }

    pub fn intent_count(&self) -> usize { self.intents.lock().map(|m| m.len()).unwrap_or_default() }

    pub fn refunds(&self) -> Vec<GatewayRefund> { self.refunds.lock().map(|r| r.clone()).unwrap_or_default() }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    fn name(&self) -> &'static str { "mock" }

    async fn create_payment_intent(&self, req: CreateIntent) -> Result<PaymentIntent, GatewayError> {
        if req.amount_cents <= 0 {
            return Err(GatewayError::Api { status: 400, message: "amount must be positive".into() });
        }
        let id = format!("pi_mock_{}", Uuid::new_v4().simple());
        let intent = PaymentIntent {
            id: id.clone(),
            client_secret: Some(format!("{id}_secret")),
            status: "requires_payment_method".into(),
            amount_cents: req.amount_cents,
            currency: req.currency,
            last_error: None,
        };
        self.intents()?.insert(id, intent.clone());
        Ok(intent)
    }

    async fn retrieve_payment_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        self.intents()?
            .get(intent_id)
            .cloned()
            .ok_or_else(|| GatewayError::Api { status: 404, message: format!("no such payment_intent: {intent_id}") })
    }

    async fn cancel_payment_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        let mut map = self.intents()?;
        let i = map
            .get_mut(intent_id)
            .ok_or_else(|| GatewayError::Api { status: 404, message: format!("no such payment_intent: {intent_id}") })?;
        if i.status == "succeeded" {
            return Err(GatewayError::Api { status: 400, message: "cannot cancel a succeeded intent".into() });
        }
        i.status = "canceled".into();
        Ok(i.clone())
    }

    async fn create_refund(&self, intent_id: &str, amount_cents: i64, _reason: Option<&str>) -> Result<GatewayRefund, GatewayError> {
        if self.fail_refunds.load(Ordering::SeqCst) {
            return Err(GatewayError::Api { status: 402, message: "refund declined".into() });
        }
        let intent = self.retrieve_payment_intent(intent_id).await?;
        if intent.status != "succeeded" {
            return Err(GatewayError::Api { status: 400, message: "intent has not succeeded".into() });
        }
        let refund = GatewayRefund { id: format!("re_mock_{}", Uuid::new_v4().simple()), amount_cents, status: "succeeded".into() };
        if let Ok(mut r) = self.refunds.lock() {
            r.push(refund.clone());
        }
        Ok(refund)
    }

    fn verify_webhook(&self, payload: &[u8], signature: &str) -> Result<GatewayEvent, GatewayError> {
        verify_webhook_signature(payload, signature, MOCK_WEBHOOK_SECRET, chrono::Utc::now().timestamp(), 300)?;
        parse_event(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(amount: i64) -> CreateIntent {
        CreateIntent { amount_cents: amount, currency: "usd".into(), payment_id: Uuid::new_v4(), reservation_id: Uuid::new_v4(), customer_email: None }
    }

    #[tokio::test]
    async fn refund_requires_success() {
        let gw = MockGateway::new();
        let i = gw.create_payment_intent(req(1000)).await.unwrap();
        assert!(gw.create_refund(&i.id, 1000, None).await.is_err());
        gw.set_intent_status(&i.id, "succeeded", None);
        let r = gw.create_refund(&i.id, 400, Some("guest asked")).await.unwrap();
        assert_eq!(r.amount_cents, 400);
        assert_eq!(gw.refunds().len(), 1);
    }

    #[tokio::test]
    async fn cancel_and_failures() {
        let gw = MockGateway::new();
        let i = gw.create_payment_intent(req(1000)).await.unwrap();
        assert_eq!(gw.cancel_payment_intent(&i.id).await.unwrap().status, "canceled");
        assert!(gw.create_payment_intent(req(0)).await.is_err());
        assert!(gw.retrieve_payment_intent("pi_missing").await.is_err());
    }

    #[tokio::test]
    async fn intent_ids_are_unique_across_instances() {
        let a = MockGateway::new().create_payment_intent(req(1000)).await.unwrap();
        let b = MockGateway::new().create_payment_intent(req(1000)).await.unwrap();
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("pi_mock_"));
    }
}

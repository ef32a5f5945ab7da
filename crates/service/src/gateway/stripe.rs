//! Stripe over its REST API (form-encoded requests, basic auth with the secret key).

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::webhook::{parse_event, verify_webhook_signature};
use super::{CreateIntent, GatewayError, GatewayEvent, GatewayRefund, PaymentGateway, PaymentIntent};

#[derive(Clone)]
pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
    webhook_secret: String,
    api_base: String,
    tolerance_secs: i64,
}

impl StripeGateway {
    pub fn new(cfg: &configs::PaymentsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key: cfg.stripe_secret_key.clone(),
            webhook_secret: cfg.stripe_webhook_secret.clone(),
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
            tolerance_secs: cfg.webhook_tolerance_secs,
        }
    }

    fn url(&self, path: &str) -> String { format!("{}/v1/{}", self.api_base, path) }

    fn ensure_configured(&self) -> Result<(), GatewayError> {
        if self.secret_key.trim().is_empty() {
            return Err(GatewayError::NotConfigured);
        }
        Ok(())
    }

    async fn read(resp: reqwest::Response) -> Result<Value, GatewayError> {
        let status = resp.status();
        let body: Value = resp.json().await?;
        if !status.is_success() {
            let message = body["error"]["message"].as_str().unwrap_or("unknown error").to_string();
            warn!(status = status.as_u16(), %message, "stripe_request_failed");
            return Err(GatewayError::Api { status: status.as_u16(), message });
        }
        Ok(body)
    }

    async fn post_form(&self, path: &str, form: &[(&str, String)], idempotency_key: Option<String>) -> Result<Value, GatewayError> {
        self.ensure_configured()?;
        let mut req = self.client.post(self.url(path)).basic_auth(&self.secret_key, None::<&str>).form(form);
        if let Some(key) = idempotency_key {
            req = req.header("Idempotency-Key", key);
        }
        Self::read(req.send().await?).await
    }

    async fn get(&self, path: &str) -> Result<Value, GatewayError> {
        self.ensure_configured()?;
        let resp = self.client.get(self.url(path)).basic_auth(&self.secret_key, None::<&str>).send().await?;
        Self::read(resp).await
    }
}

pub(crate) fn parse_intent(v: &Value) -> Result<PaymentIntent, GatewayError> {
    let id = v["id"].as_str().ok_or_else(|| GatewayError::InvalidResponse(format!("intent without id: {v}")))?;
    let status = v["status"].as_str().ok_or_else(|| GatewayError::InvalidResponse("intent without status".into()))?;
    Ok(PaymentIntent {
        id: id.to_string(),
        client_secret: v["client_secret"].as_str().map(String::from),
        status: status.to_string(),
        amount_cents: v["amount"].as_i64().unwrap_or_default(),
        currency: v["currency"].as_str().unwrap_or_default().to_string(),
        last_error: v["last_payment_error"]["message"].as_str().map(String::from),
    })
}

fn parse_refund(v: &Value) -> Result<GatewayRefund, GatewayError> {
    let id = v["id"].as_str().ok_or_else(|| GatewayError::InvalidResponse(format!("refund without id: {v}")))?;
    Ok(GatewayRefund {
        id: id.to_string(),
        amount_cents: v["amount"].as_i64().unwrap_or_default(),
        status: v["status"].as_str().unwrap_or("pending").to_string(),
    })
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    fn name(&self) -> &'static str { models::payment::PROVIDER_STRIPE }

    #[instrument(skip(self, req), fields(payment_id = %req.payment_id, amount = req.amount_cents))]
    async fn create_payment_intent(&self, req: CreateIntent) -> Result<PaymentIntent, GatewayError> {
        let mut form = vec![
            ("amount", req.amount_cents.to_string()),
            ("currency", req.currency.clone()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
            ("metadata[payment_id]", req.payment_id.to_string()),
            ("metadata[reservation_id]", req.reservation_id.to_string()),
        ];
        if let Some(email) = req.customer_email {
            form.push(("receipt_email", email));
        }
        let body = self.post_form("payment_intents", &form, Some(format!("pi-{}", req.payment_id))).await?;
        let intent = parse_intent(&body)?;
        debug!(intent_id = %intent.id, "stripe_intent_created");
        Ok(intent)
    }

    async fn retrieve_payment_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        parse_intent(&self.get(&format!("payment_intents/{intent_id}")).await?)
    }

    async fn cancel_payment_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        let body = self.post_form(&format!("payment_intents/{intent_id}/cancel"), &[], None).await?;
        parse_intent(&body)
    }

    #[instrument(skip(self, reason))]
    async fn create_refund(&self, intent_id: &str, amount_cents: i64, reason: Option<&str>) -> Result<GatewayRefund, GatewayError> {
        let mut form = vec![
            ("payment_intent", intent_id.to_string()),
            ("amount", amount_cents.to_string()),
            ("reason", "requested_by_customer".to_string()),
        ];
        if let Some(r) = reason {
            form.push(("metadata[reason]", r.to_string()));
        }
        parse_refund(&self.post_form("refunds", &form, None).await?)
    }

    fn verify_webhook(&self, payload: &[u8], signature: &str) -> Result<GatewayEvent, GatewayError> {
        verify_webhook_signature(payload, signature, &self.webhook_secret, chrono::Utc::now().timestamp(), self.tolerance_secs)?;
        parse_event(payload)
    }
}

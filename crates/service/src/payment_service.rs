//! Payment orchestration on top of a `PaymentGateway`.
//!
//! The gateway owns the money movement; this service mirrors its state into
//! `payment` rows, confirms reservations once paid, issues receipts and sends
//! the transactional emails. Webhook events are applied at most once.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use common::metrics::PAYMENT_TRANSITIONS_TOTAL;
use models::{payment, processed_webhook_event, receipt, reservation, service, user, venue, PaymentStatus, ReservationStatus};
use crate::audit_service::day_bounds;
use crate::auth::Actor;
use crate::email::templates::{self, StayDetails};
use crate::email::Mailer;
use crate::errors::ServiceError;
use crate::gateway::{event_to_payment_status, intent_status_to_payment_status, CreateIntent, GatewayError, GatewayEvent, PaymentGateway};
use crate::pagination::{fetch_page, Page, Pagination};
use crate::receipt_service;
use crate::reservation_service::{self, refund_due, RefundPolicy};

/// What the client needs to finish a payment with the processor's SDK.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub payment: payment::Model,
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookOutcome {
    Processed,
    Duplicate,
    Ignored,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFilter {
    pub status: Option<PaymentStatus>,
    pub user_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl PaymentFilter {
    pub(crate) fn condition(&self) -> Condition {
        let mut cond = Condition::all();
        if let Some(s) = self.status {
            cond = cond.add(payment::Column::Status.eq(s.as_str()));
        }
        if let Some(u) = self.user_id {
            cond = cond.add(payment::Column::UserId.eq(u));
        }
        let (start, end) = day_bounds(self.from, self.to);
        if let Some(s) = start {
            cond = cond.add(payment::Column::CreatedAt.gte(s));
        }
        if let Some(e) = end {
            cond = cond.add(payment::Column::CreatedAt.lt(e));
        }
        cond
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationResult {
    pub reservation: reservation::Model,
    pub refund_cents: i64,
    pub already_cancelled: bool,
}

#[derive(Clone)]
pub struct PaymentService {
    db: DatabaseConnection,
    gateway: Arc<dyn PaymentGateway>,
    mailer: Mailer,
}

impl PaymentService {
    pub fn new(db: DatabaseConnection, gateway: Arc<dyn PaymentGateway>, mailer: Mailer) -> Self {
        Self { db, gateway, mailer }
    }

    pub fn db(&self) -> &DatabaseConnection { &self.db }

    pub fn gateway(&self) -> &Arc<dyn PaymentGateway> { &self.gateway }

    async fn find(&self, id: Uuid) -> Result<payment::Model, ServiceError> {
        payment::Entity::find_by_id(id).one(&self.db).await?.ok_or_else(|| ServiceError::not_found("payment"))
    }

    /// The payer and admins may read a payment.
    pub async fn get_payment(&self, actor: &Actor, id: Uuid) -> Result<payment::Model, ServiceError> {
        let p = self.find(id).await?;
        if !actor.can_act_for(p.user_id) {
            return Err(ServiceError::forbidden("not your payment"));
        }
        Ok(p)
    }

    pub async fn list_for_user(&self, user_id: Uuid, opts: Pagination) -> Result<Page<payment::Model>, ServiceError> {
        let select = payment::Entity::find()
            .filter(payment::Column::UserId.eq(user_id))
            .order_by_desc(payment::Column::CreatedAt);
        fetch_page(&self.db, select, opts).await
    }

    /// Admin listing.
    pub async fn list(&self, filter: PaymentFilter, opts: Pagination) -> Result<Page<payment::Model>, ServiceError> {
        let select = payment::Entity::find().filter(filter.condition()).order_by_desc(payment::Column::CreatedAt);
        fetch_page(&self.db, select, opts).await
    }

    /// Start (or resume) paying for a PENDING reservation.
    #[instrument(skip(self), fields(user_id = %actor.id))]
    pub async fn create_payment_intent(&self, actor: &Actor, reservation_id: Uuid) -> Result<PaymentIntentResponse, ServiceError> {
        let r = reservation::Entity::find_by_id(reservation_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("reservation"))?;
        if r.user_id != actor.id {
            return Err(ServiceError::forbidden("reservation belongs to another user"));
        }
        if r.status()? != ReservationStatus::Pending {
            return Err(ServiceError::conflict(format!("reservation is {}, not awaiting payment", r.status)));
        }
        if r.total_amount_cents <= 0 {
            return Err(ServiceError::conflict("reservation has nothing to pay"));
        }

        let existing = payment::Entity::find()
            .filter(payment::Column::ReservationId.eq(r.id))
            .one(&self.db)
            .await?;
        let p = match existing {
            Some(p) => {
                let status = p.status()?;
                if !status.is_open() {
                    return Err(ServiceError::conflict(format!("payment for this reservation is {status}")));
                }
                if let Some(intent_id) = p.provider_payment_id.as_deref() {
                    let intent = self.gateway.retrieve_payment_intent(intent_id).await?;
                    debug!(payment_id = %p.id, "payment_intent_reused");
                    return Ok(PaymentIntentResponse { client_secret: intent.client_secret, payment: p });
                }
                p
            }
            None => {
                let now = Utc::now().into();
                let am = payment::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    reservation_id: Set(r.id),
                    user_id: Set(r.user_id),
                    amount_cents: Set(r.total_amount_cents),
                    refunded_amount_cents: Set(0),
                    currency: Set(r.currency.clone()),
                    status: Set(PaymentStatus::Pending.as_str().to_string()),
                    provider: Set(self.gateway.name().to_string()),
                    provider_payment_id: Set(None),
                    provider_refund_id: Set(None),
                    failure_reason: Set(None),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                am.insert(&self.db).await?
            }
        };

        let email = user::Entity::find_by_id(r.user_id).one(&self.db).await?.map(|u| u.email);
        let req = CreateIntent {
            amount_cents: p.amount_cents,
            currency: p.currency.clone(),
            payment_id: p.id,
            reservation_id: r.id,
            customer_email: email,
        };
        match self.gateway.create_payment_intent(req).await {
            Ok(intent) => {
                let mut am: payment::ActiveModel = p.into();
                am.provider = Set(self.gateway.name().to_string());
                am.provider_payment_id = Set(Some(intent.id.clone()));
                am.updated_at = Set(Utc::now().into());
                let updated = am.update(&self.db).await?;
                info!(payment_id = %updated.id, intent_id = %intent.id, "payment_intent_created");
                Ok(PaymentIntentResponse { payment: updated, client_secret: intent.client_secret })
            }
            Err(e) => {
                warn!(payment_id = %p.id, error = %e, "payment_intent_failed");
                let mut am: payment::ActiveModel = p.into();
                am.status = Set(PaymentStatus::Failed.as_str().to_string());
                am.failure_reason = Set(Some(e.to_string()));
                am.updated_at = Set(Utc::now().into());
                am.update(&self.db).await?;
                Err(e.into())
            }
        }
    }

    /// Pull the intent from the gateway and mirror its status.
    #[instrument(skip(self), fields(user_id = %actor.id))]
    pub async fn confirm_payment(&self, actor: &Actor, id: Uuid) -> Result<payment::Model, ServiceError> {
        let p = self.get_payment(actor, id).await?;
        let intent_id = p
            .provider_payment_id
            .clone()
            .ok_or_else(|| ServiceError::conflict("payment has no gateway intent"))?;
        let intent = self.gateway.retrieve_payment_intent(&intent_id).await?;
        let next = intent_status_to_payment_status(&intent)
            .ok_or_else(|| GatewayError::InvalidResponse(format!("unknown intent status {}", intent.status)))?;
        self.apply_status(p, next, intent.last_error).await
    }

    /// Move a payment to `next`. Reaching COMPLETED confirms the reservation and issues the receipt.
    pub async fn apply_status(&self, p: payment::Model, next: PaymentStatus, failure_reason: Option<String>) -> Result<payment::Model, ServiceError> {
        self.transition(p, next, failure_reason, None).await
    }

    async fn transition(
        &self,
        p: payment::Model,
        next: PaymentStatus,
        failure_reason: Option<String>,
        refunded_cents: Option<i64>,
    ) -> Result<payment::Model, ServiceError> {
        let current = p.status()?;
        let refunded = refunded_cents.map(|r| r.clamp(p.refunded_amount_cents, p.amount_cents));
        let refund_delta = refunded.map(|r| r - p.refunded_amount_cents).unwrap_or(0);
        if current == next && refund_delta == 0 {
            return Ok(p);
        }
        if !current.can_transition_to(next) {
            return Err(ServiceError::conflict(format!("cannot move payment from {current} to {next}")));
        }

        let txn = self.db.begin().await?;
        let mut am: payment::ActiveModel = p.into();
        am.status = Set(next.as_str().to_string());
        match next {
            PaymentStatus::Failed => am.failure_reason = Set(failure_reason.or_else(|| Some("payment failed".into()))),
            PaymentStatus::Completed => am.failure_reason = Set(None),
            _ => {}
        }
        if let Some(r) = refunded {
            am.refunded_amount_cents = Set(r);
        }
        am.updated_at = Set(Utc::now().into());
        let updated = am.update(&txn).await?;
        let receipt = if next == PaymentStatus::Completed {
            reservation_service::confirm_after_payment(&txn, updated.reservation_id).await?;
            Some(receipt_service::issue_receipt(&txn, &updated).await?)
        } else {
            None
        };
        txn.commit().await?;

        PAYMENT_TRANSITIONS_TOTAL.with_label_values(&[next.as_str()]).inc();
        info!(payment_id = %updated.id, from = %current, to = %next, "payment_status_changed");

        if let Err(e) = self.notify_transition(&updated, next, receipt.as_ref(), refund_delta).await {
            warn!(payment_id = %updated.id, error = %e, "payment_notification_skipped");
        }
        Ok(updated)
    }

    async fn notify_transition(
        &self,
        p: &payment::Model,
        next: PaymentStatus,
        receipt: Option<&receipt::Model>,
        refund_delta: i64,
    ) -> Result<(), ServiceError> {
        let Some(payer) = user::Entity::find_by_id(p.user_id).one(&self.db).await? else { return Ok(()) };
        match next {
            PaymentStatus::Completed => {
                if let Some(rc) = receipt {
                    self.mailer.dispatch(templates::payment_receipt(&payer.email, &rc.receipt_number, rc.amount_cents, &rc.currency));
                }
                if let Some((r, svc, v)) = self.stay(p.reservation_id).await? {
                    let stay = stay_details(&r, &svc, &v);
                    self.mailer.dispatch(templates::reservation_confirmation(&payer.email, &payer.name, &stay));
                }
            }
            PaymentStatus::Failed => {
                self.mailer.dispatch(templates::payment_failed(&payer.email, p.amount_cents, &p.currency, p.failure_reason.as_deref()));
            }
            PaymentStatus::Refunded | PaymentStatus::PartiallyRefunded if refund_delta > 0 => {
                self.mailer.dispatch(templates::refund_processed(&payer.email, refund_delta, &p.currency));
            }
            _ => {}
        }
        Ok(())
    }

    async fn stay(&self, reservation_id: Uuid) -> Result<Option<(reservation::Model, service::Model, venue::Model)>, ServiceError> {
        let Some(r) = reservation::Entity::find_by_id(reservation_id).one(&self.db).await? else { return Ok(None) };
        let Some(svc) = service::Entity::find_by_id(r.service_id).one(&self.db).await? else { return Ok(None) };
        let Some(v) = venue::Entity::find_by_id(r.venue_id).one(&self.db).await? else { return Ok(None) };
        Ok(Some((r, svc, v)))
    }

    /// Verify, deduplicate and apply a gateway event.
    #[instrument(skip(self, payload, signature))]
    pub async fn handle_webhook(&self, payload: &[u8], signature: &str) -> Result<WebhookOutcome, ServiceError> {
        let event = self.gateway.verify_webhook(payload, signature)?;

        let marker = processed_webhook_event::ActiveModel {
            event_id: Set(event.id.clone()),
            event_type: Set(event.event_type.clone()),
            processed_at: Set(Utc::now().into()),
        };
        let inserted = processed_webhook_event::Entity::insert(marker)
            .on_conflict(OnConflict::column(processed_webhook_event::Column::EventId).do_nothing().to_owned())
            .exec_without_returning(&self.db)
            .await?;
        if inserted == 0 {
            info!(event_id = %event.id, "webhook_duplicate");
            return Ok(WebhookOutcome::Duplicate);
        }

        match self.process_event(&event).await {
            Ok(outcome) => Ok(outcome),
            Err(ServiceError::Conflict(msg)) => {
                warn!(event_id = %event.id, event_type = %event.event_type, %msg, "webhook_transition_ignored");
                Ok(WebhookOutcome::Ignored)
            }
            Err(e) => {
                // Forget the event so the gateway's redelivery can retry it.
                if let Err(del) = processed_webhook_event::Entity::delete_by_id(event.id.clone()).exec(&self.db).await {
                    warn!(event_id = %event.id, error = %del, "webhook_marker_cleanup_failed");
                }
                Err(e)
            }
        }
    }

    async fn process_event(&self, event: &GatewayEvent) -> Result<WebhookOutcome, ServiceError> {
        let Some(next) = event_to_payment_status(event) else {
            debug!(event_type = %event.event_type, "webhook_event_unhandled");
            return Ok(WebhookOutcome::Ignored);
        };
        let Some(intent_id) = event.payment_intent_id.as_deref() else { return Ok(WebhookOutcome::Ignored) };
        let Some(p) = payment::Entity::find()
            .filter(payment::Column::ProviderPaymentId.eq(intent_id))
            .one(&self.db)
            .await?
        else {
            warn!(%intent_id, "webhook_for_unknown_payment");
            return Ok(WebhookOutcome::Ignored);
        };
        let refunded = match next {
            PaymentStatus::Refunded => Some(event.amount_refunded_cents.unwrap_or(p.amount_cents)),
            PaymentStatus::PartiallyRefunded => event.amount_refunded_cents,
            _ => None,
        };
        self.transition(p, next, event.failure_message.clone(), refunded).await?;
        Ok(WebhookOutcome::Processed)
    }

    /// Admin refund; `amount_cents = None` refunds the remaining balance.
    #[instrument(skip(self, reason), fields(admin_id = %actor.id))]
    pub async fn refund_payment(
        &self,
        actor: &Actor,
        id: Uuid,
        amount_cents: Option<i64>,
        reason: Option<String>,
    ) -> Result<payment::Model, ServiceError> {
        if !actor.is_admin() {
            return Err(ServiceError::forbidden("only admins can refund payments"));
        }
        let p = self.find(id).await?;
        self.refund(p, amount_cents, reason.as_deref()).await
    }

    async fn refund(&self, p: payment::Model, amount_cents: Option<i64>, reason: Option<&str>) -> Result<payment::Model, ServiceError> {
        let status = p.status()?;
        if !status.is_refundable() {
            return Err(ServiceError::conflict(format!("a {status} payment cannot be refunded")));
        }
        let amount = payment::resolve_refund_amount(&p, amount_cents)?;
        let intent_id = p
            .provider_payment_id
            .clone()
            .ok_or_else(|| ServiceError::conflict("payment has no gateway intent"))?;
        let refund = self.gateway.create_refund(&intent_id, amount, reason).await?;

        let refunded = p.refunded_amount_cents + amount;
        let next = if refunded >= p.amount_cents { PaymentStatus::Refunded } else { PaymentStatus::PartiallyRefunded };
        let payer_id = p.user_id;
        let mut am: payment::ActiveModel = p.into();
        am.status = Set(next.as_str().to_string());
        am.refunded_amount_cents = Set(refunded);
        am.provider_refund_id = Set(Some(refund.id.clone()));
        am.updated_at = Set(Utc::now().into());
        let updated = am.update(&self.db).await?;

        PAYMENT_TRANSITIONS_TOTAL.with_label_values(&[next.as_str()]).inc();
        info!(payment_id = %updated.id, amount, refund_id = %refund.id, status = %next, "payment_refunded");
        if let Ok(Some(payer)) = user::Entity::find_by_id(payer_id).one(&self.db).await {
            self.mailer.dispatch(templates::refund_processed(&payer.email, amount, &updated.currency));
        }
        Ok(updated)
    }

    /// Abandon a payment that has not gone through yet.
    #[instrument(skip(self), fields(actor_id = %actor.id))]
    pub async fn cancel_pending_payment(&self, actor: &Actor, id: Uuid) -> Result<payment::Model, ServiceError> {
        let p = self.get_payment(actor, id).await?;
        let status = p.status()?;
        if !matches!(status, PaymentStatus::Pending | PaymentStatus::Processing) {
            return Err(ServiceError::conflict(format!("a {status} payment cannot be cancelled")));
        }
        self.cancel_open(p).await
    }

    async fn cancel_open(&self, p: payment::Model) -> Result<payment::Model, ServiceError> {
        if let Some(intent_id) = p.provider_payment_id.as_deref() {
            self.gateway.cancel_payment_intent(intent_id).await?;
        }
        self.transition(p, PaymentStatus::Cancelled, None, None).await
    }

    /// Cancel a reservation, refunding what the policy allows and dropping any unfinished payment.
    #[instrument(skip(self, reason), fields(actor_id = %actor.id))]
    pub async fn cancel_reservation_with_refund(
        &self,
        actor: &Actor,
        reservation_id: Uuid,
        reason: Option<String>,
        policy: RefundPolicy,
    ) -> Result<CancellationResult, ServiceError> {
        let outcome = reservation_service::cancel_reservation(&self.db, actor, reservation_id, reason.clone()).await?;
        let r = outcome.reservation;
        if outcome.already_cancelled {
            return Ok(CancellationResult { reservation: r, refund_cents: 0, already_cancelled: true });
        }

        let mut refund_cents = 0;
        let existing = payment::Entity::find()
            .filter(payment::Column::ReservationId.eq(r.id))
            .one(&self.db)
            .await?;
        if let Some(p) = existing {
            let status = p.status()?;
            if status.is_refundable() {
                let due = refund_due(policy, r.check_in, Utc::now(), p.refundable_cents());
                if due > 0 {
                    match self.refund(p, Some(due), reason.as_deref()).await {
                        Ok(_) => refund_cents = due,
                        Err(e) => warn!(reservation_id = %r.id, error = %e, "cancellation_refund_failed"),
                    }
                }
            } else if matches!(status, PaymentStatus::Pending | PaymentStatus::Processing) {
                if let Err(e) = self.cancel_open(p).await {
                    warn!(reservation_id = %r.id, error = %e, "cancellation_payment_cancel_failed");
                }
            }
        }

        if let Some((r, svc, v)) = self.stay(r.id).await? {
            if let Some(guest) = user::Entity::find_by_id(r.user_id).one(&self.db).await? {
                let stay = stay_details(&r, &svc, &v);
                self.mailer.dispatch(templates::reservation_cancelled(&guest.email, &guest.name, &stay, refund_cents));
            }
        }
        Ok(CancellationResult { reservation: r, refund_cents, already_cancelled: false })
    }
}

fn stay_details<'a>(r: &'a reservation::Model, svc: &'a service::Model, v: &'a venue::Model) -> StayDetails<'a> {
    StayDetails {
        reservation_id: r.id,
        venue_name: &v.name,
        service_name: &svc.name,
        check_in: r.check_in,
        check_out: r.check_out,
        guests: r.guests,
        total_cents: r.total_amount_cents,
        currency: &r.currency,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_service;
    use crate::gateway::mock::{MockGateway, MOCK_WEBHOOK_SECRET};
    use crate::gateway::sign_payload;
    use crate::reservation_service::{create_reservation, CreateReservation};
    use crate::test_support::{get_db, new_service, new_venue, seed_user};
    use crate::venue_service;
    use models::{PricingUnit, RoleName};

    #[test]
    fn filter_builds_conditions() {
        assert!(PaymentFilter::default().condition().is_empty());
        let f = PaymentFilter { status: Some(PaymentStatus::Completed), from: NaiveDate::from_ymd_opt(2031, 1, 1), ..Default::default() };
        assert!(!f.condition().is_empty());
    }

    #[test]
    fn webhook_outcome_serializes_lowercase() {
        assert_eq!(serde_json::to_value(WebhookOutcome::Duplicate).unwrap(), serde_json::json!("duplicate"));
    }

    struct Fixture {
        svc: PaymentService,
        gateway: Arc<MockGateway>,
        guest: Actor,
        admin: Actor,
        reservation_id: Uuid,
    }

    async fn fixture(db: DatabaseConnection) -> Result<Fixture, anyhow::Error> {
        let owner = seed_user(&db, RoleName::VenueOwner).await?;
        let guest = seed_user(&db, RoleName::Customer).await?;
        let admin = seed_user(&db, RoleName::Admin).await?;
        let owner = Actor::new(owner.id, RoleName::VenueOwner);
        let guest = Actor::new(guest.id, RoleName::Customer);
        let admin = Actor::new(admin.id, RoleName::Admin);
        let v = venue_service::create_venue(&db, &owner, new_venue("Pay Inn")).await?;
        let s = catalog_service::create_service(&db, &owner, v.id, new_service(PricingUnit::PerNight, 10_000, 2, 5), "usd").await?;
        let today = NaiveDate::from_ymd_opt(2031, 1, 1).unwrap();
        let input = CreateReservation {
            service_id: s.id,
            check_in: NaiveDate::from_ymd_opt(2031, 8, 1).unwrap(),
            check_out: NaiveDate::from_ymd_opt(2031, 8, 3).unwrap(),
            guests: 1,
            special_requests: None,
        };
        let r = create_reservation(&db, &guest, input, today).await?;
        let gateway = Arc::new(MockGateway::new());
        let svc = PaymentService::new(db, gateway.clone(), Mailer::log_only());
        Ok(Fixture { svc, gateway, guest, admin, reservation_id: r.id })
    }

    #[tokio::test]
    async fn intent_confirm_and_refund() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await? else { return Ok(()) };
        let f = fixture(db).await?;

        let created = f.svc.create_payment_intent(&f.guest, f.reservation_id).await?;
        assert_eq!(created.payment.status, "PENDING");
        assert_eq!(created.payment.amount_cents, 20_000);
        assert!(created.client_secret.is_some());

        // asking again reuses the open intent
        let again = f.svc.create_payment_intent(&f.guest, f.reservation_id).await?;
        assert_eq!(again.payment.id, created.payment.id);
        assert_eq!(f.gateway.intent_count(), 1);

        let intent_id = created.payment.provider_payment_id.clone().unwrap();
        f.gateway.set_intent_status(&intent_id, "succeeded", None);
        let paid = f.svc.confirm_payment(&f.guest, created.payment.id).await?;
        assert_eq!(paid.status, "COMPLETED");

        let r = reservation::Entity::find_by_id(f.reservation_id).one(f.svc.db()).await?.unwrap();
        assert_eq!(r.status, "CONFIRMED");
        assert!(receipt_service::find_by_payment(f.svc.db(), paid.id).await?.is_some());

        assert!(matches!(f.svc.refund_payment(&f.guest, paid.id, None, None).await, Err(ServiceError::Forbidden(_))));
        let partial = f.svc.refund_payment(&f.admin, paid.id, Some(5_000), Some("late check-in".into())).await?;
        assert_eq!(partial.status, "PARTIALLY_REFUNDED");
        assert_eq!(partial.refunded_amount_cents, 5_000);
        assert!(f.svc.refund_payment(&f.admin, paid.id, Some(20_000), None).await.is_err());
        let full = f.svc.refund_payment(&f.admin, paid.id, None, None).await?;
        assert_eq!(full.status, "REFUNDED");
        assert_eq!(full.refunded_amount_cents, 20_000);
        assert_eq!(f.gateway.refunds().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn webhook_is_applied_once() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await? else { return Ok(()) };
        let f = fixture(db).await?;
        let created = f.svc.create_payment_intent(&f.guest, f.reservation_id).await?;
        let intent_id = created.payment.provider_payment_id.clone().unwrap();

        let body = serde_json::json!({
            "id": format!("evt_{}", Uuid::new_v4().simple()),
            "type": "payment_intent.payment_failed",
            "data": {"object": {"id": intent_id, "last_payment_error": {"message": "card declined"}}}
        })
        .to_string();
        let sig = sign_payload(body.as_bytes(), MOCK_WEBHOOK_SECRET, Utc::now().timestamp());

        assert!(f.svc.handle_webhook(body.as_bytes(), "t=1,v1=00").await.is_err());
        assert_eq!(f.svc.handle_webhook(body.as_bytes(), &sig).await?, WebhookOutcome::Processed);
        assert_eq!(f.svc.handle_webhook(body.as_bytes(), &sig).await?, WebhookOutcome::Duplicate);

        let p = f.svc.get_payment(&f.guest, created.payment.id).await?;
        assert_eq!(p.status, "FAILED");
        assert_eq!(p.failure_reason.as_deref(), Some("card declined"));

        // a failed payment can be retried with the same intent
        let retry = f.svc.create_payment_intent(&f.guest, f.reservation_id).await?;
        assert_eq!(retry.payment.id, p.id);
        Ok(())
    }

    #[tokio::test]
    async fn cancelling_unpaid_reservation_cancels_payment() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await? else { return Ok(()) };
        let f = fixture(db).await?;
        let created = f.svc.create_payment_intent(&f.guest, f.reservation_id).await?;

        let res = f.svc.cancel_reservation_with_refund(&f.guest, f.reservation_id, None, RefundPolicy::new(24)).await?;
        assert!(!res.already_cancelled);
        assert_eq!(res.refund_cents, 0);
        let p = f.svc.get_payment(&f.guest, created.payment.id).await?;
        assert_eq!(p.status, "CANCELLED");

        let res = f.svc.cancel_reservation_with_refund(&f.guest, f.reservation_id, None, RefundPolicy::new(24)).await?;
        assert!(res.already_cancelled);
        Ok(())
    }

    #[tokio::test]
    async fn admin_cancel_refunds_paid_stay() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await? else { return Ok(()) };
        let f = fixture(db).await?;
        let created = f.svc.create_payment_intent(&f.guest, f.reservation_id).await?;
        let intent_id = created.payment.provider_payment_id.clone().unwrap();
        f.gateway.set_intent_status(&intent_id, "succeeded", None);
        f.svc.confirm_payment(&f.guest, created.payment.id).await?;

        let res = f.svc.cancel_reservation_with_refund(&f.admin, f.reservation_id, None, RefundPolicy::new(24)).await?;
        assert_eq!(res.reservation.status, "CANCELLED");
        assert_eq!(res.refund_cents, 20_000);
        let p = f.svc.get_payment(&f.admin, created.payment.id).await?;
        assert_eq!(p.status, "REFUNDED");
        assert_eq!(f.gateway.refunds().len(), 1);
        Ok(())
    }
}

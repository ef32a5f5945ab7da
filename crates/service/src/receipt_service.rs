use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::{info, instrument};
use uuid::Uuid;

use models::{payment, receipt, PaymentStatus};
use crate::auth::Actor;
use crate::bulk_service::{prepare_batch, run_sequential, BulkResult};
use crate::errors::ServiceError;

pub async fn find_by_payment<C: ConnectionTrait>(db: &C, payment_id: Uuid) -> Result<Option<receipt::Model>, ServiceError> {
    Ok(receipt::Entity::find().filter(receipt::Column::PaymentId.eq(payment_id)).one(db).await?)
}

/// Issue the receipt for a paid payment; returns the existing one when already issued.
#[instrument(skip(db, p), fields(payment_id = %p.id))]
pub async fn issue_receipt<C: ConnectionTrait>(db: &C, p: &payment::Model) -> Result<receipt::Model, ServiceError> {
    if let Some(existing) = find_by_payment(db, p.id).await? {
        return Ok(existing);
    }
    let status = p.status()?;
    if !matches!(status, PaymentStatus::Completed | PaymentStatus::PartiallyRefunded | PaymentStatus::Refunded) {
        return Err(ServiceError::conflict(format!("no receipt for a {status} payment")));
    }
    let now = Utc::now();
    let am = receipt::ActiveModel {
        id: Set(Uuid::new_v4()),
        payment_id: Set(p.id),
        receipt_number: Set(receipt::receipt_number(p.id, now)),
        amount_cents: Set(p.amount_cents),
        currency: Set(p.currency.clone()),
        issued_at: Set(now.into()),
        verified: Set(false),
        verified_at: Set(None),
        verified_by: Set(None),
    };
    let created = am.insert(db).await?;
    info!(receipt_number = %created.receipt_number, "receipt_issued");
    Ok(created)
}

/// Receipt of a payment the actor paid (or any, for admins).
pub async fn get_by_payment(db: &DatabaseConnection, actor: &Actor, payment_id: Uuid) -> Result<receipt::Model, ServiceError> {
    let p = payment::Entity::find_by_id(payment_id).one(db).await?.ok_or_else(|| ServiceError::not_found("payment"))?;
    if !actor.can_act_for(p.user_id) {
        return Err(ServiceError::forbidden("not your payment"));
    }
    find_by_payment(db, payment_id).await?.ok_or_else(|| ServiceError::not_found("receipt"))
}

/// Mark a receipt verified by an admin. Verifying again keeps the first verification.
#[instrument(skip(db))]
pub async fn verify_receipt(db: &DatabaseConnection, id: Uuid, admin_id: Uuid) -> Result<receipt::Model, ServiceError> {
    let r = receipt::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("receipt"))?;
    if r.verified {
        return Ok(r);
    }
    let p = payment::Entity::find_by_id(r.payment_id).one(db).await?.ok_or_else(|| ServiceError::not_found("payment"))?;
    if r.amount_cents != p.amount_cents || r.currency != p.currency {
        return Err(ServiceError::conflict("receipt does not match its payment"));
    }
    let mut am: receipt::ActiveModel = r.into();
    am.verified = Set(true);
    am.verified_at = Set(Some(Utc::now().into()));
    am.verified_by = Set(Some(admin_id));
    Ok(am.update(db).await?)
}

pub async fn bulk_verify_receipts(db: &DatabaseConnection, ids: &[Uuid], admin_id: Uuid, max: usize) -> Result<BulkResult, ServiceError> {
    let ids = prepare_batch(ids, max)?;
    let result = run_sequential(ids, |id| verify_receipt(db, id, admin_id)).await;
    info!(succeeded = result.succeeded.len(), failed = result.failed.len(), "bulk_verify_done");
    Ok(result)
}

//! Batch operations: sequential, one failure never aborts the rest.

use std::collections::HashSet;
use std::future::Future;

use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::Actor;
use crate::errors::ServiceError;
use crate::payment_service::PaymentService;

pub const MAX_BULK_ITEMS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkFailure {
    pub id: Uuid,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkResult {
    pub succeeded: Vec<Uuid>,
    pub failed: Vec<BulkFailure>,
}

impl BulkResult {
    pub fn total(&self) -> usize { self.succeeded.len() + self.failed.len() }
}

/// Reject empty or oversized batches and drop repeated ids, keeping order.
pub fn prepare_batch(ids: &[Uuid], max: usize) -> Result<Vec<Uuid>, ServiceError> {
    if ids.is_empty() {
        return Err(ServiceError::validation("ids must not be empty"));
    }
    let mut seen = HashSet::with_capacity(ids.len());
    let unique: Vec<Uuid> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();
    if unique.len() > max {
        return Err(ServiceError::validation(format!("at most {max} ids per request")));
    }
    Ok(unique)
}

/// Run `op` for each id in order and collect per-item outcomes.
pub async fn run_sequential<F, Fut, T>(ids: Vec<Uuid>, mut op: F) -> BulkResult
where
    F: FnMut(Uuid) -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let mut result = BulkResult::default();
    for id in ids {
        match op(id).await {
            Ok(_) => result.succeeded.push(id),
            Err(e) => {
                warn!(%id, error = %e, "bulk_item_failed");
                result.failed.push(BulkFailure { id, error: e.to_string() });
            }
        }
    }
    result
}

/// Refund the remaining balance of each payment.
#[instrument(skip(payments, ids, reason), fields(count = ids.len()))]
pub async fn bulk_refund(
    payments: &PaymentService,
    actor: &Actor,
    ids: &[Uuid],
    reason: Option<String>,
    max: usize,
) -> Result<BulkResult, ServiceError> {
    let ids = prepare_batch(ids, max)?;
    let result = run_sequential(ids, |id| {
        let reason = reason.clone();
        async move { payments.refund_payment(actor, id, None, reason).await }
    })
    .await;
    info!(succeeded = result.succeeded.len(), failed = result.failed.len(), "bulk_refund_done");
    Ok(result)
}

/// Cancel payments that are still PENDING or PROCESSING.
#[instrument(skip(payments, ids), fields(count = ids.len()))]
pub async fn bulk_cancel_pending(payments: &PaymentService, actor: &Actor, ids: &[Uuid], max: usize) -> Result<BulkResult, ServiceError> {
    let ids = prepare_batch(ids, max)?;
    let result = run_sequential(ids, |id| payments.cancel_pending_payment(actor, id)).await;
    info!(succeeded = result.succeeded.len(), failed = result.failed.len(), "bulk_cancel_done");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_limits() {
        assert!(prepare_batch(&[], 10).is_err());
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        assert!(prepare_batch(&ids, 2).is_err());
        let dup = vec![ids[0], ids[1], ids[0]];
        assert_eq!(prepare_batch(&dup, 2).unwrap(), vec![ids[0], ids[1]]);
    }

    #[tokio::test]
    async fn failures_do_not_stop_the_batch() {
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let bad = ids[1];
        let result = run_sequential(ids.clone(), |id| async move {
            if id == bad { Err(ServiceError::conflict("nope")) } else { Ok(()) }
        })
        .await;
        assert_eq!(result.succeeded, vec![ids[0], ids[2], ids[3]]);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].id, bad);
        assert!(result.failed[0].error.contains("nope"));
        assert_eq!(result.total(), 4);
    }
}

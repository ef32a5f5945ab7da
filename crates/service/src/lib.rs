//! Service layer for the booking platform, on top of `models`.
//! - Business rules (availability, pricing, lifecycles, refunds) live here.
//! - Operations are free functions over a `DatabaseConnection` taking an `Actor`
//!   for authorization; payments go through `PaymentService`.
//! - External collaborators sit behind traits: `PaymentGateway`, `EmailSender`.

pub mod errors;
pub mod pagination;
pub mod auth;
pub mod user_service;
pub mod rbac_service;
pub mod venue_service;
pub mod catalog_service;
pub mod reservation_service;
pub mod gateway;
pub mod payment_service;
pub mod receipt_service;
pub mod bulk_service;
pub mod review_service;
pub mod audit_service;
pub mod report_service;
pub mod settings_service;
pub mod email;
#[cfg(test)]
pub mod test_support;

pub use errors::{ServiceError, ServiceResult};

pub mod errors;
pub mod db;
pub mod status;

pub mod user;
pub mod user_credentials;
pub mod role;
pub mod permission;
pub mod role_permission;
pub mod venue;
pub mod service;
pub mod reservation;
pub mod payment;
pub mod receipt;
pub mod review;
pub mod admin_audit_log;
pub mod system_config;
pub mod processed_webhook_event;

pub use errors::ModelError;
pub use status::{PaymentStatus, PricingUnit, ReservationStatus, RoleName, VenueType};

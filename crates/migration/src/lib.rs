//! Migrator registering entity-specific migrations in dependency order.
//! Indexes are applied last.
pub use sea_orm_migration::prelude::*;

mod m20240601_000001_create_user;
mod m20240601_000002_create_user_credentials;
mod m20240601_000003_create_rbac;
mod m20240601_000004_create_venue;
mod m20240601_000005_create_service;
mod m20240601_000006_create_reservation;
mod m20240601_000007_create_payment;
mod m20240601_000008_create_receipt;
mod m20240601_000009_create_review;
mod m20240601_000010_create_admin_audit_log;
mod m20240601_000011_create_system_config;
mod m20240601_000012_add_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_user::Migration),
            Box::new(m20240601_000002_create_user_credentials::Migration),
            Box::new(m20240601_000003_create_rbac::Migration),
            Box::new(m20240601_000004_create_venue::Migration),
            Box::new(m20240601_000005_create_service::Migration),
            Box::new(m20240601_000006_create_reservation::Migration),
            Box::new(m20240601_000007_create_payment::Migration),
            Box::new(m20240601_000008_create_receipt::Migration),
            Box::new(m20240601_000009_create_review::Migration),
            Box::new(m20240601_000010_create_admin_audit_log::Migration),
            Box::new(m20240601_000011_create_system_config::Migration),
            // Indexes should always be applied last
            Box::new(m20240601_000012_add_indexes::Migration),
        ]
    }
}

use std::sync::Arc;

use configs::AppConfig;
use sea_orm::DatabaseConnection;
use service::auth::repo::seaorm::SeaOrmAuthRepository;
use service::auth::repository::AuthRepository;
use service::auth::{AuthConfig, AuthService};
use service::email::Mailer;
use service::gateway::{PaymentGateway, StripeGateway};
use service::payment_service::PaymentService;
use service::reservation_service::RefundPolicy;

/// Shared handler state; cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub auth: Arc<AuthService<dyn AuthRepository>>,
    pub payments: Arc<PaymentService>,
    pub mailer: Mailer,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Production wiring: Stripe gateway and the configured mail provider.
    pub fn new(db: DatabaseConnection, config: AppConfig) -> Self {
        let gateway: Arc<dyn PaymentGateway> = Arc::new(StripeGateway::new(&config.payments));
        let mailer = Mailer::from_config(&config.email);
        Self::with_parts(db, config, gateway, mailer)
    }

    pub fn with_parts(db: DatabaseConnection, config: AppConfig, gateway: Arc<dyn PaymentGateway>, mailer: Mailer) -> Self {
        let repo: Arc<dyn AuthRepository> = Arc::new(SeaOrmAuthRepository::new(db.clone()));
        Self::with_auth_repo(db, config, repo, gateway, mailer)
    }

    /// Same wiring with accounts served from `repo` instead of the database.
    pub fn with_auth_repo(
        db: DatabaseConnection,
        config: AppConfig,
        repo: Arc<dyn AuthRepository>,
        gateway: Arc<dyn PaymentGateway>,
        mailer: Mailer,
    ) -> Self {
        let auth = Arc::new(AuthService::new(repo, AuthConfig::from(&config.auth)));
        let payments = Arc::new(PaymentService::new(db.clone(), gateway, mailer.clone()));
        Self { db, auth, payments, mailer, config: Arc::new(config) }
    }

    pub fn refund_policy(&self) -> RefundPolicy { RefundPolicy::from(&self.config.booking) }

    pub fn max_bulk_items(&self) -> usize { self.config.booking.max_bulk_items }
}

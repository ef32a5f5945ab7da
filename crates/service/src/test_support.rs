#![cfg(test)]
use tokio::sync::OnceCell;
use sea_orm::DatabaseConnection;
use migration::MigratorTrait;
use models::db::{connect_with_config, DatabaseConfig};

// Ensure migrations run only once across the entire test process
static MIGRATED: OnceCell<bool> = OnceCell::const_new();

fn test_config() -> Option<DatabaseConfig> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return None;
    }
    let _ = dotenvy::dotenv();
    let url = std::env::var("DATABASE_URL").ok()?;
    Some(DatabaseConfig {
        url,
        max_connections: 20,
        min_connections: 1,
        acquire_timeout_secs: 10,
        ..Default::default()
    })
}

/// A migrated connection, or `None` when no database is configured.
pub async fn get_db() -> Result<Option<DatabaseConnection>, anyhow::Error> {
    let Some(cfg) = test_config() else {
        eprintln!("skip: DATABASE_URL not set or SKIP_DB_TESTS present");
        return Ok(None);
    };

    // Run migrations exactly once, with a throwaway connection
    let migrated = *MIGRATED
        .get_or_init(|| async {
            match connect_with_config(&cfg).await {
                Ok(db) => migration::Migrator::up(&db, None).await.is_ok(),
                Err(_) => false,
            }
        })
        .await;
    if !migrated {
        eprintln!("skip: database unreachable or migrations failed");
        return Ok(None);
    }

    // Return a fresh connection for the current test's runtime
    let db = connect_with_config(&cfg).await?;
    Ok(Some(db))
}

/// Insert a user with the given role and return it.
pub async fn seed_user(db: &DatabaseConnection, role: models::RoleName) -> Result<models::user::Model, anyhow::Error> {
    let email = format!("t_{}@example.com", uuid::Uuid::new_v4());
    Ok(models::user::create(db, &email, "Test User", None, role).await?)
}

pub fn new_venue(name: &str) -> models::venue::NewVenue {
    models::venue::NewVenue {
        name: name.into(),
        description: Some("by the sea".into()),
        venue_type: models::VenueType::Hotel,
        address: "1 Pier St".into(),
        city: "Lisbon".into(),
        country: "PT".into(),
        phone: None,
        email: None,
    }
}

pub fn new_service(pricing_unit: models::PricingUnit, price_cents: i64, capacity: i32, inventory: i32) -> models::service::NewService {
    models::service::NewService {
        name: "Standard".into(),
        description: None,
        pricing_unit,
        price_cents,
        currency: None,
        capacity,
        inventory,
    }
}

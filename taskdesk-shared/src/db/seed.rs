/// Startup seed data
///
/// Runs after migrations. Seeding is idempotent: an administrator account is
/// created only if no user with the configured email exists.

use sqlx::PgPool;
use tracing::{debug, info};

use super::unit_of_work::UnitOfWork;
use crate::{
    auth::password,
    models::{
        self,
        user::{normalize_email, User},
    },
    services::ServiceError,
};

/// Initial administrator account
#[derive(Debug, Clone)]
pub struct SeedConfig {
    pub admin_name: String,
    pub admin_email: String,
    pub admin_password: String,
}

/// Creates the seed administrator if missing; returns whether a user was created
pub async fn seed(pool: &PgPool, config: &SeedConfig) -> Result<bool, ServiceError> {
    let email = normalize_email(&config.admin_email);

    let mut uow = UnitOfWork::begin(pool).await?;

    if uow.users().find_by_email(&email).await?.is_some() {
        debug!(email = %email, "Seed administrator already present");
        return Ok(false);
    }

    let password_hash = password::hash_password(&config.admin_password)?;
    let user = User::new(config.admin_name.trim(), email, password_hash, models::now());
    let user = uow.users().add(&user).await?;
    uow.commit().await?;

    info!(user_id = %user.id, "Seed administrator created");
    Ok(true)
}

/// Registration and login
///
/// Passwords are hashed with Argon2id on a blocking thread so a burst of
/// logins does not stall the async runtime. Accounts imported with the
/// legacy static-salt SHA-256 scheme still log in and are re-hashed with
/// Argon2id inside the same transaction.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

use super::{is_unique_violation, ServiceError, ServiceResult};
use crate::{
    auth::{
        jwt::{self, Claims},
        password::{self, PasswordVerification},
    },
    db::unit_of_work::UnitOfWork,
    models::{
        self,
        user::{normalize_email, User, UserProfile, EMAIL_UNIQUE_CONSTRAINT},
    },
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Argon2id hash with production parameters that matches no password.
/// Verified against on unknown emails so both login failures cost one hash.
const DUMMY_PASSWORD_HASH: &str =
    "$argon2id$v=19$m=65536,t=3,p=4$dGFza2Rlc2stZHVtbXkhIQ$xeT75QsHQM4o1wajbxHZopTEaWY3ay0yPVXW46pvTO8";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required (max 100 characters)"))]
    pub name: String,

    #[validate(email(message = "Email must be a valid address"))]
    pub email: String,

    #[validate(length(min = 8, max = 128, message = "Password must be 8 to 128 characters"))]
    pub password: String,
}

impl RegisterRequest {
    fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: normalize_email(&self.email),
            password: self.password,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Issued token plus the authenticated user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

/// Signing and hashing settings
#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// HS256 signing secret
    pub jwt_secret: String,

    /// Lifetime of issued tokens
    pub token_ttl: Duration,

    /// Salt of the legacy SHA-256 scheme; `None` disables legacy logins
    pub legacy_salt: Option<String>,
}

#[derive(Clone)]
pub struct AuthService {
    pool: PgPool,
    settings: Arc<AuthSettings>,
}

impl AuthService {
    pub fn new(pool: PgPool, settings: AuthSettings) -> Self {
        Self {
            pool,
            settings: Arc::new(settings),
        }
    }

    /// Creates an account and signs the caller in
    ///
    /// # Errors
    ///
    /// - `Validation` for a blank name, malformed email or short password
    /// - `Conflict` if the email is already registered
    pub async fn register(&self, request: RegisterRequest) -> ServiceResult<AuthResponse> {
        let request = request.normalized();
        request.validate()?;

        let password_hash = hash_blocking(request.password).await?;

        let mut uow = UnitOfWork::begin(&self.pool).await?;

        if uow.users().find_by_email(&request.email).await?.is_some() {
            return Err(email_taken());
        }

        let user = User::new(request.name, request.email, password_hash, models::now());
        let user = uow.users().add(&user).await.map_err(|e| {
            if is_unique_violation(&e, EMAIL_UNIQUE_CONSTRAINT) {
                email_taken()
            } else {
                ServiceError::from(e)
            }
        })?;

        let token = self.issue_token(&user)?;
        uow.commit().await?;

        info!(user_id = %user.id, "User registered");

        Ok(AuthResponse {
            token,
            user: UserProfile::from(&user),
        })
    }

    /// Verifies credentials and issues a token
    ///
    /// Unknown email and wrong password return the same error after the
    /// same amount of hashing work.
    pub async fn login(&self, request: LoginRequest) -> ServiceResult<AuthResponse> {
        request.validate()?;
        let email = normalize_email(&request.email);

        let mut uow = UnitOfWork::begin(&self.pool).await?;

        let Some(mut user) = uow.users().find_by_email(&email).await? else {
            verify_blocking(request.password, DUMMY_PASSWORD_HASH.to_string(), None).await?;
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        };

        let verification = verify_blocking(
            request.password.clone(),
            user.password_hash.clone(),
            self.settings.legacy_salt.clone(),
        )
        .await?;

        match verification {
            PasswordVerification::Valid => {}
            PasswordVerification::ValidLegacy => {
                user.password_hash = hash_blocking(request.password).await?;
                user = uow
                    .users()
                    .update(&user)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;
                info!(user_id = %user.id, "Upgraded legacy password hash");
            }
            PasswordVerification::Invalid => {
                warn!(user_id = %user.id, "Failed login attempt");
                return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
            }
        }

        let token = self.issue_token(&user)?;
        uow.commit().await?;

        info!(user_id = %user.id, "User logged in");

        Ok(AuthResponse {
            token,
            user: UserProfile::from(&user),
        })
    }

    fn issue_token(&self, user: &User) -> ServiceResult<String> {
        let claims = Claims::new(user.id, user.name.clone(), self.settings.token_ttl);
        Ok(jwt::create_token(&claims, &self.settings.jwt_secret)?)
    }
}

fn email_taken() -> ServiceError {
    ServiceError::Conflict("Email is already registered".to_string())
}

async fn hash_blocking(password: String) -> ServiceResult<String> {
    tokio::task::spawn_blocking(move || password::hash_password(&password))
        .await
        .map_err(|e| ServiceError::Internal(format!("Hashing task failed: {}", e)))?
        .map_err(ServiceError::from)
}

async fn verify_blocking(
    password: String,
    stored_hash: String,
    legacy_salt: Option<String>,
) -> ServiceResult<PasswordVerification> {
    tokio::task::spawn_blocking(move || {
        password::verify_stored_password(&password, &stored_hash, legacy_salt.as_deref())
    })
    .await
    .map_err(|e| ServiceError::Internal(format!("Verification task failed: {}", e)))?
    .map_err(ServiceError::from)
}

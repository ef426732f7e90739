/// Authentication utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing, plus legacy SHA-256 verification
/// - [`jwt`]: JWT token generation and validation
/// - [`middleware`]: Bearer-token middleware and the caller identity type
///
/// # Example
///
/// ```no_run
/// use taskdesk_shared::auth::password::{hash_password, verify_password};
/// use taskdesk_shared::auth::jwt::{create_token, Claims};
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), "Ada", Duration::hours(24));
/// let token = create_token(&claims, "secret-key")?;
/// # Ok(())
/// # }
/// ```

pub mod jwt;
pub mod middleware;
pub mod password;

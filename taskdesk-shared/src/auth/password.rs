/// Password hashing module using Argon2id
///
/// New passwords are hashed with Argon2id and a random per-user salt. The
/// resulting PHC string embeds algorithm, parameters and salt, so
/// verification needs nothing but the stored hash.
///
/// # Security
///
/// - **Algorithm**: Argon2id (hybrid of Argon2i and Argon2d)
/// - **Memory**: 64 MB (65536 KB)
/// - **Iterations**: 3 passes
/// - **Parallelism**: 4 lanes
/// - **Output**: 32-byte hash
///
/// # Legacy hashes
///
/// Accounts imported from the previous deployment carry
/// `hex(SHA-256(salt || password))` where `salt` is one static value shared
/// by every account. [`verify_stored_password`] accepts those when the
/// static salt is configured and reports [`PasswordVerification::ValidLegacy`]
/// so callers can re-hash the password with Argon2id.
///
/// # Example
///
/// ```
/// use taskdesk_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let password = "super_secret_password_123";
/// let hash = hash_password(password)?;
///
/// assert!(verify_password(password, &hash)?);
/// assert!(!verify_password("wrong_password", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};
use sha2::{Digest, Sha256};

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Invalid password hash format
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

/// Outcome of checking a password against a stored hash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordVerification {
    /// Password matches an Argon2id hash
    Valid,

    /// Password matches a legacy static-salt SHA-256 hash and should be re-hashed
    ValidLegacy,

    /// Password does not match
    Invalid,
}

/// Hashes a password using Argon2id with secure parameters
///
/// # Returns
///
/// PHC string format hash, e.g.
/// ```text
/// $argon2id$v=19$m=65536,t=3,p=4$c2FsdHNhbHRzYWx0$hash...
/// ```
///
/// # Errors
///
/// Returns `PasswordError::HashError` if hashing fails
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = ParamsBuilder::new()
        .m_cost(65536) // 64 MB
        .t_cost(3)
        .p_cost(4)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(password_hash.to_string())
}

/// Verifies a password against an Argon2 PHC hash
///
/// Comparison is constant-time inside the `argon2` crate.
///
/// # Errors
///
/// Returns `PasswordError::InvalidHash` if `hash` is not a PHC string and
/// `PasswordError::VerifyError` for any other verification failure.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    // Parameters are embedded in the hash
    let argon2 = Argon2::default();

    match argon2.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
    }
}

/// Computes a legacy static-salt hash: lowercase hex of `SHA-256(salt || password)`
pub fn legacy_hash(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Checks a password against whatever hash format is stored
///
/// PHC strings (leading `$`) go through Argon2. Anything else is treated as
/// a legacy SHA-256 hash, which only verifies when `legacy_salt` is set.
pub fn verify_stored_password(
    password: &str,
    stored_hash: &str,
    legacy_salt: Option<&str>,
) -> Result<PasswordVerification, PasswordError> {
    if stored_hash.starts_with('$') {
        return Ok(if verify_password(password, stored_hash)? {
            PasswordVerification::Valid
        } else {
            PasswordVerification::Invalid
        });
    }

    let Some(salt) = legacy_salt else {
        return Ok(PasswordVerification::Invalid);
    };

    let computed = legacy_hash(password, salt);
    if constant_time_compare(&computed, &stored_hash.to_ascii_lowercase()) {
        Ok(PasswordVerification::ValidLegacy)
    } else {
        Ok(PasswordVerification::Invalid)
    }
}

/// Constant-time string comparison
///
/// Always walks the full length so timing does not reveal the position of
/// the first mismatch. Length differences return early.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password() {
        let hash = hash_password("test_password_123").expect("Hash should succeed");

        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("v=19"));
        assert!(hash.contains("m=65536"));
        assert!(hash.contains("t=3"));
        assert!(hash.contains("p=4"));
    }

    #[test]
    fn test_hash_password_produces_different_salts() {
        let hash1 = hash_password("same_password").expect("Hash 1 should succeed");
        let hash2 = hash_password("same_password").expect("Hash 2 should succeed");

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_verify_password_correct_and_incorrect() {
        let hash = hash_password("correct_password").expect("Hash should succeed");

        assert!(verify_password("correct_password", &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
        assert!(!verify_password("", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        assert!(verify_password("password", "invalid_hash").is_err());
        // Salt and output too short to decode
        assert!(verify_password("password", "$argon2id$v=19$m=65536,t=3,p=4$!!$!!").is_err());
    }

    #[test]
    fn test_legacy_hash_is_hex_sha256() {
        // sha256("pepper" || "secret")
        let hash = legacy_hash("secret", "pepper");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, legacy_hash("secret", "pepper"));
        assert_ne!(hash, legacy_hash("secret", "salt"));
    }

    #[test]
    fn test_verify_stored_password_argon2() {
        let hash = hash_password("P@ssw0rd!").unwrap();

        assert_eq!(
            verify_stored_password("P@ssw0rd!", &hash, None).unwrap(),
            PasswordVerification::Valid
        );
        assert_eq!(
            verify_stored_password("nope", &hash, Some("pepper")).unwrap(),
            PasswordVerification::Invalid
        );
    }

    #[test]
    fn test_verify_stored_password_legacy() {
        let stored = legacy_hash("P@ssw0rd!", "pepper");

        assert_eq!(
            verify_stored_password("P@ssw0rd!", &stored, Some("pepper")).unwrap(),
            PasswordVerification::ValidLegacy
        );
        assert_eq!(
            verify_stored_password("P@ssw0rd!", &stored.to_uppercase(), Some("pepper")).unwrap(),
            PasswordVerification::ValidLegacy
        );
        assert_eq!(
            verify_stored_password("wrong", &stored, Some("pepper")).unwrap(),
            PasswordVerification::Invalid
        );
        assert_eq!(
            verify_stored_password("P@ssw0rd!", &stored, Some("other")).unwrap(),
            PasswordVerification::Invalid
        );
    }

    #[test]
    fn test_legacy_hash_rejected_without_salt() {
        let stored = legacy_hash("P@ssw0rd!", "pepper");

        let result = verify_stored_password("P@ssw0rd!", &stored, None).unwrap();
        assert_eq!(result, PasswordVerification::Invalid);
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("hello", "hello"));
        assert!(constant_time_compare("", ""));
        assert!(!constant_time_compare("hello", "world"));
        assert!(!constant_time_compare("hello", "hello!"));
    }
}

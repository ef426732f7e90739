/// User model and user-specific repository queries
///
/// Users are created at registration and never updated through the API.
/// The password hash stays inside the persistence boundary: it is skipped
/// on serialization and [`UserProfile`] is what leaves the service layer.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(100) NOT NULL,
///     email VARCHAR(255) NOT NULL,
///     password_hash VARCHAR(255) NOT NULL,
///     created_on TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// CREATE UNIQUE INDEX users_email_key ON users (email);
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{query_builder::Separated, Postgres};
use uuid::Uuid;

use crate::db::repository::{Entity, Repository};

/// Name of the unique index on `users.email`
pub const EMAIL_UNIQUE_CONSTRAINT: &str = "users_email_key";

/// User account row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Email address, stored lowercased; unique across users
    pub email: String,

    /// Argon2id PHC string (or a legacy SHA-256 hex digest for imported accounts)
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// When the account was created
    pub created_on: DateTime<Utc>,
}

impl User {
    /// Builds a new, not yet persisted user with a fresh ID
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        created_on: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            created_on,
        }
    }
}

impl Entity for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &["name", "email", "password_hash", "created_on"];

    fn id(&self) -> Uuid {
        self.id
    }

    fn push_values(&self, values: &mut Separated<'_, 'static, Postgres, &'static str>) {
        values.push_bind(self.name.clone());
        values.push_bind(self.email.clone());
        values.push_bind(self.password_hash.clone());
        values.push_bind(self.created_on);
    }
}

/// Public view of a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_on: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            created_on: user.created_on,
        }
    }
}

/// Canonical form used for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl Repository<'_, User> {
    /// Finds a user by email address (expects a normalized address)
    pub async fn find_by_email(&mut self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let mut query = self.query();
        query.push(" WHERE email = ").push_bind(email.to_string());
        self.fetch_optional(query).await
    }
}

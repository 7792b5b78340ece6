/// User model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id BIGSERIAL PRIMARY KEY,
///     name VARCHAR(100) NOT NULL,
///     email VARCHAR(255) NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     photo_url VARCHAR(512),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login_at TIMESTAMPTZ
/// );
/// ```
///
/// Users are never hard-deleted. Each user owns their own profile fields; the
/// password hash never leaves this module in a serialized payload (see
/// [`UserSummary`]).
///
/// # Example
///
/// ```no_run
/// use splitease_shared::models::user::{CreateUser, User};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     name: "Ana".to_string(),
///     email: "ana@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
/// }).await?;
///
/// let found = User::find_by_email(&pool, "ana@example.com").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

const USER_COLUMNS: &str =
    "id, name, email, password_hash, photo_url, created_at, last_login_at";

/// A registered user account
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Numeric user ID
    pub id: i64,

    /// Display name
    pub name: String,

    /// Unique email address
    pub email: String,

    /// Argon2id PHC string
    pub password_hash: String,

    /// Reference to the uploaded profile photo, if any
    pub photo_url: Option<String>,

    pub created_at: DateTime<Utc>,

    /// None until the first successful login
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Public projection of a user, safe to return to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub photo_url: Option<String>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            photo_url: user.photo_url.clone(),
            last_login_at: user.last_login_at,
        }
    }
}

/// Input for registering a user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub name: String,
    pub email: String,

    /// Already hashed; never the plaintext password
    pub password_hash: String,
}

impl User {
    /// Inserts a new user.
    ///
    /// # Errors
    ///
    /// Fails with a database error on the `users_email_key` constraint when
    /// the email is already registered.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (name, email, password_hash) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(data.name)
            .bind(data.email)
            .bind(data.password_hash)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Looks a user up by email, ignoring case.
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM users WHERE LOWER(email) = LOWER($1)",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Updates name and photo reference. `None` leaves a field untouched.
    ///
    /// Returns None when the user does not exist.
    pub async fn update_profile(
        pool: &PgPool,
        id: i64,
        name: Option<String>,
        photo_url: Option<String>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                photo_url = COALESCE($3, photo_url)
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(name)
            .bind(photo_url)
            .fetch_optional(pool)
            .await
    }

    /// Stamps `last_login_at` with the current time.
    pub async fn update_last_login(pool: &PgPool, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_omits_password_hash() {
        let user = User {
            id: 7,
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            photo_url: None,
            created_at: Utc::now(),
            last_login_at: None,
        };

        let json = serde_json::to_string(&UserSummary::from(&user)).unwrap();
        assert!(json.contains("\"id\":7"));
        assert!(json.contains("ana@example.com"));
        assert!(!json.contains("argon2id"));
    }
}

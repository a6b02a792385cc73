//! User accounts: registration, credential checks, profiles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::error::{Error, Result};

const MIN_PASSWORD_LEN: usize = 6;

/// A registered account. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Account store backed by SQLite
#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

impl std::fmt::Debug for UserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserStore")
            .field("pool", &"<SqlitePool>")
            .finish()
    }
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create an account. Emails are normalized to lowercase and unique;
    /// passwords are stored as bcrypt hashes.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User> {
        let name = name.trim();
        let email = email.trim().to_lowercase();

        if name.is_empty() {
            return Err(Error::InvalidRequest("Name is required".to_string()));
        }
        if !email.contains('@') {
            return Err(Error::InvalidRequest(
                "Please enter a valid email".to_string(),
            ));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(Error::InvalidRequest(
                "Password must be at least 6 characters long".to_string(),
            ));
        }

        let hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;
        let user = User {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email,
            created_at: Utc::now(),
            last_login: None,
        };

        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, created_at, last_login)
            VALUES (?, ?, ?, ?, ?, NULL)
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            // The unique index on email is the authoritative duplicate check;
            // concurrent registrations both land here instead of racing a
            // SELECT.
            if e.as_database_error()
                .is_some_and(|db| db.is_unique_violation())
            {
                Error::InvalidRequest("User with this email already exists".to_string())
            } else {
                Error::Database(e)
            }
        })?;

        tracing::info!(email = %user.email, "registered new user");
        Ok(user)
    }

    /// Verify credentials and stamp `last_login`.
    ///
    /// Unknown email and wrong password produce the same error message.
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let email = email.trim().to_lowercase();

        let row = sqlx::query(
            "SELECT id, name, email, password_hash, created_at FROM users WHERE email = ?",
        )
        .bind(&email)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::Unauthenticated("Invalid email or password".to_string()))?;

        let hash: String = row.try_get("password_hash")?;
        if !bcrypt::verify(password, &hash)? {
            return Err(Error::Unauthenticated(
                "Invalid email or password".to_string(),
            ));
        }

        let now = Utc::now();
        sqlx::query("UPDATE users SET last_login = ? WHERE email = ?")
            .bind(now)
            .bind(&email)
            .execute(&self.pool)
            .await?;

        Ok(User {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            created_at: row.try_get("created_at").unwrap_or_else(|_| Utc::now()),
            last_login: Some(now),
        })
    }

    /// Look up a profile by email
    pub async fn profile(&self, email: &str) -> Result<User> {
        let email = email.trim().to_lowercase();

        let row = sqlx::query(
            "SELECT id, name, email, created_at, last_login FROM users WHERE email = ?",
        )
        .bind(&email)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::NotFound("User"))?;

        Ok(User {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            created_at: row.try_get("created_at").unwrap_or_else(|_| Utc::now()),
            last_login: row.try_get("last_login").ok(),
        })
    }
}

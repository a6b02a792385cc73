//! Per-user memory profile storage
//!
//! Each user owns a set of key/value facts used to personalize prompts. Keys
//! are case-insensitively unique per user: writing an existing key updates
//! the item in place. The parent record's `total_memories` counter is
//! maintained in the same transaction as the items so the two can never
//! drift apart.

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::error::{Error, Result};
use crate::types::{parse_category, MemoryCategory, MemoryItem, UserMemory};

/// Header line prepended to a non-empty rendered memory context
const CONTEXT_HEADER: &str = "[User Profile - Remember these facts about the user]";

/// Memory profile store backed by SQLite
#[derive(Clone)]
pub struct MemoryStore {
    pool: SqlitePool,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("pool", &"<SqlitePool>")
            .finish()
    }
}

impl MemoryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Add a memory or update it in place when the key already exists
    /// (case-insensitive match).
    ///
    /// An update overwrites value/category/importance, bumps `use_count`,
    /// and refreshes `last_used`. An insert starts at `use_count = 0` and
    /// increments the profile's `total_memories`. The profile record is
    /// created lazily on the first write. Importance is clamped to 1..=5.
    pub async fn upsert(
        &self,
        user_id: &str,
        user_email: Option<&str>,
        key: &str,
        value: &str,
        category: MemoryCategory,
        importance: i64,
    ) -> Result<UserMemory> {
        let importance = importance.clamp(1, 5);
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO user_memories (user_id, user_email, total_memories, last_updated)
            VALUES (?, ?, 0, ?)
            ON CONFLICT(user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(user_email)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let existing = sqlx::query(
            "SELECT id FROM memory_items WHERE user_id = ? AND LOWER(key) = LOWER(?)",
        )
        .bind(user_id)
        .bind(key)
        .fetch_optional(&mut *tx)
        .await?;

        match existing {
            Some(row) => {
                let id: i64 = row.try_get("id")?;
                sqlx::query(
                    r#"
                    UPDATE memory_items
                    SET value = ?, category = ?, importance = ?,
                        last_used = ?, use_count = use_count + 1
                    WHERE id = ?
                    "#,
                )
                .bind(value)
                .bind(category.to_string())
                .bind(importance)
                .bind(now)
                .bind(id)
                .execute(&mut *tx)
                .await?;
            }
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO memory_items
                        (user_id, key, value, category, importance, created_at, last_used, use_count)
                    VALUES (?, ?, ?, ?, ?, ?, ?, 0)
                    "#,
                )
                .bind(user_id)
                .bind(key)
                .bind(value)
                .bind(category.to_string())
                .bind(importance)
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await?;

                sqlx::query(
                    "UPDATE user_memories SET total_memories = total_memories + 1 WHERE user_id = ?",
                )
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        sqlx::query("UPDATE user_memories SET last_updated = ? WHERE user_id = ?")
            .bind(now)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.get(user_id).await
    }

    /// Remove a memory by key (case-insensitive)
    pub async fn remove(&self, user_id: &str, key: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "DELETE FROM memory_items WHERE user_id = ? AND LOWER(key) = LOWER(?)",
        )
        .bind(user_id)
        .bind(key)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Memory"));
        }

        sqlx::query(
            r#"
            UPDATE user_memories
            SET total_memories = (SELECT COUNT(*) FROM memory_items WHERE user_id = ?),
                last_updated = ?
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .bind(Utc::now())
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Mark a memory as applied: bump `use_count` and refresh `last_used`
    /// without changing the value. Returns whether a matching item existed.
    pub async fn touch(&self, user_id: &str, key: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE memory_items
            SET use_count = use_count + 1, last_used = ?
            WHERE user_id = ? AND LOWER(key) = LOWER(?)
            "#,
        )
        .bind(Utc::now())
        .bind(user_id)
        .bind(key)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Load a user's full memory profile.
    ///
    /// A user with no stored memories yields an empty profile rather than an
    /// error; items come back in insertion order.
    pub async fn get(&self, user_id: &str) -> Result<UserMemory> {
        let record = sqlx::query(
            "SELECT user_email, total_memories, last_updated FROM user_memories WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(record) = record else {
            return Ok(UserMemory::empty(user_id));
        };

        let rows = sqlx::query(
            r#"
            SELECT key, value, category, importance, created_at, last_used, use_count
            FROM memory_items
            WHERE user_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(UserMemory {
            user_id: user_id.to_string(),
            user_email: record.try_get("user_email").ok(),
            memories: rows.iter().map(row_to_item).collect(),
            total_memories: record.try_get("total_memories").unwrap_or(0),
            last_updated: record
                .try_get("last_updated")
                .unwrap_or_else(|_| Utc::now()),
        })
    }

    /// Render the profile as text for prompt injection.
    ///
    /// Empty profiles render as the empty string. Otherwise: a fixed header
    /// line followed by one `- key: value` line per item, ranked by
    /// `importance * use_count` descending. Ties break on insertion order
    /// (ascending rowid), which keeps the rendering deterministic.
    pub async fn render_context(&self, user_id: &str) -> Result<String> {
        let rows = sqlx::query(
            r#"
            SELECT key, value, category, importance, created_at, last_used, use_count
            FROM memory_items
            WHERE user_id = ?
            ORDER BY importance * use_count DESC, id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(String::new());
        }

        let mut out = String::from("\n");
        out.push_str(CONTEXT_HEADER);
        out.push('\n');
        for row in &rows {
            let item = row_to_item(row);
            out.push_str(&format!("- {}: {}\n", item.key, item.value));
        }
        Ok(out)
    }
}

fn row_to_item(row: &sqlx::sqlite::SqliteRow) -> MemoryItem {
    let category_str: String = row.try_get("category").unwrap_or_default();

    MemoryItem {
        key: row.try_get("key").unwrap_or_default(),
        value: row.try_get("value").unwrap_or_default(),
        category: parse_category(&category_str),
        importance: row.try_get("importance").unwrap_or(3),
        created_at: row.try_get("created_at").unwrap_or_else(|_| Utc::now()),
        last_used: row.try_get("last_used").unwrap_or_else(|_| Utc::now()),
        use_count: row.try_get("use_count").unwrap_or(0),
    }
}

//! Conversation thread storage
//!
//! Threads are identified by the pair (thread_id, user_id); the thread id
//! itself is client-generated and opaque. Message logs are append-only.

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::error::{Error, Result};
use crate::types::{parse_role, ChatMessage, Role, ThreadSummary};

/// Maximum number of characters of the first message carried into the title
const TITLE_MAX_CHARS: usize = 50;

/// Thread store backed by SQLite
#[derive(Clone)]
pub struct ThreadStore {
    pool: SqlitePool,
}

impl std::fmt::Debug for ThreadStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadStore")
            .field("pool", &"<SqlitePool>")
            .finish()
    }
}

impl ThreadStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a message, creating the thread on first write.
    ///
    /// A new thread takes its title from the message that creates it,
    /// truncated to 50 characters with a trailing `...` when longer.
    pub async fn append_or_create(
        &self,
        thread_id: &str,
        user_id: &str,
        user_email: Option<&str>,
        role: Role,
        content: &str,
    ) -> Result<()> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let existing =
            sqlx::query("SELECT id FROM threads WHERE thread_id = ? AND user_id = ?")
                .bind(thread_id)
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;

        let thread_rowid: i64 = match existing {
            Some(row) => {
                let id: i64 = row.try_get("id")?;
                sqlx::query("UPDATE threads SET updated_at = ? WHERE id = ?")
                    .bind(now)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                id
            }
            None => {
                let result = sqlx::query(
                    r#"
                    INSERT INTO threads (thread_id, user_id, user_email, title, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(thread_id)
                .bind(user_id)
                .bind(user_email)
                .bind(derive_title(content))
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await?;
                result.last_insert_rowid()
            }
        };

        sqlx::query(
            "INSERT INTO messages (thread_rowid, role, content, timestamp) VALUES (?, ?, ?, ?)",
        )
        .bind(thread_rowid)
        .bind(role.to_string())
        .bind(content)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// List a user's threads, most recently updated first
    pub async fn list(&self, user_id: &str) -> Result<Vec<ThreadSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT thread_id, title, created_at, updated_at
            FROM threads
            WHERE user_id = ?
            ORDER BY updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| ThreadSummary {
                thread_id: row.try_get("thread_id").unwrap_or_default(),
                title: row.try_get("title").unwrap_or_default(),
                created_at: row.try_get("created_at").unwrap_or_else(|_| Utc::now()),
                updated_at: row.try_get("updated_at").unwrap_or_else(|_| Utc::now()),
            })
            .collect())
    }

    /// Load a thread's messages in append order
    pub async fn get(&self, thread_id: &str, user_id: &str) -> Result<Vec<ChatMessage>> {
        let thread = sqlx::query("SELECT id FROM threads WHERE thread_id = ? AND user_id = ?")
            .bind(thread_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(Error::NotFound("Thread"))?;

        let thread_rowid: i64 = thread.try_get("id")?;

        let rows = sqlx::query(
            "SELECT role, content, timestamp FROM messages WHERE thread_rowid = ? ORDER BY id ASC",
        )
        .bind(thread_rowid)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let role_str: String = row.try_get("role").unwrap_or_default();
                ChatMessage {
                    role: parse_role(&role_str),
                    content: row.try_get("content").unwrap_or_default(),
                    timestamp: row.try_get("timestamp").unwrap_or_else(|_| Utc::now()),
                }
            })
            .collect())
    }

    /// Delete a thread and its messages
    pub async fn delete(&self, thread_id: &str, user_id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let thread = sqlx::query("SELECT id FROM threads WHERE thread_id = ? AND user_id = ?")
            .bind(thread_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(Error::NotFound("Thread"))?;

        let thread_rowid: i64 = thread.try_get("id")?;

        sqlx::query("DELETE FROM messages WHERE thread_rowid = ?")
            .bind(thread_rowid)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM threads WHERE id = ?")
            .bind(thread_rowid)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

/// Derive a thread title from its first message, char-boundary safe
fn derive_title(content: &str) -> String {
    let mut title: String = content.chars().take(TITLE_MAX_CHARS).collect();
    if content.chars().count() > TITLE_MAX_CHARS {
        title.push_str("...");
    }
    title
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util;

    async fn store() -> ThreadStore {
        ThreadStore::new(test_util::pool().await)
    }

    #[tokio::test]
    async fn n_appends_give_n_messages_in_call_order() {
        let store = store().await;

        for i in 0..5 {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            store
                .append_or_create("t1", "u1", None, role, &format!("msg {i}"))
                .await
                .unwrap();
        }

        let messages = store.get("t1", "u1").await.unwrap();
        assert_eq!(messages.len(), 5);
        for (i, msg) in messages.iter().enumerate() {
            assert_eq!(msg.content, format!("msg {i}"));
        }
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn title_comes_from_first_message_truncated() {
        let store = store().await;

        let long = "x".repeat(60);
        store
            .append_or_create("t1", "u1", None, Role::User, &long)
            .await
            .unwrap();
        store
            .append_or_create("t2", "u1", None, Role::User, "short")
            .await
            .unwrap();

        let titles: Vec<String> = store
            .list("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();

        assert!(titles.contains(&format!("{}...", "x".repeat(50))));
        assert!(titles.contains(&"short".to_string()));
    }

    #[tokio::test]
    async fn title_truncation_respects_char_boundaries() {
        // 60 multi-byte chars; byte-indexed truncation would panic here.
        let content = "\u{00e9}".repeat(60);
        assert_eq!(derive_title(&content), format!("{}...", "\u{00e9}".repeat(50)));
        assert_eq!(derive_title("hi"), "hi");
    }

    #[tokio::test]
    async fn same_thread_id_under_different_users_is_distinct() {
        let store = store().await;

        store
            .append_or_create("t1", "alice", None, Role::User, "from alice")
            .await
            .unwrap();
        store
            .append_or_create("t1", "bob", None, Role::User, "from bob")
            .await
            .unwrap();

        assert_eq!(store.get("t1", "alice").await.unwrap().len(), 1);
        assert_eq!(store.get("t1", "bob").await.unwrap().len(), 1);
        assert_eq!(
            store.get("t1", "alice").await.unwrap()[0].content,
            "from alice"
        );
    }

    #[tokio::test]
    async fn list_orders_by_most_recently_updated() {
        let store = store().await;

        store
            .append_or_create("older", "u1", None, Role::User, "first")
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store
            .append_or_create("newer", "u1", None, Role::User, "second")
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        // Appending to the older thread bumps it to the front.
        store
            .append_or_create("older", "u1", None, Role::Assistant, "reply")
            .await
            .unwrap();

        let threads = store.list("u1").await.unwrap();
        assert_eq!(threads[0].thread_id, "older");
        assert_eq!(threads[1].thread_id, "newer");
    }

    #[tokio::test]
    async fn get_missing_thread_is_not_found() {
        let store = store().await;
        let err = store.get("nope", "u1").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_removes_thread_and_messages() {
        let store = store().await;

        store
            .append_or_create("t1", "u1", None, Role::User, "hello")
            .await
            .unwrap();
        store.delete("t1", "u1").await.unwrap();

        assert!(matches!(
            store.get("t1", "u1").await.unwrap_err(),
            Error::NotFound(_)
        ));
        assert!(store.list("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_missing_thread_is_not_found() {
        let store = store().await;
        let err = store.delete("nope", "u1").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}

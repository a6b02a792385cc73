//! Persisted data model: threads, messages, and the per-user memory profile

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque client-generated conversation identifier.
///
/// A thread is identified by the pair (thread id, user id); the same thread
/// id under a different user is a distinct thread.
pub type ThreadId = String;

/// Opaque user identifier
pub type UserId = String;

/// Who authored a message in a thread
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// Parse a role from its stored string form, defaulting to user
pub(crate) fn parse_role(s: &str) -> Role {
    match s {
        "assistant" => Role::Assistant,
        _ => Role::User,
    }
}

/// A single message within a thread
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// A persisted conversation with its full message log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub thread_id: ThreadId,
    pub user_id: UserId,
    pub user_email: Option<String>,
    /// Derived from the first user message, truncated to 50 characters
    pub title: String,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Thread listing entry without the message log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub thread_id: ThreadId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Categories a memory fact can belong to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum MemoryCategory {
    Personal,
    Preference,
    Skill,
    Goal,
    Fact,
    #[default]
    Other,
}

impl std::fmt::Display for MemoryCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryCategory::Personal => write!(f, "personal"),
            MemoryCategory::Preference => write!(f, "preference"),
            MemoryCategory::Skill => write!(f, "skill"),
            MemoryCategory::Goal => write!(f, "goal"),
            MemoryCategory::Fact => write!(f, "fact"),
            MemoryCategory::Other => write!(f, "other"),
        }
    }
}

/// Parse a category from its stored string form
pub(crate) fn parse_category(s: &str) -> MemoryCategory {
    match s {
        "personal" => MemoryCategory::Personal,
        "preference" => MemoryCategory::Preference,
        "skill" => MemoryCategory::Skill,
        "goal" => MemoryCategory::Goal,
        "fact" => MemoryCategory::Fact,
        _ => MemoryCategory::Other,
    }
}

/// One remembered fact about a user.
///
/// Keys are case-insensitively unique within a user's profile; writing an
/// existing key updates the item in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryItem {
    pub key: String,
    pub value: String,
    pub category: MemoryCategory,
    /// 1 (trivia) through 5 (essential)
    pub importance: i64,
    pub created_at: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
    pub use_count: i64,
}

/// A user's complete memory profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserMemory {
    pub user_id: UserId,
    pub user_email: Option<String>,
    pub memories: Vec<MemoryItem>,
    /// Always equals `memories.len()`; maintained transactionally with the items
    pub total_memories: i64,
    pub last_updated: DateTime<Utc>,
}

impl UserMemory {
    /// An empty profile for a user with no stored memories yet
    pub fn empty(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            user_email: None,
            memories: Vec::new(),
            total_memories: 0,
            last_updated: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_roundtrips_through_storage_form() {
        assert_eq!(parse_role(&Role::Assistant.to_string()), Role::Assistant);
        assert_eq!(parse_role(&Role::User.to_string()), Role::User);
        assert_eq!(parse_role("garbage"), Role::User);
    }

    #[test]
    fn category_roundtrips_through_storage_form() {
        for cat in [
            MemoryCategory::Personal,
            MemoryCategory::Preference,
            MemoryCategory::Skill,
            MemoryCategory::Goal,
            MemoryCategory::Fact,
            MemoryCategory::Other,
        ] {
            assert_eq!(parse_category(&cat.to_string()), cat);
        }
        assert_eq!(parse_category("unknown"), MemoryCategory::Other);
    }

    #[test]
    fn empty_profile_has_no_memories() {
        let profile = UserMemory::empty("u1");
        assert_eq!(profile.total_memories, 0);
        assert!(profile.memories.is_empty());
    }
}

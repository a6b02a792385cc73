//! Request/response DTOs for the HTTP surface.
//!
//! The wire contract is camelCase JSON; these types translate between it and
//! the core library's model.

use chrono::{DateTime, Utc};
use cognisphere::{
    ChatMessage, DebateSide, DebateTurn, MemoryCategory, MemoryItem, ThreadSummary, TokenPair,
    User, UserMemory,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            created_at: user.created_at,
            last_login: user.last_login,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub message: &'static str,
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
}

impl AuthResponse {
    pub fn new(message: &'static str, user: User, tokens: TokenPair) -> Self {
        Self {
            message,
            user: user.into(),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: UserResponse,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdQuery {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadSummaryResponse {
    pub thread_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ThreadSummary> for ThreadSummaryResponse {
    fn from(t: ThreadSummary) -> Self {
        Self {
            thread_id: t.thread_id,
            title: t.title,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadMessagesResponse {
    pub thread_id: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequestBody {
    pub thread_id: String,
    pub user_id: String,
    pub user_email: Option<String>,
    pub message: Option<String>,
    pub image: Option<String>,
    pub personality: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

#[derive(Debug, Deserialize)]
pub struct DebateRequest {
    pub topic: String,
    pub rounds: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct DebateTurnResponse {
    pub side: DebateSide,
    pub argument: String,
    pub round: u32,
}

impl From<DebateTurn> for DebateTurnResponse {
    fn from(turn: DebateTurn) -> Self {
        Self {
            side: turn.side,
            argument: turn.argument,
            round: turn.round,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebateResponse {
    pub topic: String,
    pub rounds: u32,
    pub debate: Vec<DebateTurnResponse>,
    pub total_arguments: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUpsertRequest {
    pub user_id: String,
    pub user_email: Option<String>,
    pub key: String,
    pub value: String,
    pub category: Option<MemoryCategory>,
    pub importance: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryItemResponse {
    pub key: String,
    pub value: String,
    pub category: MemoryCategory,
    pub importance: i64,
    pub created_at: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
    pub use_count: i64,
}

impl From<MemoryItem> for MemoryItemResponse {
    fn from(item: MemoryItem) -> Self {
        Self {
            key: item.key,
            value: item.value,
            category: item.category,
            importance: item.importance,
            created_at: item.created_at,
            last_used: item.last_used,
            use_count: item.use_count,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryProfileResponse {
    pub memories: Vec<MemoryItemResponse>,
    pub total_memories: i64,
    pub last_updated: DateTime<Utc>,
}

impl From<UserMemory> for MemoryProfileResponse {
    fn from(profile: UserMemory) -> Self {
        Self {
            memories: profile.memories.into_iter().map(Into::into).collect(),
            total_memories: profile.total_memories,
            last_updated: profile.last_updated,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedMemory {
    pub key: String,
    pub value: String,
    pub category: MemoryCategory,
    pub importance: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUpsertResponse {
    pub message: &'static str,
    pub memory: SavedMemory,
    pub total_memories: i64,
}

#[derive(Debug, Serialize)]
pub struct ContextResponse {
    pub context: String,
}

#[derive(Debug, Serialize)]
pub struct PersonalityResponse {
    pub id: &'static str,
    pub name: &'static str,
    pub emoji: &'static str,
}

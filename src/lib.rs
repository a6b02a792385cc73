//! # CogniSphere - Memory-Aware Conversation Backend
//!
//! Core library for a chat backend that persists conversation threads,
//! keeps a ranked per-user memory profile for prompt personalization, and
//! orchestrates a scripted two-persona debate. Generation is delegated to
//! an external completion oracle behind a trait; persistence is SQLite.

pub mod conversation;
pub mod debate;
pub mod error;
pub mod memory;
pub mod oracle;
pub mod personality;
pub mod thread;
pub mod token;
pub mod types;
pub mod user;

pub use conversation::{ChatRequest, ConversationService};
pub use debate::{DebateOrchestrator, DebateOutcome, DebateRound, DebateSide, DebateTurn};
pub use error::{Error, Result};
pub use memory::MemoryStore;
pub use oracle::{CompletionOracle, GroqOracle, OracleRequest};
pub use personality::{Personality, PERSONALITIES};
pub use thread::ThreadStore;
pub use token::{Claims, TokenPair, TokenService};
pub use types::{
    ChatMessage, MemoryCategory, MemoryItem, Role, Thread, ThreadId, ThreadSummary, UserId,
    UserMemory,
};
pub use user::{User, UserStore};

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;

/// The assembled backend: stores, identity, and the two orchestrators
#[derive(Clone)]
pub struct CogniSphere {
    users: UserStore,
    memory: MemoryStore,
    threads: ThreadStore,
    conversation: ConversationService,
    debate: DebateOrchestrator,
    tokens: TokenService,
}

impl std::fmt::Debug for CogniSphere {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CogniSphere").finish()
    }
}

impl CogniSphere {
    /// Open (or create) the database under `data_dir` and wire everything up
    pub async fn new(
        data_dir: impl AsRef<Path>,
        oracle: Arc<dyn CompletionOracle>,
        jwt_secret: &str,
    ) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir)?;

        let options = SqliteConnectOptions::new()
            .filename(data_dir.join("cognisphere.db"))
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self::from_pool(pool, oracle, jwt_secret))
    }

    /// Build against an in-memory database, for tests
    pub async fn connect_in_memory(
        oracle: Arc<dyn CompletionOracle>,
        jwt_secret: &str,
    ) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .create_if_missing(true);
        let pool = sqlx::pool::PoolOptions::<sqlx::Sqlite>::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self::from_pool(pool, oracle, jwt_secret))
    }

    fn from_pool(pool: SqlitePool, oracle: Arc<dyn CompletionOracle>, jwt_secret: &str) -> Self {
        let memory = MemoryStore::new(pool.clone());
        let threads = ThreadStore::new(pool.clone());
        let conversation =
            ConversationService::new(threads.clone(), memory.clone(), Arc::clone(&oracle));
        let debate = DebateOrchestrator::new(oracle);

        Self {
            users: UserStore::new(pool),
            memory,
            threads,
            conversation,
            debate,
            tokens: TokenService::new(jwt_secret),
        }
    }

    pub fn users(&self) -> &UserStore {
        &self.users
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    pub fn threads(&self) -> &ThreadStore {
        &self.threads
    }

    pub fn conversation(&self) -> &ConversationService {
        &self.conversation
    }

    pub fn debate(&self) -> &DebateOrchestrator {
        &self.debate
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::testing::ScriptedOracle;

    #[tokio::test]
    async fn full_turn_through_the_assembled_system() {
        let oracle = Arc::new(ScriptedOracle::new(["Nice to meet you, Ada."]));
        let system = CogniSphere::connect_in_memory(oracle, "test-secret")
            .await
            .unwrap();

        let user = system
            .users()
            .register("Ada", "a@x.com", "Secret1")
            .await
            .unwrap();
        let tokens = system.tokens().issue(&user).unwrap();
        assert!(system.tokens().verify(&tokens.access_token).is_ok());

        system
            .memory()
            .upsert(&user.id, Some(&user.email), "Name", "Ada", MemoryCategory::Personal, 5)
            .await
            .unwrap();

        let reply = system
            .conversation()
            .respond(ChatRequest {
                thread_id: "t1".to_string(),
                user_id: user.id.clone(),
                user_email: Some(user.email.clone()),
                message: Some("Hello!".to_string()),
                image: None,
                personality: Some("casual".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(reply, "Nice to meet you, Ada.");

        let threads = system.threads().list(&user.id).await.unwrap();
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].title, "Hello!");
    }

    #[tokio::test]
    async fn on_disk_database_survives_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = Arc::new(ScriptedOracle::new([]));

        {
            let system = CogniSphere::new(dir.path(), oracle.clone(), "test-secret")
                .await
                .unwrap();
            system
                .memory()
                .upsert("u1", None, "Language", "Rust", MemoryCategory::Skill, 5)
                .await
                .unwrap();
        }

        let system = CogniSphere::new(dir.path(), oracle, "test-secret")
            .await
            .unwrap();
        let profile = system.memory().get("u1").await.unwrap();
        assert_eq!(profile.total_memories, 1);
        assert_eq!(profile.memories[0].key, "Language");
    }
}

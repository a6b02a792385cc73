//! Conversation service: memory-aware chat orchestration
//!
//! One request flows: validate, resolve personality, load memory context
//! (best effort), persist the user message, call the oracle, persist the
//! assistant reply. The user message is written before the oracle call on
//! purpose: a thread exists even when generation fails, and that partial
//! state is kept rather than rolled back.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::memory::MemoryStore;
use crate::oracle::{CompletionOracle, OracleRequest};
use crate::personality;
use crate::thread::ThreadStore;
use crate::types::Role;

/// One chat turn request
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub thread_id: String,
    pub user_id: String,
    pub user_email: Option<String>,
    pub message: Option<String>,
    /// Image payload as a data URL
    pub image: Option<String>,
    pub personality: Option<String>,
}

/// Orchestrates memory, threads, and the completion oracle for chat
#[derive(Clone)]
pub struct ConversationService {
    threads: ThreadStore,
    memory: MemoryStore,
    oracle: Arc<dyn CompletionOracle>,
}

impl ConversationService {
    pub fn new(
        threads: ThreadStore,
        memory: MemoryStore,
        oracle: Arc<dyn CompletionOracle>,
    ) -> Self {
        Self {
            threads,
            memory,
            oracle,
        }
    }

    /// Produce the assistant's reply for one user turn.
    ///
    /// Requires at least one of message/image. Memory-context loading is
    /// best effort: a failure degrades to an unpersonalized prompt instead
    /// of aborting the request.
    pub async fn respond(&self, request: ChatRequest) -> Result<String> {
        let message = request.message.as_deref().unwrap_or("").trim().to_string();
        let image = request.image.as_deref().filter(|i| !i.is_empty());

        if message.is_empty() && image.is_none() {
            return Err(Error::InvalidRequest(
                "Either message or image must be provided".to_string(),
            ));
        }

        let persona = personality::resolve(request.personality.as_deref().unwrap_or_default());
        let mut system_prompt = persona.system_prompt.to_string();

        match self.memory.render_context(&request.user_id).await {
            Ok(context) => system_prompt.push_str(&context),
            Err(e) => {
                tracing::debug!(error = %e, user_id = %request.user_id, "memory context unavailable, continuing without it");
            }
        }

        // Persist the user turn first so the thread survives a generation failure.
        self.threads
            .append_or_create(
                &request.thread_id,
                &request.user_id,
                request.user_email.as_deref(),
                Role::User,
                &message,
            )
            .await?;

        let reply = self
            .oracle
            .complete(OracleRequest {
                system_prompt,
                user_content: message,
                image: image.map(String::from),
                temperature: None,
                max_tokens: None,
            })
            .await?;

        self.threads
            .append_or_create(
                &request.thread_id,
                &request.user_id,
                request.user_email.as_deref(),
                Role::Assistant,
                &reply,
            )
            .await?;

        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::testing::{FailingOracle, ScriptedOracle};
    use crate::test_util;
    use crate::types::MemoryCategory;

    fn request(message: Option<&str>, image: Option<&str>) -> ChatRequest {
        ChatRequest {
            thread_id: "t1".to_string(),
            user_id: "u1".to_string(),
            user_email: Some("u1@x.com".to_string()),
            message: message.map(String::from),
            image: image.map(String::from),
            personality: None,
        }
    }

    async fn service(oracle: Arc<dyn CompletionOracle>) -> (ConversationService, ThreadStore, MemoryStore) {
        let pool = test_util::pool().await;
        let threads = ThreadStore::new(pool.clone());
        let memory = MemoryStore::new(pool);
        let service = ConversationService::new(threads.clone(), memory.clone(), oracle);
        (service, threads, memory)
    }

    #[tokio::test]
    async fn missing_message_and_image_fails_before_any_side_effect() {
        let oracle = Arc::new(ScriptedOracle::new([]));
        let (service, threads, _) = service(oracle.clone()).await;

        let err = service.respond(request(None, None)).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
        // Neither the oracle nor the thread store were touched.
        assert_eq!(oracle.call_count(), 0);
        assert!(threads.list("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_message_without_image_is_rejected() {
        let oracle = Arc::new(ScriptedOracle::new([]));
        let (service, _, _) = service(oracle).await;

        let err = service.respond(request(Some("   "), None)).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn successful_turn_persists_both_messages() {
        let oracle = Arc::new(ScriptedOracle::new(["Hello there!"]));
        let (service, threads, _) = service(oracle).await;

        let reply = service.respond(request(Some("Hi"), None)).await.unwrap();
        assert_eq!(reply, "Hello there!");

        let messages = threads.get("t1", "u1").await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "Hi");
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, "Hello there!");
    }

    #[tokio::test]
    async fn oracle_failure_keeps_the_user_message() {
        let oracle = Arc::new(FailingOracle::new());
        let (service, threads, _) = service(oracle.clone()).await;

        let err = service.respond(request(Some("Hi"), None)).await.unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
        assert_eq!(oracle.call_count(), 1);

        // The user turn survives; only the assistant turn is missing.
        let messages = threads.get("t1", "u1").await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);
    }

    #[tokio::test]
    async fn memory_context_is_appended_to_the_system_prompt() {
        let oracle = Arc::new(ScriptedOracle::new(["ok"]));
        let (service, _, memory) = service(oracle.clone()).await;

        memory
            .upsert("u1", None, "Name", "Ada", MemoryCategory::Personal, 5)
            .await
            .unwrap();

        service.respond(request(Some("Hi"), None)).await.unwrap();

        let requests = oracle.requests.lock().unwrap();
        let prompt = &requests[0].system_prompt;
        assert!(prompt.starts_with(personality::resolve("professional").system_prompt));
        assert!(prompt.contains("- Name: Ada"));
    }

    #[tokio::test]
    async fn empty_memory_leaves_the_prompt_untouched() {
        let oracle = Arc::new(ScriptedOracle::new(["ok"]));
        let (service, _, _) = service(oracle.clone()).await;

        let mut req = request(Some("Hi"), None);
        req.personality = Some("creative".to_string());
        service.respond(req).await.unwrap();

        let requests = oracle.requests.lock().unwrap();
        assert_eq!(
            requests[0].system_prompt,
            personality::resolve("creative").system_prompt
        );
    }

    #[tokio::test]
    async fn unknown_personality_falls_back_to_professional() {
        let oracle = Arc::new(ScriptedOracle::new(["ok"]));
        let (service, _, _) = service(oracle.clone()).await;

        let mut req = request(Some("Hi"), None);
        req.personality = Some("wizard".to_string());
        service.respond(req).await.unwrap();

        let requests = oracle.requests.lock().unwrap();
        assert_eq!(
            requests[0].system_prompt,
            personality::resolve("professional").system_prompt
        );
    }

    #[tokio::test]
    async fn image_only_request_is_accepted_and_forwarded() {
        let oracle = Arc::new(ScriptedOracle::new(["a cat"]));
        let (service, threads, _) = service(oracle.clone()).await;

        let reply = service
            .respond(request(None, Some("data:image/png;base64,AAAA")))
            .await
            .unwrap();
        assert_eq!(reply, "a cat");

        let requests = oracle.requests.lock().unwrap();
        assert_eq!(
            requests[0].image.as_deref(),
            Some("data:image/png;base64,AAAA")
        );
        // The (empty) user turn and the reply are both on the thread.
        assert_eq!(threads.get("t1", "u1").await.unwrap().len(), 2);
    }
}

//! Completion oracle: the external text/vision generation provider
//!
//! The rest of the system treats generation as a black-box call behind the
//! [`CompletionOracle`] trait. The production implementation talks to Groq's
//! OpenAI-compatible chat completions endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
const TEXT_MODEL: &str = "llama-3.3-70b-versatile";
const VISION_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";
const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 1024;
// Vision answers tend to run longer than text-only ones.
const VISION_MAX_TOKENS: u32 = 1500;

/// One generation request.
///
/// When `image` is set the oracle routes to its vision-capable model with a
/// larger token budget. `temperature`/`max_tokens` override the oracle's
/// defaults when present (the debate orchestrator uses this).
#[derive(Debug, Clone)]
pub struct OracleRequest {
    pub system_prompt: String,
    pub user_content: String,
    /// Image payload as a data URL, passed through verbatim
    pub image: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl OracleRequest {
    pub fn text(system_prompt: impl Into<String>, user_content: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_content: user_content.into(),
            image: None,
            temperature: None,
            max_tokens: None,
        }
    }
}

/// Black-box completion provider
#[async_trait]
pub trait CompletionOracle: Send + Sync {
    /// Generate a reply for the given prompt. Errors surface as
    /// [`Error::Upstream`].
    async fn complete(&self, request: OracleRequest) -> Result<String>;
}

#[derive(Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    content: serde_json::Value,
}

#[derive(Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
    error: Option<WireError>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireChoiceMessage,
}

#[derive(Deserialize)]
struct WireChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct WireError {
    message: String,
}

/// Groq client for the OpenAI-compatible chat completions API
pub struct GroqOracle {
    base_url: String,
    api_key: String,
    text_model: String,
    vision_model: String,
    http_client: reqwest::Client,
}

impl GroqOracle {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            text_model: TEXT_MODEL.to_string(),
            vision_model: VISION_MODEL.to_string(),
            http_client: reqwest::Client::new(),
        }
    }

    /// Override the endpoint base URL (for self-hosted gateways)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_body(&self, request: &OracleRequest) -> WireRequest {
        let user_content = match &request.image {
            Some(image) => serde_json::json!([
                { "type": "text", "text": request.user_content },
                { "type": "image_url", "image_url": { "url": image } },
            ]),
            None => serde_json::Value::String(request.user_content.clone()),
        };

        let default_max_tokens = if request.image.is_some() {
            VISION_MAX_TOKENS
        } else {
            MAX_TOKENS
        };

        let model = if request.image.is_some() {
            self.vision_model.clone()
        } else {
            self.text_model.clone()
        };

        WireRequest {
            model,
            messages: vec![
                WireMessage {
                    role: "system",
                    content: serde_json::Value::String(request.system_prompt.clone()),
                },
                WireMessage {
                    role: "user",
                    content: user_content,
                },
            ],
            temperature: request.temperature.unwrap_or(TEMPERATURE),
            max_tokens: request.max_tokens.unwrap_or(default_max_tokens),
        }
    }
}

#[async_trait]
impl CompletionOracle for GroqOracle {
    async fn complete(&self, request: OracleRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_body(&request);

        tracing::debug!(model = %body.model, has_image = request.image.is_some(), "sending completion request");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Error::Upstream(format!("API error {status}: {body_text}")));
        }

        let wire: WireResponse = response
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("failed to parse response: {e}")))?;

        if let Some(err) = wire.error {
            return Err(Error::Upstream(err.message));
        }

        wire.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Upstream("no completion content in response".to_string()))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Deterministic oracles for conversation and debate tests

    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Returns canned replies in order and records every request it saw
    pub struct ScriptedOracle {
        replies: Mutex<VecDeque<String>>,
        pub requests: Mutex<Vec<OracleRequest>>,
        pub calls: AtomicUsize,
    }

    impl ScriptedOracle {
        pub fn new(replies: impl IntoIterator<Item = &'static str>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().map(String::from).collect()),
                requests: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionOracle for ScriptedOracle {
        async fn complete(&self, request: OracleRequest) -> Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request);
            let reply = self.replies.lock().unwrap().pop_front();
            Ok(reply.unwrap_or_else(|| format!("reply {n}")))
        }
    }

    /// Always fails, counting how often it was called
    pub struct FailingOracle {
        pub calls: AtomicUsize,
    }

    impl FailingOracle {
        pub fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionOracle for FailingOracle {
        async fn complete(&self, _request: OracleRequest) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Upstream("scripted failure".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_request_uses_text_model_and_defaults() {
        let oracle = GroqOracle::new("test-key");
        let body = oracle.build_body(&OracleRequest::text("Be helpful.", "Hello"));

        assert_eq!(body.model, TEXT_MODEL);
        assert_eq!(body.temperature, TEMPERATURE);
        assert_eq!(body.max_tokens, MAX_TOKENS);
        assert_eq!(body.messages.len(), 2);
        assert_eq!(body.messages[0].role, "system");
        assert_eq!(
            body.messages[1].content,
            serde_json::Value::String("Hello".to_string())
        );
    }

    #[test]
    fn image_request_routes_to_vision_model_with_larger_budget() {
        let oracle = GroqOracle::new("test-key");
        let request = OracleRequest {
            image: Some("data:image/png;base64,AAAA".to_string()),
            ..OracleRequest::text("Be helpful.", "What is this?")
        };
        let body = oracle.build_body(&request);

        assert_eq!(body.model, VISION_MODEL);
        assert!(body.max_tokens > MAX_TOKENS);

        let parts = body.messages[1].content.as_array().unwrap();
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["image_url"]["url"], "data:image/png;base64,AAAA");
    }

    #[test]
    fn explicit_overrides_win_over_defaults() {
        let oracle = GroqOracle::new("test-key");
        let request = OracleRequest {
            temperature: Some(0.8),
            max_tokens: Some(200),
            ..OracleRequest::text("debate", "argue")
        };
        let body = oracle.build_body(&request);

        assert_eq!(body.temperature, 0.8);
        assert_eq!(body.max_tokens, 200);
    }
}

//! HTTP model client used by the specialist agents and the model driver.
//!
//! One transport serves every configured API. The per-API differences
//! (endpoint path, auth headers, request body, where the text sits in the
//! reply) live in [`Dialect`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::{AiConfig, ProviderKind};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Attempts after the first one for 5xx replies.
const MAX_RETRIES: u32 = 3;

const ANTHROPIC_VERSION: &str = "2023-06-01";

fn build_http_client() -> Client {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .expect("Failed to build HTTP client")
}

/// Only server-side failures are worth another attempt.
fn is_retryable(status: u16, attempt: u32) -> bool {
    attempt < MAX_RETRIES && (500..600).contains(&status)
}

/// 1s, 2s, 4s, ...
fn backoff_for(attempt: u32) -> Duration {
    Duration::from_secs(1 << attempt)
}

#[derive(Error, Debug)]
pub enum AiError {
    #[error("API key not configured (env: {0})")]
    MissingApiKey(String),
    #[error("API request failed: {0}")]
    RequestFailed(String),
    #[error("Failed to parse response: {0}")]
    ParseError(String),
    #[error("Model request timed out")]
    Timeout,
}

/// The model boundary: a system and user prompt in, text out.
#[async_trait]
pub trait AiProvider: Send + Sync {
    async fn generate(&self, system: &str, user: &str) -> Result<String, AiError>;
}

/// Wire format of one model API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `models/{model}:generateContent`
    Gemini,
    /// `v1/messages`
    Anthropic,
    /// `chat/completions`
    ChatCompletions,
}

impl From<ProviderKind> for Dialect {
    fn from(kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::Gemini => Self::Gemini,
            ProviderKind::Claude => Self::Anthropic,
            ProviderKind::OpenAi => Self::ChatCompletions,
        }
    }
}

impl Dialect {
    fn endpoint(self, base_url: &str, model: &str) -> String {
        let base = base_url.trim_end_matches('/');
        match self {
            Self::Gemini => format!("{base}/models/{model}:generateContent"),
            Self::Anthropic => format!("{base}/v1/messages"),
            Self::ChatCompletions => format!("{base}/chat/completions"),
        }
    }

    fn authorize(self, request: RequestBuilder, api_key: &str) -> RequestBuilder {
        match self {
            Self::Gemini => request.header("x-goog-api-key", api_key),
            Self::Anthropic => request
                .header("x-api-key", api_key)
                .header("anthropic-version", ANTHROPIC_VERSION),
            Self::ChatCompletions => request.bearer_auth(api_key),
        }
    }

    fn body(self, model: &str, max_tokens: u32, system: &str, user: &str) -> Value {
        match self {
            Self::Gemini => json!({
                "contents": [{ "role": "user", "parts": [{ "text": user }] }],
                "systemInstruction": { "parts": [{ "text": system }] },
                "generationConfig": { "maxOutputTokens": max_tokens }
            }),
            Self::Anthropic => json!({
                "model": model,
                "max_tokens": max_tokens,
                "system": system,
                "messages": [{ "role": "user", "content": user }]
            }),
            Self::ChatCompletions => json!({
                "model": model,
                "max_tokens": max_tokens,
                "messages": [
                    { "role": "system", "content": system },
                    { "role": "user", "content": user }
                ]
            }),
        }
    }

    fn reply_text(self, reply: &Value) -> Option<String> {
        let text = match self {
            Self::Gemini => reply.pointer("/candidates/0/content/parts/0/text"),
            Self::Anthropic => reply.pointer("/content/0/text"),
            Self::ChatCompletions => reply.pointer("/choices/0/message/content"),
        }?
        .as_str()?
        .trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

/// A configured model client.
#[derive(Debug, Clone)]
pub struct AiClient {
    http: Client,
    dialect: Dialect,
    api_key: String,
    config: AiConfig,
}

impl AiClient {
    #[must_use]
    pub fn new(config: AiConfig, api_key: impl Into<String>) -> Self {
        Self {
            http: build_http_client(),
            dialect: config.provider.into(),
            api_key: api_key.into(),
            config,
        }
    }

    /// Build a client, reading the key from `config.api_key_env`.
    ///
    /// # Errors
    ///
    /// Returns `AiError::MissingApiKey` when that variable is unset.
    pub fn from_config(config: AiConfig) -> Result<Self, AiError> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| AiError::MissingApiKey(config.api_key_env.clone()))?;
        Ok(Self::new(config, api_key))
    }

    /// POST `body`, retrying 5xx replies with backoff.
    async fn post(&self, url: &str, body: &Value) -> Result<Value, AiError> {
        let mut attempt = 0;
        loop {
            let request = self.dialect.authorize(self.http.post(url), &self.api_key);
            let response = request.json(body).send().await.map_err(|e| {
                if e.is_timeout() {
                    AiError::Timeout
                } else {
                    AiError::RequestFailed(e.to_string())
                }
            })?;

            let status = response.status();
            if status.is_success() {
                return response
                    .json()
                    .await
                    .map_err(|e| AiError::ParseError(e.to_string()));
            }
            if is_retryable(status.as_u16(), attempt) {
                let delay = backoff_for(attempt);
                tracing::warn!(status = status.as_u16(), attempt, ?delay, "Retrying model request");
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            let detail = response.text().await.unwrap_or_default();
            return Err(AiError::RequestFailed(format!("HTTP {status}: {detail}")));
        }
    }
}

#[async_trait]
impl AiProvider for AiClient {
    async fn generate(&self, system: &str, user: &str) -> Result<String, AiError> {
        let url = self.dialect.endpoint(&self.config.base_url, &self.config.model);
        let body = self
            .dialect
            .body(&self.config.model, self.config.max_tokens, system, user);

        tracing::debug!(
            model = %self.config.model,
            dialect = ?self.dialect,
            prompt_len = user.len(),
            "Sending model request"
        );
        let reply = self.post(&url, &body).await?;
        let text = self.dialect.reply_text(&reply).ok_or_else(|| {
            AiError::ParseError(format!("No text in {:?} response", self.dialect))
        })?;
        tracing::debug!(response_len = text.len(), "Received model response");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: ProviderKind, key_env: &str) -> AiConfig {
        AiConfig {
            provider,
            model: "test-model".to_string(),
            max_tokens: 1024,
            base_url: "http://localhost:9/v1/".to_string(),
            api_key_env: key_env.to_string(),
        }
    }

    #[test]
    fn test_retry_only_server_errors() {
        assert!(is_retryable(500, 0));
        assert!(is_retryable(503, 2));
        assert!(!is_retryable(500, MAX_RETRIES));
        assert!(!is_retryable(400, 0));
        assert!(!is_retryable(429, 0));
    }

    #[test]
    fn test_backoff_doubles() {
        let secs: Vec<u64> = (0..3).map(|a| backoff_for(a).as_secs()).collect();
        assert_eq!(secs, vec![1, 2, 4]);
    }

    #[test]
    fn test_endpoints_per_dialect() {
        let base = "http://host/v1/";
        assert_eq!(
            Dialect::Gemini.endpoint(base, "m"),
            "http://host/v1/models/m:generateContent"
        );
        assert_eq!(Dialect::Anthropic.endpoint(base, "m"), "http://host/v1/v1/messages");
        assert_eq!(
            Dialect::ChatCompletions.endpoint(base, "m"),
            "http://host/v1/chat/completions"
        );
    }

    #[test]
    fn test_reply_text_locations() {
        let gemini = json!({"candidates": [{"content": {"parts": [{"text": "g"}]}}]});
        let anthropic = json!({"content": [{"type": "text", "text": "a"}]});
        let chat = json!({"choices": [{"message": {"content": "  c \n"}}]});

        assert_eq!(Dialect::Gemini.reply_text(&gemini).as_deref(), Some("g"));
        assert_eq!(Dialect::Anthropic.reply_text(&anthropic).as_deref(), Some("a"));
        assert_eq!(Dialect::ChatCompletions.reply_text(&chat).as_deref(), Some("c"));
        assert_eq!(Dialect::ChatCompletions.reply_text(&gemini), None);
    }

    #[test]
    fn test_blank_reply_is_no_text() {
        let chat = json!({"choices": [{"message": {"content": "   "}}]});
        assert_eq!(Dialect::ChatCompletions.reply_text(&chat), None);
    }

    #[test]
    fn test_system_prompt_placement() {
        let body = Dialect::Anthropic.body("m", 10, "sys", "usr");
        assert_eq!(body["system"], "sys");
        assert_eq!(body["messages"][0]["content"], "usr");

        let body = Dialect::ChatCompletions.body("m", 10, "sys", "usr");
        assert_eq!(body["messages"][0]["role"], "system");

        let body = Dialect::Gemini.body("m", 10, "sys", "usr");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "sys");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 10);
    }

    #[test]
    fn test_from_config_missing_key() {
        let result = AiClient::from_config(config(
            ProviderKind::Gemini,
            "AUDIT_INVESTIGATOR_TEST_UNSET_KEY",
        ));
        assert!(
            matches!(result, Err(AiError::MissingApiKey(name)) if name == "AUDIT_INVESTIGATOR_TEST_UNSET_KEY")
        );
    }

    #[test]
    fn test_dialect_follows_provider() {
        for (kind, dialect) in [
            (ProviderKind::Gemini, Dialect::Gemini),
            (ProviderKind::Claude, Dialect::Anthropic),
            (ProviderKind::OpenAi, Dialect::ChatCompletions),
        ] {
            let client = AiClient::new(config(kind, "UNUSED"), "key");
            assert_eq!(client.dialect, dialect);
            assert_eq!(client.config.model, "test-model");
        }
    }
}

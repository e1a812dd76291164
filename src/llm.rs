//! Chat model abstraction and implementations.
//!
//! Defines the [`ChatModel`] trait and concrete implementations:
//! - **[`DisabledModel`]** — always fails; used when `llm.provider = "disabled"`.
//! - **[`OllamaClient`]** — calls a local Ollama instance's `/api/chat` endpoint.
//!
//! Use [`create_model`] to instantiate the implementation selected by the
//! configuration.
//!
//! # Failure Model
//!
//! Every failure (connection refused, model not pulled, non-success status,
//! a body without `message.content`) is reported as an `Err`. Callers are not
//! expected to tell these apart. There are no retries: a failed call is a
//! failed answer. The only bound on a call is the client timeout taken from
//! `llm.timeout_secs`.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::LlmConfig;

// ============ Conversation ============

/// Speaker of a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// A single turn in a [`Conversation`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// The two-turn exchange sent to the model for every question: a system
/// instruction followed by a user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    system: Message,
    user: Message,
}

impl Conversation {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: Message {
                role: Role::System,
                content: system.into(),
            },
            user: Message {
                role: Role::User,
                content: user.into(),
            },
        }
    }

    pub fn system(&self) -> &str {
        &self.system.content
    }

    pub fn user(&self) -> &str {
        &self.user.content
    }

    /// Messages in wire order (system first).
    pub fn messages(&self) -> [&Message; 2] {
        [&self.system, &self.user]
    }
}

// ============ Trait ============

/// A language model that can answer a [`Conversation`].
///
/// Implementations must be shareable across request handlers. The returned
/// text is passed through untrimmed; normalisation is the caller's job.
///
/// # Example
///
/// ```rust
/// use anyhow::Result;
/// use async_trait::async_trait;
/// use chapter_tutor::llm::{ChatModel, Conversation};
///
/// struct Echo;
///
/// #[async_trait]
/// impl ChatModel for Echo {
///     fn model_name(&self) -> &str { "echo" }
///
///     async fn chat(&self, conversation: &Conversation) -> Result<String> {
///         Ok(conversation.user().to_string())
///     }
/// }
/// ```
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Returns the model identifier (e.g. `"llama3.2"`).
    fn model_name(&self) -> &str;

    /// Generates a reply to `conversation`.
    async fn chat(&self, conversation: &Conversation) -> Result<String>;
}

/// Builds the chat model selected by `config.provider`.
pub fn create_model(config: &LlmConfig) -> Result<Arc<dyn ChatModel>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledModel)),
        "ollama" => Ok(Arc::new(OllamaClient::new(config)?)),
        other => bail!("Unknown llm provider: {}", other),
    }
}

// ============ Disabled ============

/// A model that refuses every request.
pub struct DisabledModel;

#[async_trait]
impl ChatModel for DisabledModel {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn chat(&self, _conversation: &Conversation) -> Result<String> {
        bail!("Language model provider is disabled")
    }
}

// ============ Ollama ============

/// Chat client for a local Ollama instance.
///
/// Calls `POST {url}/api/chat` with `stream: false`. Requires Ollama to be
/// running with the configured model pulled (e.g. `ollama pull llama3.2`).
pub struct OllamaClient {
    client: reqwest::Client,
    url: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [&'a Message; 2],
    stream: bool,
}

impl OllamaClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        if config.model.trim().is_empty() {
            bail!("llm.model required for Ollama provider");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl ChatModel for OllamaClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn chat(&self, conversation: &Conversation) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: conversation.messages(),
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                anyhow::anyhow!(
                    "Ollama connection error (is Ollama running at {}?): {}",
                    self.url,
                    e
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Ollama API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        parse_chat_response(&json)
    }
}

/// Pulls `message.content` out of an Ollama `/api/chat` response.
fn parse_chat_response(json: &serde_json::Value) -> Result<String> {
    json.get("message")
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing message.content"))
}

//! LLM chat abstraction and the Ollama implementation.
//!
//! The labeling step only needs `prompt -> reply`. [`ChatClient`] is
//! implemented for [`OllamaChat`] and for any `Fn(&str) -> Result<String>`
//! closure, which is how tests stub the model.
//!
//! # Retry Strategy
//!
//! `llm.max_retries` defaults to 0 (one call per topic). When raised:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::LlmConfig;

/// Reference model identifiers.
pub const REFERENCE_MODELS: [&str; 2] = ["llama3.2:latest", "deepseek-r1:1.5b"];

pub trait ChatClient {
    /// Returns the model identifier (e.g. `"llama3.2:latest"`).
    fn model_name(&self) -> &str {
        "custom"
    }

    /// Send a single user message and return the reply text.
    fn chat(&self, prompt: &str) -> Result<String>;
}

impl<F> ChatClient for F
where
    F: Fn(&str) -> Result<String>,
{
    fn chat(&self, prompt: &str) -> Result<String> {
        self(prompt)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ReplyMessage>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: String,
}

/// Chat client for a local Ollama instance (`POST /api/chat`).
pub struct OllamaChat {
    client: reqwest::blocking::Client,
    url: String,
    model: String,
    max_retries: u32,
}

impl OllamaChat {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_retries: config.max_retries,
        })
    }

    /// Same as [`OllamaChat::new`] with a different model.
    pub fn with_model(config: &LlmConfig, model: &str) -> Result<Self> {
        let mut chat = Self::new(config)?;
        chat.model = model.to_string();
        Ok(chat)
    }
}

impl ChatClient for OllamaChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn chat(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
        };

        let mut attempt = 0;
        loop {
            match self.send(&body) {
                Ok(reply) => return Ok(reply),
                Err(Attempt::Retryable(e)) if attempt < self.max_retries => {
                    attempt += 1;
                    let delay = backoff_delay(attempt);
                    tracing::warn!(attempt, delay_secs = delay.as_secs(), error = %e, "chat call failed, retrying");
                    std::thread::sleep(delay);
                }
                Err(Attempt::Retryable(e)) | Err(Attempt::Fatal(e)) => return Err(e),
            }
        }
    }
}

/// Outcome of one failed chat request.
enum Attempt {
    /// Rate limiting, server errors, and connection failures.
    Retryable(anyhow::Error),
    Fatal(anyhow::Error),
}

impl OllamaChat {
    fn send(&self, body: &ChatRequest<'_>) -> std::result::Result<String, Attempt> {
        let response = self
            .client
            .post(format!("{}/api/chat", self.url))
            .json(body)
            .send()
            .map_err(|e| {
                Attempt::Retryable(anyhow::anyhow!(
                    "cannot reach Ollama at {}: {}",
                    self.url,
                    e
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            let err = anyhow::anyhow!("Ollama returned {}: {}", status, text);
            return Err(if status.as_u16() == 429 || status.is_server_error() {
                Attempt::Retryable(err)
            } else {
                Attempt::Fatal(err)
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| Attempt::Fatal(anyhow::anyhow!("invalid Ollama response: {}", e)))?;
        parse_chat_response(parsed).map_err(Attempt::Fatal)
    }
}

/// Delay before retry number `attempt` (1-based): 1s doubling up to 32s.
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1 << attempt.saturating_sub(1).min(5))
}

fn parse_chat_response(resp: ChatResponse) -> Result<String> {
    if let Some(err) = resp.error {
        bail!("Ollama returned an error: {}", err);
    }
    resp.message
        .map(|m| m.content)
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing message"))
}

//! Summarizer integration
//!
//! The brief orchestrator talks to the language model through the `Summarizer`
//! trait so tests can substitute a deterministic stub. The production
//! implementation calls the OpenAI chat-completions endpoint in JSON mode.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Config;
use crate::error::{HealthError, Result};

/// ---------------------------------------------------------------------------
/// Configuration
/// ---------------------------------------------------------------------------

const OPENAI_BASE_URL: &str = "https://api.openai.com";
const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const TEMPERATURE: f64 = 0.2;

const SYSTEM_PROMPT: &str =
  "Du er en sundhedsassistent. Svar altid i JSON, på dansk, og vær konkret. Ingen disclaimers.";

/// ---------------------------------------------------------------------------
/// Summarizer trait
/// ---------------------------------------------------------------------------

/// One prompt in, one JSON object out. No internal retry; failures surface as
/// `Upstream` and the caller decides what to do.
#[allow(async_fn_in_trait)]
pub trait Summarizer {
  async fn summarize(&self, prompt: &str) -> Result<Value>;

  /// Identifier persisted with each generated brief.
  fn model(&self) -> &str;
}

/// ---------------------------------------------------------------------------
/// OpenAI API Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest {
  model: String,
  temperature: f64,
  response_format: ResponseFormat,
  messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
  #[serde(rename = "type")]
  format_type: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
  role: &'static str,
  content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
  choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
  message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
  content: Option<String>,
}

/// ---------------------------------------------------------------------------
/// OpenAI Client
/// ---------------------------------------------------------------------------

pub struct OpenAiClient {
  client: Client,
  api_key: String,
  model: String,
  base_url: String,
}

impl OpenAiClient {
  /// Build a client from config. Fails when no API key is configured.
  pub fn from_config(config: &Config) -> Result<Self> {
    let api_key = config.require_openai_key()?.to_string();

    let client = Client::builder()
      .timeout(REQUEST_TIMEOUT)
      .build()
      .map_err(|e| HealthError::Upstream(e.to_string()))?;

    Ok(Self {
      client,
      api_key,
      model: config.openai_model.clone(),
      base_url: OPENAI_BASE_URL.to_string(),
    })
  }

  /// Point the client at a different host. Used by tests.
  pub fn with_base_url(mut self, base_url: &str) -> Self {
    self.base_url = base_url.trim_end_matches('/').to_string();
    self
  }
}

impl Summarizer for OpenAiClient {
  async fn summarize(&self, prompt: &str) -> Result<Value> {
    let request = ChatRequest {
      model: self.model.clone(),
      temperature: TEMPERATURE,
      response_format: ResponseFormat { format_type: "json_object" },
      messages: vec![
        ChatMessage { role: "system", content: SYSTEM_PROMPT.to_string() },
        ChatMessage { role: "user", content: prompt.to_string() },
      ],
    };

    let response = self
      .client
      .post(format!("{}{}", self.base_url, CHAT_COMPLETIONS_PATH))
      .bearer_auth(&self.api_key)
      .json(&request)
      .send()
      .await?;

    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
      let snippet: String = body.chars().take(500).collect();
      return Err(HealthError::Upstream(format!("OpenAI error ({status}): {snippet}")));
    }

    let parsed: ChatResponse = serde_json::from_str(&body)
      .map_err(|e| HealthError::Upstream(format!("Unparseable OpenAI response: {e}")))?;

    let content = parsed
      .choices
      .first()
      .and_then(|c| c.message.content.as_deref())
      .ok_or_else(|| HealthError::Upstream("OpenAI response missing message content".into()))?;

    serde_json::from_str(content)
      .map_err(|e| HealthError::Upstream(format!("Summarizer returned non-JSON content: {e}")))
  }

  fn model(&self) -> &str {
    &self.model
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

//! Single-turn chat assistant backed by a chat-completion API

use crate::config::ChatSettings;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Persona and domain given to the model on every call
pub const SYSTEM_PROMPT: &str = "You are ForecastBot, an assistant for procurement analysts \
evaluating steel price forecasts. You explain how LSTM and ARIMA forecasting models work, \
how to read absolute and percentage forecast errors, and how much weight a forecast deserves \
in a purchasing decision. Answer briefly and practically.";

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("chat assistant is not configured")]
    NotConfigured,
    #[error("missing chat API key")]
    MissingApiKey,
    #[error("question is empty")]
    EmptyQuestion,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("chat api error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("chat api returned no answer")]
    EmptyResponse,
}

/// Answers one question at a time
#[async_trait]
pub trait ChatAssistant: Send + Sync {
    async fn ask(&self, question: &str) -> Result<String, AssistantError>;
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

impl CompletionResponse {
    /// Text of the first choice
    pub fn into_answer(self) -> Result<String, AssistantError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(AssistantError::EmptyResponse)
    }
}

/// Client for an OpenAI-compatible `/v1/chat/completions` endpoint
#[derive(Debug, Clone)]
pub struct OpenAiAssistant {
    api_key: String,
    base_url: String,
    model: String,
    http: Client,
}

impl OpenAiAssistant {
    pub fn new(settings: &ChatSettings) -> Result<Self, AssistantError> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(AssistantError::MissingApiKey)?;

        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(concat!("forecast-dashboard/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            http,
        })
    }

    pub fn request_body(&self, question: &str) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: question.to_string(),
                },
            ],
        }
    }
}

#[async_trait]
impl ChatAssistant for OpenAiAssistant {
    async fn ask(&self, question: &str) -> Result<String, AssistantError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AssistantError::EmptyQuestion);
        }

        let url = format!("{}/v1/chat/completions", self.base_url);
        debug!(model = %self.model, "sending chat completion request");
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(question))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response.json::<CompletionResponse>().await?.into_answer()
    }
}

/// Stand-in used when no API key is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableAssistant;

#[async_trait]
impl ChatAssistant for UnavailableAssistant {
    async fn ask(&self, _question: &str) -> Result<String, AssistantError> {
        Err(AssistantError::NotConfigured)
    }
}

//! Groq provider using the OpenAI-compatible Chat Completions API
//!
//! Requires `GROQ_API_KEY`, read on the first call rather than at
//! construction, so building a pipeline never needs credentials.

use super::{PromptRequest, PromptResponse, Provider, TokenUsage};
use crate::error::CrewError;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

/// Groq API endpoint root
const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";

/// Environment variable holding the API key
pub const GROQ_API_KEY_VAR: &str = "GROQ_API_KEY";

const DEFAULT_MODEL: &str = "llama3-70b-8192";

/// Groq provider
pub struct GroqProvider {
    client: reqwest::Client,
    /// Resolved once, on first use
    api_key: OnceCell<String>,
    base_url: String,
    model: String,
}

impl GroqProvider {
    /// Create a provider that reads `GROQ_API_KEY` on first call
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: OnceCell::new(),
            base_url: GROQ_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Create with a specific API key
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        let provider = Self::new();
        // Fresh cell, cannot already be set
        let _ = provider.api_key.set(api_key.into());
        provider
    }

    /// Point at another OpenAI-compatible endpoint root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn api_key(&self) -> Result<&str, CrewError> {
        self.api_key
            .get_or_try_init(|| match std::env::var(GROQ_API_KEY_VAR) {
                Ok(key) if !key.trim().is_empty() => Ok(key),
                _ => Err(CrewError::MissingCredential {
                    var: GROQ_API_KEY_VAR.to_string(),
                }),
            })
            .map(String::as_str)
    }

    fn build_messages(&self, request: &PromptRequest) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2);

        if let Some(ref system) = request.system_prompt {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }

        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        messages
    }
}

impl Default for GroqProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for GroqProvider {
    fn name(&self) -> &str {
        "groq"
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn execute(&self, request: PromptRequest) -> Result<PromptResponse> {
        let api_key = self.api_key()?;

        let payload = ChatCompletionRequest {
            model: if request.model.is_empty() {
                self.model.clone()
            } else {
                request.model.clone()
            },
            messages: self.build_messages(&request),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        tracing::debug!(
            provider = "groq",
            model = %payload.model,
            messages_count = payload.messages.len(),
            "Sending request to Groq API"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .context("Failed to send request to Groq API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(
                provider = "groq",
                status = %status,
                error = %error_text,
                "Groq API error"
            );
            return Err(anyhow!("Groq API error ({}): {}", status, error_text));
        }

        let api_response: ChatCompletionResponse = response
            .json()
            .await
            .context("Failed to parse Groq API response")?;

        let content = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("Groq API response contained no message content"))?;

        let usage = match api_response.usage {
            Some(u) => TokenUsage::new(u.prompt_tokens, u.completion_tokens),
            None => TokenUsage::estimate(request.prompt.len(), content.len()),
        };

        tracing::debug!(
            provider = "groq",
            tokens = usage.total_tokens,
            "Groq API response received"
        );

        Ok(PromptResponse::new(content).with_usage(usage))
    }
}

// ============================================================================
// API TYPES
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    prompt_tokens: u32,
    completion_tokens: u32,
}

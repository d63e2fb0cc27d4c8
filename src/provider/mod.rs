//! # Provider Abstraction Layer
//!
//! The text-generation capability every role shares.
//!
//! - [`Provider`] - Core trait for executing prompts
//! - [`GroqProvider`] - Groq's OpenAI-compatible chat completions API
//! - [`MockProvider`] - Test provider with scripted responses
//!
//! Providers are constructed once and passed to the runner as
//! `Arc<dyn Provider>`; nothing is read from process-wide state except the
//! API key, which is looked up on first use.
//!
//! ```rust
//! use crewline::provider::create_provider;
//!
//! assert!(create_provider("groq").is_ok());
//! assert!(create_provider("mock").is_ok());
//! assert!(create_provider("invalid").is_err());
//! ```

mod groq;
mod mock;

pub use groq::{GroqProvider, GROQ_API_KEY_VAR};
pub use mock::MockProvider;

use anyhow::Result;
use async_trait::async_trait;

use crate::error::CrewError;

/// Average characters per token for mixed content
const CHARS_PER_TOKEN_MIXED: f32 = 3.0;

// ============================================================================
// PROVIDER TRAIT (ASYNC)
// ============================================================================

/// Maps a prompt to generated text
///
/// One call is one attempt: implementations must not retry.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Returns the provider name (e.g., "groq", "mock")
    fn name(&self) -> &str;

    /// Model used when neither the pipeline nor the CLI picks one
    fn default_model(&self) -> &str;

    /// Execute a prompt and return the response
    async fn execute(&self, request: PromptRequest) -> Result<PromptResponse>;
}

// ============================================================================
// REQUEST/RESPONSE TYPES
// ============================================================================

/// Request to execute a prompt
#[derive(Debug, Clone, PartialEq)]
pub struct PromptRequest {
    /// The task prompt (user message)
    pub prompt: String,

    /// Role persona (system message)
    pub system_prompt: Option<String>,

    /// Model to use; empty means provider default
    pub model: String,

    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,

    /// Temperature for generation
    pub temperature: Option<f32>,
}

impl PromptRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            system_prompt: None,
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Response from a prompt execution
#[derive(Debug, Clone)]
pub struct PromptResponse {
    /// The generated content
    pub content: String,

    /// Token usage statistics
    pub usage: TokenUsage,
}

impl PromptResponse {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: TokenUsage::default(),
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }
}

/// Token usage statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt: u32, completion: u32) -> Self {
        Self {
            prompt_tokens: prompt,
            completion_tokens: completion,
            total_tokens: prompt + completion,
        }
    }

    /// Estimate usage when the API does not report counts
    pub fn estimate(prompt_len: usize, response_len: usize) -> Self {
        let prompt_tokens = (prompt_len as f32 / CHARS_PER_TOKEN_MIXED).ceil() as u32;
        let completion_tokens = (response_len as f32 / CHARS_PER_TOKEN_MIXED).ceil() as u32;
        Self::new(prompt_tokens, completion_tokens)
    }
}

// ============================================================================
// PROVIDER FACTORY
// ============================================================================

/// Create a provider instance by name
///
/// | Name | Description | Requires |
/// |------|-------------|----------|
/// | `groq` | Groq chat completions | `GROQ_API_KEY` at first call |
/// | `mock` | Testing | Nothing |
pub fn create_provider(name: &str) -> Result<Box<dyn Provider>, CrewError> {
    match name.to_lowercase().as_str() {
        "groq" => Ok(Box::new(GroqProvider::new())),
        "mock" => Ok(Box::new(MockProvider::new())),
        _ => Err(CrewError::UnknownProvider {
            name: name.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_request_builder() {
        let req = PromptRequest::new("Hello", "llama3-70b-8192")
            .with_system_prompt("You are helpful")
            .with_temperature(0.6)
            .with_max_tokens(512);

        assert_eq!(req.prompt, "Hello");
        assert_eq!(req.model, "llama3-70b-8192");
        assert_eq!(req.system_prompt.as_deref(), Some("You are helpful"));
        assert_eq!(req.temperature, Some(0.6));
        assert_eq!(req.max_tokens, Some(512));
    }

    #[test]
    fn test_token_usage_estimate() {
        // 300/3 = 100, 150/3 = 50
        let usage = TokenUsage::estimate(300, 150);

        assert_eq!(usage.prompt_tokens, 100);
        assert_eq!(usage.completion_tokens, 50);
        assert_eq!(usage.total_tokens, 150);
    }

    #[test]
    fn test_create_provider_by_name() {
        assert_eq!(create_provider("groq").unwrap().name(), "groq");
        assert_eq!(create_provider("MOCK").unwrap().name(), "mock");
    }

    #[test]
    fn test_create_provider_unknown() {
        let err = create_provider("claude").err().unwrap();
        assert!(matches!(err, CrewError::UnknownProvider { ref name } if name == "claude"));
    }
}

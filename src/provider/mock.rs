//! Mock provider for testing
//!
//! Returns scripted responses without making real API calls.

use super::{PromptRequest, PromptResponse, Provider, TokenUsage};
use anyhow::{bail, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Mock provider that returns predefined responses
pub struct MockProvider {
    /// Queue of responses to return (FIFO)
    responses: Mutex<VecDeque<String>>,
    /// Default response when queue is empty
    default_response: String,
    /// Fail the call with this 1-based index
    fail_on_call: Option<usize>,
    /// Every request seen, including the failing one
    requests: Mutex<Vec<PromptRequest>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            default_response: "Mock response".to_string(),
            fail_on_call: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create with a queue of responses
    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let provider = Self::new();
        provider
            .responses
            .lock()
            .extend(responses.into_iter().map(Into::into));
        provider
    }

    /// Set the default response when queue is empty
    pub fn with_default(mut self, response: impl Into<String>) -> Self {
        self.default_response = response.into();
        self
    }

    /// Make the Nth call (1-based) fail
    pub fn failing_on(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    /// Get all requests made to this provider
    pub fn requests(&self) -> Vec<PromptRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn default_model(&self) -> &str {
        "mock-model"
    }

    async fn execute(&self, request: PromptRequest) -> Result<PromptResponse> {
        let call = {
            let mut requests = self.requests.lock();
            requests.push(request.clone());
            requests.len()
        };

        if self.fail_on_call == Some(call) {
            bail!("mock failure on call {}", call);
        }

        let response_text = self
            .responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.default_response.clone());

        let usage = TokenUsage::estimate(request.prompt.len(), response_text.len());
        Ok(PromptResponse::new(response_text).with_usage(usage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_default_response() {
        let provider = MockProvider::new();
        let response = provider
            .execute(PromptRequest::new("Hello", "m"))
            .await
            .unwrap();
        assert_eq!(response.content, "Mock response");
    }

    #[tokio::test]
    async fn test_mock_queued_responses() {
        let provider = MockProvider::with_responses(["First", "Second"]).with_default("Fallback");

        let r1 = provider.execute(PromptRequest::new("a", "m")).await.unwrap();
        let r2 = provider.execute(PromptRequest::new("b", "m")).await.unwrap();
        let r3 = provider.execute(PromptRequest::new("c", "m")).await.unwrap();

        assert_eq!(r1.content, "First");
        assert_eq!(r2.content, "Second");
        assert_eq!(r3.content, "Fallback");
    }

    #[tokio::test]
    async fn test_mock_records_requests() {
        let provider = MockProvider::new();
        provider
            .execute(PromptRequest::new("First prompt", "m"))
            .await
            .unwrap();
        provider
            .execute(PromptRequest::new("Second prompt", "m").with_system_prompt("sys"))
            .await
            .unwrap();

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].prompt, "First prompt");
        assert_eq!(requests[1].system_prompt.as_deref(), Some("sys"));
    }

    #[tokio::test]
    async fn test_mock_fails_on_requested_call() {
        let provider = MockProvider::with_responses(["ok"]).failing_on(2);

        assert!(provider.execute(PromptRequest::new("1", "m")).await.is_ok());
        let err = provider
            .execute(PromptRequest::new("2", "m"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("call 2"));
        assert_eq!(provider.call_count(), 2);
    }
}

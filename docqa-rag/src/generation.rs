//! Generation model trait and a scripted mock.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{RagError, Result};

/// A single text generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// The complete prompt.
    pub prompt: String,
    /// Upper bound on the generated length, in tokens.
    pub max_output_tokens: usize,
}

/// A language model that continues a prompt.
///
/// Implementations wrap a specific backend (a local model server, a hosted
/// API) behind a unified async interface.
#[async_trait]
pub trait GenerationModel: Send + Sync {
    /// Model name used in logs and errors.
    fn name(&self) -> &str;

    /// Generate a completion for the request.
    async fn generate(&self, request: GenerationRequest) -> Result<String>;
}

/// A generation model that replays scripted responses.
///
/// Responses are returned in order; once the script is exhausted the
/// fallback response (if any) is repeated, otherwise a
/// [`RagError::GenerationError`] is returned. Every request is recorded.
///
/// # Example
///
/// ```rust
/// use docqa_rag::MockGenerationModel;
///
/// let model = MockGenerationModel::new().with_response("  Paris.  ");
/// assert_eq!(model.call_count(), 0);
/// ```
#[derive(Debug, Default)]
pub struct MockGenerationModel {
    responses: Mutex<VecDeque<Result<String>>>,
    fallback: Option<String>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl MockGenerationModel {
    /// Create a mock with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a successful response to the script.
    pub fn with_response(self, response: impl Into<String>) -> Self {
        self.push(Ok(response.into()));
        self
    }

    /// Append a failure to the script.
    pub fn with_error(self, message: impl Into<String>) -> Self {
        self.push(Err(RagError::GenerationError {
            model: "mock".to_string(),
            message: message.into(),
        }));
        self
    }

    /// Response returned whenever the script is exhausted.
    pub fn with_fallback(mut self, response: impl Into<String>) -> Self {
        self.fallback = Some(response.into());
        self
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Number of requests received so far.
    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }

    fn push(&self, response: Result<String>) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(response);
        }
    }
}

#[async_trait]
impl GenerationModel for MockGenerationModel {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        let scripted = self.responses.lock().ok().and_then(|mut r| r.pop_front());
        match (scripted, &self.fallback) {
            (Some(response), _) => response,
            (None, Some(fallback)) => Ok(fallback.clone()),
            (None, None) => Err(RagError::GenerationError {
                model: "mock".to_string(),
                message: "no scripted response left".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(prompt: &str) -> GenerationRequest {
        GenerationRequest { prompt: prompt.to_string(), max_output_tokens: 150 }
    }

    #[tokio::test]
    async fn replays_script_then_fallback() {
        let model = MockGenerationModel::new()
            .with_response("first")
            .with_error("boom")
            .with_fallback("again");

        assert_eq!(model.generate(request("a")).await.unwrap(), "first");
        assert!(matches!(
            model.generate(request("b")).await,
            Err(RagError::GenerationError { .. })
        ));
        assert_eq!(model.generate(request("c")).await.unwrap(), "again");
        assert_eq!(model.call_count(), 3);
        assert_eq!(model.requests()[2].prompt, "c");
    }

    #[tokio::test]
    async fn exhausted_script_without_fallback_fails() {
        let model = MockGenerationModel::new();
        assert!(model.generate(request("a")).await.is_err());
    }
}

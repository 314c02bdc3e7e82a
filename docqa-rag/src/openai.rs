//! OpenAI-compatible embedding and chat backends.
//!
//! Works against the OpenAI API and any server exposing the same
//! `/embeddings` and `/chat/completions` endpoints (Ollama, vLLM, LM Studio).
//! This module is only available when the `openai` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::{GenerationModel, GenerationRequest};

/// The default OpenAI API base URL.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// The default model for OpenAI embeddings.
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// The default dimensionality for `text-embedding-3-small`.
const DEFAULT_DIMENSIONS: usize = 1536;

/// Connection settings shared by both backends.
#[derive(Clone)]
struct Endpoint {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl Endpoint {
    fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let request = self.client.post(format!("{}/{path}", self.base_url));
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

/// Read the error message out of a failed response body.
async fn error_detail(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail =
        serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);
    format!("API returned {status}: {detail}")
}

// ── API request/response types ─────────────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

// ── Embeddings ─────────────────────────────────────────────────────

/// An [`EmbeddingProvider`] backed by an OpenAI-compatible `/embeddings` endpoint.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::openai::OpenAIEmbeddingProvider;
///
/// let provider = OpenAIEmbeddingProvider::new("http://localhost:11434/v1", None)
///     .with_model("all-minilm", 384);
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    endpoint: Endpoint,
    model: String,
    dimensions: usize,
    /// If set, passed to the API for Matryoshka dimension truncation.
    request_dimensions: Option<usize>,
}

impl OpenAIEmbeddingProvider {
    /// Create a provider for `base_url` using `text-embedding-3-small`.
    ///
    /// `api_key` may be `None` for local servers that do not check it.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            endpoint: Endpoint::new(base_url, api_key),
            model: DEFAULT_EMBEDDING_MODEL.into(),
            dimensions: DEFAULT_DIMENSIONS,
            request_dimensions: None,
        }
    }

    /// Create a provider for the OpenAI API using the `OPENAI_API_KEY`
    /// environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| RagError::EmbeddingError {
            provider: "OpenAI".into(),
            message: "OPENAI_API_KEY environment variable not set".into(),
        })?;
        Ok(Self::new(OPENAI_BASE_URL, Some(api_key)))
    }

    /// Set the model name and the dimensionality it produces.
    pub fn with_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.model = model.into();
        self.dimensions = dimensions;
        self
    }

    /// Ask the API to truncate embeddings to `dims` (Matryoshka support).
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self.request_dimensions = Some(dims);
        self
    }

    fn failure(message: impl Into<String>) -> RagError {
        RagError::EmbeddingError { provider: "OpenAI".into(), message: message.into() }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    fn name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = "OpenAI", text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| Self::failure("API returned empty response"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = "OpenAI", batch_size = texts.len(), model = %self.model, "embedding batch");

        let request_body = EmbeddingRequest {
            model: &self.model,
            input: texts.to_vec(),
            dimensions: self.request_dimensions,
        };

        let response =
            self.endpoint.post("embeddings").json(&request_body).send().await.map_err(|e| {
                error!(provider = "OpenAI", error = %e, "request failed");
                Self::failure(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let detail = error_detail(response).await;
            error!(provider = "OpenAI", %detail, "API error");
            return Err(Self::failure(detail));
        }

        let embedding_response: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = "OpenAI", error = %e, "failed to parse response");
            Self::failure(format!("failed to parse response: {e}"))
        })?;

        let embeddings: Vec<Vec<f32>> =
            embedding_response.data.into_iter().map(|d| d.embedding).collect();
        if let Some(bad) = embeddings.iter().find(|e| e.len() != self.dimensions) {
            return Err(Self::failure(format!(
                "expected {}-dimensional embeddings, got {}",
                self.dimensions,
                bad.len()
            )));
        }
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// ── Generation ─────────────────────────────────────────────────────

/// A [`GenerationModel`] backed by an OpenAI-compatible `/chat/completions`
/// endpoint. The prompt is sent as a single user message with temperature 0.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::openai::OpenAIChatModel;
///
/// let model = OpenAIChatModel::new("http://localhost:11434/v1", None, "llama3.2");
/// ```
pub struct OpenAIChatModel {
    endpoint: Endpoint,
    model: String,
}

impl OpenAIChatModel {
    /// Create a chat model client for `base_url`.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self { endpoint: Endpoint::new(base_url, api_key), model: model.into() }
    }

    fn failure(&self, message: impl Into<String>) -> RagError {
        RagError::GenerationError { model: self.model.clone(), message: message.into() }
    }
}

#[async_trait]
impl GenerationModel for OpenAIChatModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        debug!(model = %self.model, prompt_len = request.prompt.len(), "generating");

        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: &request.prompt }],
            max_tokens: request.max_output_tokens,
            temperature: 0.0,
        };

        let response =
            self.endpoint.post("chat/completions").json(&body).send().await.map_err(|e| {
                error!(model = %self.model, error = %e, "request failed");
                self.failure(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let detail = error_detail(response).await;
            error!(model = %self.model, %detail, "API error");
            return Err(self.failure(detail));
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            error!(model = %self.model, error = %e, "failed to parse response");
            self.failure(format!("failed to parse response: {e}"))
        })?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| self.failure("response contained no message content"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_ignored() {
        let endpoint = Endpoint::new("http://localhost:11434/v1/", Some(String::new()));
        assert_eq!(endpoint.base_url, "http://localhost:11434/v1");
        assert!(endpoint.api_key.is_none());
    }

    #[test]
    fn chat_request_serialises_token_bound() {
        let body = ChatRequest {
            model: "llama3.2",
            messages: vec![ChatMessage { role: "user", content: "hi" }],
            max_tokens: 150,
            temperature: 0.0,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["max_tokens"], 150);
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn chat_response_without_content_parses() {
        let chat: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant"}}]}"#).unwrap();
        assert!(chat.choices[0].message.content.is_none());
    }
}

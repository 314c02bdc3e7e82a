//! Configuration for the RAG pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Default relevance threshold, in squared-L2 units of a normalised
/// sentence embedding. Recalibrate when switching embedders.
pub const DEFAULT_RELEVANCE_THRESHOLD: f32 = 1.5;

/// Configuration parameters for the RAG pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of nearest chunks retrieved per question.
    pub top_k: usize,
    /// Retrieval is insufficient when the closest chunk is farther than this.
    pub relevance_threshold: f32,
    /// Upper bound on generated answer length, in tokens.
    pub max_output_tokens: usize,
    /// Converted documents with fewer trimmed characters are treated as empty.
    pub min_content_chars: usize,
    /// Number of question/answer entries kept in session memory.
    pub history_capacity: usize,
    /// Uploads larger than this many bytes are rejected.
    pub max_file_bytes: usize,
    /// Timeout for a single embedding call. `None` waits indefinitely.
    pub embed_timeout: Option<Duration>,
    /// Timeout for a single generation call. `None` waits indefinitely.
    pub generate_timeout: Option<Duration>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 700,
            chunk_overlap: 100,
            top_k: 3,
            relevance_threshold: DEFAULT_RELEVANCE_THRESHOLD,
            max_output_tokens: 150,
            min_content_chars: 10,
            history_capacity: 10,
            max_file_bytes: 10 * 1024 * 1024,
            embed_timeout: Some(Duration::from_secs(30)),
            generate_timeout: Some(Duration::from_secs(120)),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Parse a JSON document into a validated config.
    ///
    /// Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: RagConfig = serde_json::from_str(json)
            .map_err(|e| RagError::ConfigError(format!("invalid config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `history_capacity == 0`
    /// - `relevance_threshold` is negative or not finite
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if self.history_capacity == 0 {
            return Err(RagError::ConfigError(
                "history_capacity must be greater than zero".to_string(),
            ));
        }
        if !self.relevance_threshold.is_finite() || self.relevance_threshold < 0.0 {
            return Err(RagError::ConfigError(format!(
                "relevance_threshold ({}) must be a finite, non-negative number",
                self.relevance_threshold
            )));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of chunks retrieved per question.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the maximum distance at which evidence still counts as relevant.
    pub fn relevance_threshold(mut self, threshold: f32) -> Self {
        self.config.relevance_threshold = threshold;
        self
    }

    /// Set the generated answer length bound.
    pub fn max_output_tokens(mut self, tokens: usize) -> Self {
        self.config.max_output_tokens = tokens;
        self
    }

    /// Set the minimum amount of content a converted document must have.
    pub fn min_content_chars(mut self, chars: usize) -> Self {
        self.config.min_content_chars = chars;
        self
    }

    /// Set the number of history entries kept per session.
    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.config.history_capacity = capacity;
        self
    }

    /// Set the upload size limit in bytes.
    pub fn max_file_bytes(mut self, bytes: usize) -> Self {
        self.config.max_file_bytes = bytes;
        self
    }

    /// Set or clear the embedding call timeout.
    pub fn embed_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.embed_timeout = timeout;
        self
    }

    /// Set or clear the generation call timeout.
    pub fn generate_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.generate_timeout = timeout;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

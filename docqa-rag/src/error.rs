//! Error types for the `docqa-rag` crate.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur in RAG operations.
///
/// An answer that cannot be grounded in the indexed documents is not an
/// error; see [`Retrieval::Insufficient`](crate::retriever::Retrieval::Insufficient).
#[derive(Debug, Error)]
pub enum RagError {
    /// A document could not be converted to text.
    #[error("Conversion error ({filename}): {message}")]
    ConversionError {
        /// The file that failed to convert.
        filename: String,
        /// A description of the failure.
        message: String,
    },

    /// Converted text is too short to be meaningful.
    #[error("Empty content ({filename}): {chars} characters of content, at least {min} required")]
    EmptyContentError {
        /// The file whose content was rejected.
        filename: String,
        /// Number of characters left after trimming whitespace.
        chars: usize,
        /// The configured minimum.
        min: usize,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A record with the same identifier already exists in the collection.
    ///
    /// Collections must be reset before a document is reprocessed.
    #[error("Duplicate id '{id}' in collection '{collection}'")]
    DuplicateIdError {
        /// The collection that rejected the write.
        collection: String,
        /// The conflicting record identifier.
        id: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The generation model failed or returned unusable output.
    #[error("Generation error ({model}): {message}")]
    GenerationError {
        /// The generation model that produced the error.
        model: String,
        /// A description of the failure.
        message: String,
    },

    /// An external model call did not finish within its configured timeout.
    #[error("Timeout: {operation} did not complete within {timeout:?}")]
    TimeoutError {
        /// The operation that timed out (`embedding` or `generation`).
        operation: String,
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// An uploaded file exceeds the configured size limit.
    #[error("File too large ({filename}): {size} bytes exceeds the limit of {limit} bytes")]
    FileTooLarge {
        /// The rejected file.
        filename: String,
        /// The file size in bytes.
        size: usize,
        /// The configured limit in bytes.
        limit: usize,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An error in the RAG pipeline orchestration.
    #[error("Pipeline error: {0}")]
    PipelineError(String),
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;

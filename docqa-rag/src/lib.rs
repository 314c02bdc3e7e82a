//! # docqa-rag
//!
//! Retrieval-augmented question answering over uploaded documents.
//!
//! ## Overview
//!
//! Uploaded files are converted to text, split into overlapping chunks,
//! embedded, and indexed in a vector collection. Questions are embedded the
//! same way; the nearest chunks are gated by a relevance threshold and, when
//! relevant enough, handed to a generation model with a prompt that forbids
//! answering from outside the context. Anything the documents cannot ground
//! gets a fixed refusal instead of a guess.
//!
//! - [`RecursiveChunker`] - separator-hierarchy text splitting with overlap
//! - [`EmbeddingProvider`] - text → vector boundary ([`HashingEmbeddingProvider`] built in)
//! - [`VectorStore`] - nearest-neighbour collections ([`InMemoryVectorStore`] built in)
//! - [`Retriever`] - search plus the sufficiency gate
//! - [`AnswerSynthesizer`] - grounded prompting and source attribution
//! - [`SessionState`] - bounded per-session question history
//! - [`RagContext`] - wires the above into ingestion and `ask`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docqa_rag::{
//!     DEFAULT_COLLECTION, HashingEmbeddingProvider, MockGenerationModel, RagContext,
//!     SessionState, SourceFile,
//! };
//!
//! let context = RagContext::builder()
//!     .embedding_provider(Arc::new(HashingEmbeddingProvider::default()))
//!     .generation_model(Arc::new(MockGenerationModel::new().with_fallback("Paris.")))
//!     .build()?;
//!
//! let files = [SourceFile::new("paris.txt", "The Eiffel Tower is located in Paris, France.")];
//! let batch = context.ingest_batch(DEFAULT_COLLECTION, &files).await?;
//!
//! let mut session = SessionState::new();
//! session.set_documents(&batch);
//! let answer = context.ask(DEFAULT_COLLECTION, "Where is the Eiffel Tower?", &mut session).await?;
//! println!("{} (source: {})", answer.text, answer.source);
//! ```
//!
//! ## Features
//!
//! - `openai` - OpenAI-compatible embedding and chat backends (also Ollama, vLLM)

pub mod chunking;
pub mod config;
pub mod conversion;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod history;
pub mod inmemory;
#[cfg(feature = "openai")]
pub mod openai;
pub mod pipeline;
pub mod retriever;
pub mod synthesizer;
mod timeout;
pub mod vectorstore;

pub use chunking::{Chunker, DEFAULT_SEPARATORS, RecursiveChunker, TextChunks};
pub use config::{DEFAULT_RELEVANCE_THRESHOLD, RagConfig, RagConfigBuilder};
pub use conversion::{DocumentConverter, PlainTextConverter, placeholder_text};
pub use document::{
    Chunk, ChunkMetadata, Document, EmbeddingRecord, SearchResult, record_id,
};
pub use embedding::{EmbeddingProvider, HashingEmbeddingProvider};
pub use error::{RagError, Result};
pub use generation::{GenerationModel, GenerationRequest, MockGenerationModel};
pub use history::{HistoryEntry, SessionState};
pub use inmemory::InMemoryVectorStore;
#[cfg(feature = "openai")]
pub use openai::{OpenAIChatModel, OpenAIEmbeddingProvider};
pub use pipeline::{
    BatchResult, DEFAULT_COLLECTION, DocumentStats, FailedDocument, RagContext,
    RagContextBuilder, SourceFile,
};
pub use retriever::{Evidence, Retrieval, Retriever};
pub use synthesizer::{Answer, AnswerSynthesizer, NO_SOURCE, REFUSAL_ANSWER};
pub use vectorstore::{Collection, DistanceMetric, VectorStore};

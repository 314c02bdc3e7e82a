//! RAG context: ingestion and question answering.
//!
//! The [`RagContext`] is constructed once at process start and passed to
//! every operation. It owns the embedder, the vector store, the chunker, the
//! document converter and the generation model.
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_rag::{RagContext, RagConfig, HashingEmbeddingProvider, SessionState, SourceFile};
//!
//! let context = RagContext::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(HashingEmbeddingProvider::default()))
//!     .generation_model(Arc::new(my_model))
//!     .build()?;
//!
//! let batch = context.ingest_batch("uploaded_documents", &files).await?;
//! let mut session = SessionState::new();
//! session.set_documents(&batch);
//! let answer = context.ask("uploaded_documents", "Where is the Eiffel Tower?", &mut session).await?;
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::RagConfig;
use crate::conversion::{DocumentConverter, PlainTextConverter, placeholder_text};
use crate::document::{Document, EmbeddingRecord};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::GenerationModel;
use crate::history::SessionState;
use crate::inmemory::InMemoryVectorStore;
use crate::retriever::{Retrieval, Retriever};
use crate::synthesizer::{Answer, AnswerSynthesizer};
use crate::timeout::with_timeout;
use crate::vectorstore::{Collection, VectorStore};

/// Collection used for uploaded documents when the caller has no preference.
pub const DEFAULT_COLLECTION: &str = "uploaded_documents";

/// An uploaded file awaiting ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// The uploaded filename.
    pub filename: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl SourceFile {
    /// Create a source file from a name and its contents.
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self { filename: filename.into(), bytes: bytes.into() }
    }

    /// Read a source file from disk, named after the path's file name.
    pub fn from_path(path: &Path) -> Result<Self> {
        Self::from_path_with_limit(path, usize::MAX)
    }

    /// Like [`from_path`](Self::from_path), but rejects files larger than
    /// `limit` bytes before reading them.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::FileTooLarge`] for oversized files and
    /// [`RagError::ConversionError`] if the file cannot be read.
    pub fn from_path_with_limit(path: &Path, limit: usize) -> Result<Self> {
        let filename = display_name(path);
        let unreadable = |e: std::io::Error| RagError::ConversionError {
            filename: filename.clone(),
            message: format!("failed to read {}: {e}", path.display()),
        };

        let size = std::fs::metadata(path).map_err(unreadable)?.len();
        if size > limit as u64 {
            return Err(RagError::FileTooLarge {
                filename: filename.clone(),
                size: usize::try_from(size).unwrap_or(usize::MAX),
                limit,
            });
        }
        let bytes = std::fs::read(path).map_err(unreadable)?;
        Ok(Self { filename, bytes })
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

/// Statistics of one ingested document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStats {
    /// The document filename.
    pub filename: String,
    /// Number of chunks indexed.
    pub chunk_count: usize,
    /// Whitespace-separated words in the indexed text.
    pub word_count: usize,
    /// Characters in the indexed text.
    pub char_count: usize,
    /// UTF-8 size of the indexed text in bytes.
    pub byte_size: usize,
    /// Whether placeholder text was indexed in place of the real content.
    pub placeholder: bool,
}

/// A file that could not be indexed.
#[derive(Debug)]
pub struct FailedDocument {
    /// The file that failed.
    pub filename: String,
    /// Why it failed.
    pub error: RagError,
}

/// Outcome of [`RagContext::ingest_batch`].
///
/// Ingestion is best-effort: each file succeeds or fails on its own and the
/// collection is updated progressively.
#[derive(Debug, Default)]
pub struct BatchResult {
    /// The collection that was rebuilt.
    pub collection: String,
    /// Documents indexed, in upload order.
    pub succeeded: Vec<DocumentStats>,
    /// Documents that could not be indexed.
    pub failed: Vec<FailedDocument>,
    /// Recovered per-file problems (conversion failures, empty content).
    pub warnings: Vec<RagError>,
}

impl BatchResult {
    /// Total chunks indexed across all succeeded documents.
    pub fn chunk_count(&self) -> usize {
        self.succeeded.iter().map(|d| d.chunk_count).sum()
    }

    /// Total words indexed across all succeeded documents.
    pub fn word_count(&self) -> usize {
        self.succeeded.iter().map(|d| d.word_count).sum()
    }
}

/// The RAG context object.
///
/// Coordinates ingestion (convert → chunk → embed → store) and question
/// answering (embed → search → gate → generate → record). Construct one via
/// [`RagContext::builder()`].
pub struct RagContext {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
    converter: Arc<dyn DocumentConverter>,
    retriever: Retriever,
    synthesizer: AnswerSynthesizer,
}

impl RagContext {
    /// Create a new [`RagContextBuilder`].
    pub fn builder() -> RagContextBuilder {
        RagContextBuilder::default()
    }

    /// Return a reference to the configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Return the query-time retriever.
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Return the answer synthesizer.
    pub fn synthesizer(&self) -> &AnswerSynthesizer {
        &self.synthesizer
    }

    /// Return the named collection, creating it empty if it does not exist.
    pub async fn get_or_create(&self, name: &str) -> Result<Collection> {
        let dimensions = self.embedding_provider.dimensions();
        self.vector_store.create_collection(name, dimensions).await.inspect_err(|e| {
            error!(collection = name, error = %e, "failed to create collection");
        })?;
        Ok(Collection::new(name, self.vector_store.clone()))
    }

    /// Replace the named collection with a fresh, empty one.
    ///
    /// Succeeds whether or not the collection existed.
    pub async fn reset(&self, name: &str) -> Result<Collection> {
        let dimensions = self.embedding_provider.dimensions();
        self.vector_store.reset_collection(name, dimensions).await.inspect_err(|e| {
            error!(collection = name, error = %e, "failed to reset collection");
        })?;
        info!(collection = name, "collection reset");
        Ok(Collection::new(name, self.vector_store.clone()))
    }

    /// Ingest one converted document: chunk → embed → store.
    ///
    /// A document without content yields zero chunks and is not embedded.
    ///
    /// # Errors
    ///
    /// Returns embedding and timeout errors from the embedder, and
    /// [`RagError::DuplicateIdError`] if the document's chunks are already
    /// stored. On error nothing from this document is stored.
    pub async fn ingest_document(
        &self,
        collection: &Collection,
        document: &Document,
    ) -> Result<DocumentStats> {
        let chunks = self.chunker.chunk(document);
        let mut stats = DocumentStats {
            filename: document.filename.clone(),
            chunk_count: chunks.len(),
            word_count: document.text.split_whitespace().count(),
            char_count: document.text.chars().count(),
            byte_size: document.text.len(),
            placeholder: false,
        };
        if chunks.is_empty() {
            info!(filename = %document.filename, chunk_count = 0, "ingested document (empty)");
            return Ok(stats);
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = with_timeout(
            "embedding",
            self.config.embed_timeout,
            self.embedding_provider.embed_batch(&texts),
        )
        .await
        .inspect_err(|e| {
            error!(filename = %document.filename, error = %e, "embedding failed during ingestion");
        })?;

        if embeddings.len() != chunks.len() {
            return Err(RagError::EmbeddingError {
                provider: self.embedding_provider.name().to_string(),
                message: format!(
                    "expected {} embeddings for '{}', got {}",
                    chunks.len(),
                    document.filename,
                    embeddings.len()
                ),
            });
        }

        let records: Vec<EmbeddingRecord> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| EmbeddingRecord::from_chunk(chunk, embedding))
            .collect();
        collection.add(&records).await.inspect_err(|e| {
            error!(filename = %document.filename, error = %e, "storing chunks failed");
        })?;

        stats.chunk_count = records.len();
        info!(
            collection = collection.name(),
            filename = %document.filename,
            chunk_count = stats.chunk_count,
            "ingested document"
        );
        Ok(stats)
    }

    /// Rebuild `collection` from an upload batch.
    ///
    /// The collection is reset first, then each file is size-checked,
    /// converted, validated, and ingested in order. Unconvertible or empty
    /// files are indexed as placeholder text and reported in
    /// [`BatchResult::warnings`]; files that fail to index are reported in
    /// [`BatchResult::failed`]. Neither stops the batch.
    ///
    /// # Errors
    ///
    /// Returns an error only if the collection cannot be reset.
    pub async fn ingest_batch(&self, collection: &str, files: &[SourceFile]) -> Result<BatchResult> {
        let handle = self.reset(collection).await?;
        let mut result = BatchResult { collection: collection.to_string(), ..BatchResult::default() };

        for file in files {
            if file.bytes.len() > self.config.max_file_bytes {
                self.reject_too_large(&file.filename, file.bytes.len(), &mut result);
                continue;
            }
            let (text, placeholder) = self.convert_checked(file, &mut result.warnings);
            self.ingest_text(&handle, &file.filename, text, placeholder, &mut result).await;
        }

        self.log_batch(&result);
        Ok(result)
    }

    /// Rebuild `collection` from files on disk.
    ///
    /// Behaves like [`ingest_batch`](Self::ingest_batch). Oversized files
    /// are rejected from their metadata without being read, and files that
    /// cannot be read are indexed as placeholder text with a
    /// [`RagError::ConversionError`] warning.
    ///
    /// # Errors
    ///
    /// Returns an error only if the collection cannot be reset.
    pub async fn ingest_paths<P: AsRef<Path>>(
        &self,
        collection: &str,
        paths: &[P],
    ) -> Result<BatchResult> {
        let handle = self.reset(collection).await?;
        let mut result = BatchResult { collection: collection.to_string(), ..BatchResult::default() };

        for path in paths {
            let path = path.as_ref();
            match SourceFile::from_path_with_limit(path, self.config.max_file_bytes) {
                Ok(file) => {
                    let (text, placeholder) = self.convert_checked(&file, &mut result.warnings);
                    self.ingest_text(&handle, &file.filename, text, placeholder, &mut result)
                        .await;
                }
                Err(RagError::FileTooLarge { filename, size, .. }) => {
                    self.reject_too_large(&filename, size, &mut result);
                }
                Err(error) => {
                    let filename = display_name(path);
                    warn!(%filename, %error, "file unreadable, indexing placeholder");
                    result.warnings.push(error);
                    let text = placeholder_text(&filename);
                    self.ingest_text(&handle, &filename, text, true, &mut result).await;
                }
            }
        }

        self.log_batch(&result);
        Ok(result)
    }

    fn reject_too_large(&self, filename: &str, size: usize, result: &mut BatchResult) {
        warn!(filename, size, "file too large");
        result.failed.push(FailedDocument {
            filename: filename.to_string(),
            error: RagError::FileTooLarge {
                filename: filename.to_string(),
                size,
                limit: self.config.max_file_bytes,
            },
        });
    }

    async fn ingest_text(
        &self,
        handle: &Collection,
        filename: &str,
        text: String,
        placeholder: bool,
        result: &mut BatchResult,
    ) {
        let document = Document::new(filename, text);
        match self.ingest_document(handle, &document).await {
            Ok(mut stats) => {
                stats.placeholder = placeholder;
                result.succeeded.push(stats);
            }
            Err(error) => {
                warn!(filename, %error, "document skipped");
                result.failed.push(FailedDocument { filename: filename.to_string(), error });
            }
        }
    }

    fn log_batch(&self, result: &BatchResult) {
        info!(
            collection = %result.collection,
            succeeded = result.succeeded.len(),
            failed = result.failed.len(),
            warnings = result.warnings.len(),
            chunk_count = result.chunk_count(),
            "batch ingested"
        );
    }

    /// Convert a file and apply the minimum-content check, substituting
    /// placeholder text on failure. Returns the text and whether it is a
    /// placeholder.
    fn convert_checked(&self, file: &SourceFile, warnings: &mut Vec<RagError>) -> (String, bool) {
        let text = match self.converter.convert(&file.filename, &file.bytes) {
            Ok(text) => text,
            Err(error) => {
                warn!(filename = %file.filename, %error, "conversion failed, indexing placeholder");
                warnings.push(error);
                return (placeholder_text(&file.filename), true);
            }
        };

        let chars = text.trim().chars().count();
        if chars < self.config.min_content_chars {
            warn!(filename = %file.filename, chars, "content empty or corrupted, indexing placeholder");
            warnings.push(RagError::EmptyContentError {
                filename: file.filename.clone(),
                chars,
                min: self.config.min_content_chars,
            });
            return (placeholder_text(&file.filename), true);
        }
        (text, false)
    }

    /// Retrieve gated evidence for a question from the named collection.
    pub async fn retrieve(&self, collection: &str, question: &str) -> Result<Retrieval> {
        let handle = self.get_or_create(collection).await?;
        self.retriever.retrieve(&handle, question, self.config.top_k).await
    }

    /// Answer a question from the named collection and record it in the
    /// session history.
    ///
    /// Questions nothing in the collection is relevant to get the fixed
    /// refusal answer with source `"No source"`; that outcome is recorded too.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] for a blank question, and
    /// embedding, store, generation, or timeout errors. Failed questions are
    /// not recorded.
    pub async fn ask(
        &self,
        collection: &str,
        question: &str,
        session: &mut SessionState,
    ) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::PipelineError("question must not be empty".to_string()));
        }

        let retrieval = self.retrieve(collection, question).await?;
        let answer = self.synthesizer.synthesize(question, &retrieval).await?;
        session.record(question, answer.text.clone(), answer.source.clone());
        info!(collection, source = %answer.source, refused = answer.is_refusal(), "question answered");
        Ok(answer)
    }

    /// Check that the pieces needed to answer questions are in place.
    ///
    /// Returns human-readable issues; an empty list means healthy.
    pub async fn health_check(&self, collection: &str, session: &SessionState) -> Vec<String> {
        let mut issues = Vec::new();

        if self.embedding_provider.dimensions() == 0 {
            issues.push(format!(
                "Embedding provider '{}' reports zero dimensions",
                self.embedding_provider.name()
            ));
        }

        let processed = !session.documents().is_empty();
        match self.vector_store.count(collection).await {
            Ok(0) if processed => issues.push(format!(
                "Collection '{collection}' is empty despite processed documents"
            )),
            Err(e) if processed => issues.push(format!(
                "Documents processed but collection '{collection}' is unavailable: {e}"
            )),
            _ => {}
        }

        issues
    }
}

/// Builder for constructing a [`RagContext`].
///
/// The embedding provider and generation model are required. Everything
/// else defaults: [`RagConfig::default()`], an [`InMemoryVectorStore`], a
/// [`RecursiveChunker`] sized from the config, and a [`PlainTextConverter`].
#[derive(Default)]
pub struct RagContextBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
    converter: Option<Arc<dyn DocumentConverter>>,
    generation_model: Option<Arc<dyn GenerationModel>>,
}

impl RagContextBuilder {
    /// Set the configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the document converter.
    pub fn converter(mut self, converter: Arc<dyn DocumentConverter>) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Set the generation model.
    pub fn generation_model(mut self, model: Arc<dyn GenerationModel>) -> Self {
        self.generation_model = Some(model);
        self
    }

    /// Build the [`RagContext`], validating the config and required fields.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing or
    /// the config is invalid.
    pub fn build(self) -> Result<RagContext> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let generation_model = self
            .generation_model
            .ok_or_else(|| RagError::ConfigError("generation_model is required".to_string()))?;

        let vector_store: Arc<dyn VectorStore> = match self.vector_store {
            Some(store) => store,
            None => Arc::new(InMemoryVectorStore::new()),
        };
        let chunker: Arc<dyn Chunker> = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(RecursiveChunker::from_config(&config)),
        };
        let converter: Arc<dyn DocumentConverter> = match self.converter {
            Some(converter) => converter,
            None => Arc::new(PlainTextConverter),
        };

        let retriever = Retriever::new(embedding_provider.clone(), config.relevance_threshold)
            .with_embed_timeout(config.embed_timeout);
        let synthesizer = AnswerSynthesizer::new(generation_model, config.max_output_tokens)
            .with_generate_timeout(config.generate_timeout);

        Ok(RagContext {
            config,
            embedding_provider,
            vector_store,
            chunker,
            converter,
            retriever,
            synthesizer,
        })
    }
}

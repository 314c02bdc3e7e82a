//! Embedding provider trait and the built-in lexical embedder.

use async_trait::async_trait;

use crate::error::{RagError, Result};

/// A provider that generates vector embeddings from text input.
///
/// Implementations must be deterministic for identical input and safe to
/// call concurrently. The default [`embed_batch`](EmbeddingProvider::embed_batch)
/// implementation calls [`embed`](EmbeddingProvider::embed) sequentially;
/// backends that support native batching should override it.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::EmbeddingProvider;
///
/// let provider = MyEmbeddingProvider::new();
/// let embedding = provider.embed("hello world").await?;
/// assert_eq!(embedding.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Short provider name used in logs and errors.
    fn name(&self) -> &str;

    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs.
    ///
    /// The default implementation calls [`embed`](EmbeddingProvider::embed)
    /// sequentially for each input. Override this method if the backend
    /// supports native batch embedding for better throughput.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;
}

/// Common English words that carry no topical signal.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "can", "did", "do", "does", "for", "from",
    "has", "have", "how", "i", "in", "is", "it", "its", "of", "on", "or", "that", "the", "this",
    "to", "was", "were", "what", "when", "where", "which", "who", "why", "will", "with", "you",
    "your",
];

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// Default dimensionality of [`HashingEmbeddingProvider`].
pub const DEFAULT_HASHING_DIMENSIONS: usize = 256;

/// A deterministic bag-of-words embedder that needs no model download.
///
/// Text is lower-cased and split into alphanumeric tokens; stopwords are
/// dropped unless nothing else remains. Each token increments the bucket
/// selected by its FNV-1a hash, and the vector is L2-normalised, so the
/// squared L2 distance between two embeddings lies in `[0, 2]` for texts
/// with content and equals `2` for texts sharing no token bucket. Text
/// without any alphanumeric token embeds to the zero vector, which
/// [`DistanceMetric`](crate::vectorstore::DistanceMetric) places infinitely
/// far from everything.
#[derive(Debug, Clone)]
pub struct HashingEmbeddingProvider {
    dimensions: usize,
}

impl HashingEmbeddingProvider {
    /// Create a provider producing vectors of `dimensions` components.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`] if `dimensions` is zero.
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(RagError::EmbeddingError {
                provider: "Hashing".into(),
                message: "dimensions must be greater than zero".into(),
            });
        }
        Ok(Self { dimensions })
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        for token in tokenize(text) {
            let bucket = (fnv1a(token.as_bytes()) % self.dimensions as u64) as usize;
            embedding[bucket] += 1.0;
        }
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            embedding.iter_mut().for_each(|x| *x /= norm);
        }
        embedding
    }
}

impl Default for HashingEmbeddingProvider {
    fn default() -> Self {
        Self { dimensions: DEFAULT_HASHING_DIMENSIONS }
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbeddingProvider {
    fn name(&self) -> &str {
        "Hashing"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

fn tokenize(text: &str) -> Vec<String> {
    let tokens: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect();
    let content: Vec<String> =
        tokens.iter().filter(|t| !STOPWORDS.contains(&t.as_str())).cloned().collect();
    if content.is_empty() { tokens } else { content }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME))
}

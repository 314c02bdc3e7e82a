//! Vector store trait, distance metrics, and the collection handle.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::{EmbeddingRecord, SearchResult};
use crate::error::Result;

/// The dissimilarity measure used by a vector store. Lower is more similar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Sum of squared component differences.
    #[default]
    SquaredL2,
    /// `1 - cosine_similarity`, in `[0, 2]`.
    Cosine,
}

impl DistanceMetric {
    /// Compute the distance between two vectors of equal length.
    ///
    /// A zero vector carries no direction and is infinitely far from
    /// everything, itself included, under either metric.
    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        let norm_a = norm(a);
        let norm_b = norm(b);
        if norm_a == 0.0 || norm_b == 0.0 {
            return f32::INFINITY;
        }
        match self {
            Self::SquaredL2 => a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum(),
            Self::Cosine => {
                let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
                1.0 - dot / (norm_a * norm_b)
            }
        }
    }
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SquaredL2 => f.write_str("squared_l2"),
            Self::Cosine => f.write_str("cosine"),
        }
    }
}

/// A storage backend for embedding records with nearest-neighbour search.
///
/// Implementations manage named collections. A store uses one
/// [`DistanceMetric`] for every collection it holds.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("docs", 256).await?;
/// store.add("docs", &records).await?;
/// let results = store.query("docs", &query_embedding, 3).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a named collection. No-op if it already exists.
    ///
    /// `dimensions == 0` lets the first added record fix the dimensionality.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Delete a named collection and all its data. Succeeds if it is absent.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Replace a collection with a fresh, empty one of the same name.
    ///
    /// Readers never observe a state where the name is missing.
    async fn reset_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Insert records. Fails with
    /// [`DuplicateIdError`](crate::RagError::DuplicateIdError) if any id is
    /// already stored or repeated within `records`; nothing is inserted then.
    async fn add(&self, collection: &str, records: &[EmbeddingRecord]) -> Result<()>;

    /// Return at most `top_k` records nearest to `embedding`, ordered by
    /// ascending distance. An empty collection yields an empty list.
    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>>;

    /// Number of records stored in a collection.
    async fn count(&self, collection: &str) -> Result<usize>;

    /// The distance metric used for every query.
    fn metric(&self) -> DistanceMetric;
}

/// A handle to one named collection of a [`VectorStore`].
///
/// Handles are cheap to clone. After a reset, existing handles refer to the
/// new, empty collection.
#[derive(Clone)]
pub struct Collection {
    name: String,
    store: Arc<dyn VectorStore>,
}

impl Collection {
    pub(crate) fn new(name: impl Into<String>, store: Arc<dyn VectorStore>) -> Self {
        Self { name: name.into(), store }
    }

    /// The collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert records, rejecting duplicate ids.
    pub async fn add(&self, records: &[EmbeddingRecord]) -> Result<()> {
        self.store.add(&self.name, records).await
    }

    /// Nearest-neighbour query, ascending by distance.
    pub async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        self.store.query(&self.name, embedding, top_k).await
    }

    /// Number of stored records.
    pub async fn count(&self) -> Result<usize> {
        self.store.count(&self.name).await
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("metric", &self.store.metric())
            .finish()
    }
}

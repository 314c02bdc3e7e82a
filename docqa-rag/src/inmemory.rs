//! In-memory vector store with exhaustive nearest-neighbour search.
//!
//! This module provides [`InMemoryVectorStore`], a store backed by a
//! `HashMap` protected by a `tokio::sync::RwLock`. State lives for the
//! lifetime of the process only.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{EmbeddingRecord, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::{DistanceMetric, VectorStore};

const BACKEND: &str = "InMemory";

/// Records of one collection, kept in insertion order.
#[derive(Debug, Default)]
struct CollectionData {
    dimensions: usize,
    records: Vec<EmbeddingRecord>,
    ids: HashSet<String>,
}

/// An in-memory vector store.
///
/// Collections are stored as collection name → records. Every write takes
/// the store-wide write lock, so concurrent writers never interleave within
/// a single `add` or `reset_collection` call.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("docs", 256).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    metric: DistanceMetric,
    collections: RwLock<HashMap<String, CollectionData>>,
}

impl InMemoryVectorStore {
    /// Create a new empty store using squared L2 distance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty store using the given distance metric.
    pub fn with_metric(metric: DistanceMetric) -> Self {
        Self { metric, collections: RwLock::default() }
    }
}

fn missing(collection: &str) -> RagError {
    RagError::VectorStoreError {
        backend: BACKEND.to_string(),
        message: format!("collection '{collection}' does not exist"),
    }
}

fn dimension_mismatch(collection: &str, expected: usize, actual: usize) -> RagError {
    RagError::VectorStoreError {
        backend: BACKEND.to_string(),
        message: format!(
            "collection '{collection}' holds {expected}-dimensional vectors, got {actual}"
        ),
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections
            .entry(name.to_string())
            .or_insert_with(|| CollectionData { dimensions, ..CollectionData::default() });
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.remove(name);
        Ok(())
    }

    async fn reset_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.remove(name);
        collections
            .insert(name.to_string(), CollectionData { dimensions, ..CollectionData::default() });
        Ok(())
    }

    async fn add(&self, collection: &str, records: &[EmbeddingRecord]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let data = collections.get_mut(collection).ok_or_else(|| missing(collection))?;

        let mut dimensions = data.dimensions;
        let mut batch_ids = HashSet::with_capacity(records.len());
        for record in records {
            if dimensions == 0 {
                dimensions = record.embedding.len();
            }
            if record.embedding.len() != dimensions {
                return Err(dimension_mismatch(collection, dimensions, record.embedding.len()));
            }
            if data.ids.contains(&record.id) || !batch_ids.insert(record.id.as_str()) {
                return Err(RagError::DuplicateIdError {
                    collection: collection.to_string(),
                    id: record.id.clone(),
                });
            }
        }

        data.dimensions = dimensions;
        for record in records {
            data.ids.insert(record.id.clone());
            data.records.push(record.clone());
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let collections = self.collections.read().await;
        let data = collections.get(collection).ok_or_else(|| missing(collection))?;
        if data.records.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        if embedding.len() != data.dimensions {
            return Err(dimension_mismatch(collection, data.dimensions, embedding.len()));
        }

        let mut scored: Vec<SearchResult> = data
            .records
            .iter()
            .map(|record| SearchResult {
                id: record.id.clone(),
                text: record.text.clone(),
                distance: self.metric.distance(&record.embedding, embedding),
                metadata: record.metadata.clone(),
            })
            .collect();

        // Stable sort: equal distances keep insertion order.
        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read().await;
        collections.get(collection).map(|data| data.records.len()).ok_or_else(|| missing(collection))
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }
}

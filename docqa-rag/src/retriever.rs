//! Query-time retrieval with a relevance sufficiency gate.
//!
//! The gate refuses to produce evidence when even the closest stored chunk
//! is farther from the question than the configured threshold, so that the
//! generator is never asked to answer from its own prior knowledge.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::document::SearchResult;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::timeout::with_timeout;
use crate::vectorstore::Collection;

/// One retrieved chunk, in retrieval rank order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// The chunk text.
    pub text: String,
    /// Filename of the source document.
    pub filename: String,
    /// Record identifier of the chunk.
    pub id: String,
    /// Distance to the question embedding.
    pub distance: f32,
}

impl From<SearchResult> for Evidence {
    fn from(result: SearchResult) -> Self {
        Self {
            text: result.text,
            filename: result.metadata.filename,
            id: result.id,
            distance: result.distance,
        }
    }
}

/// Outcome of the sufficiency gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Retrieval {
    /// Chunks close enough to ground an answer, most relevant first.
    Evidence(Vec<Evidence>),
    /// Nothing in the collection is close enough to the question.
    Insufficient,
}

impl Retrieval {
    /// Apply the gate to ranked search results.
    ///
    /// Returns [`Retrieval::Insufficient`] when `results` is empty or the
    /// smallest distance exceeds `threshold`. Results at infinite distance
    /// (zero-vector embeddings) are never evidence.
    pub fn gate(results: Vec<SearchResult>, threshold: f32) -> Self {
        let min_distance = results.iter().map(|r| r.distance).reduce(f32::min);
        match min_distance {
            Some(min) if min <= threshold => Self::Evidence(
                results
                    .into_iter()
                    .filter(|r| r.distance.is_finite())
                    .map(Evidence::from)
                    .collect(),
            ),
            _ => Self::Insufficient,
        }
    }

    /// Whether the gate let evidence through.
    pub fn is_sufficient(&self) -> bool {
        matches!(self, Self::Evidence(_))
    }
}

/// Embeds questions and queries a collection through the sufficiency gate.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    threshold: f32,
    embed_timeout: Option<Duration>,
}

impl Retriever {
    /// Create a retriever with the given relevance threshold.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, threshold: f32) -> Self {
        Self { embedder, threshold, embed_timeout: None }
    }

    /// Bound the time spent embedding the question.
    pub fn with_embed_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.embed_timeout = timeout;
        self
    }

    /// The relevance threshold in the store's distance units.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Retrieve up to `top_k` chunks for `question` and gate them.
    ///
    /// # Errors
    ///
    /// Returns [`EmbeddingError`](crate::RagError::EmbeddingError) or
    /// [`TimeoutError`](crate::RagError::TimeoutError) if the question
    /// cannot be embedded, and vector store errors from the query.
    pub async fn retrieve(
        &self,
        collection: &Collection,
        question: &str,
        top_k: usize,
    ) -> Result<Retrieval> {
        let query_embedding =
            with_timeout("embedding", self.embed_timeout, self.embedder.embed(question)).await?;
        let results = collection.query(&query_embedding, top_k).await?;

        let min_distance = results.first().map(|r| r.distance);
        debug!(
            collection = collection.name(),
            result_count = results.len(),
            ?min_distance,
            threshold = self.threshold,
            "retrieved candidates"
        );

        let retrieval = Retrieval::gate(results, self.threshold);
        if !retrieval.is_sufficient() {
            info!(collection = collection.name(), ?min_distance, "no sufficiently relevant chunk");
        }
        Ok(retrieval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ChunkMetadata;

    fn result(id: &str, distance: f32) -> SearchResult {
        SearchResult {
            id: id.to_string(),
            text: format!("text of {id}"),
            distance,
            metadata: ChunkMetadata {
                filename: "a.txt".to_string(),
                chunk_index: 0,
                chunk_size: 10,
            },
        }
    }

    #[test]
    fn empty_results_are_insufficient() {
        assert_eq!(Retrieval::gate(Vec::new(), 1.5), Retrieval::Insufficient);
    }

    #[test]
    fn distance_at_threshold_is_sufficient() {
        let retrieval = Retrieval::gate(vec![result("a", 1.5)], 1.5);
        assert!(retrieval.is_sufficient());
    }

    #[test]
    fn all_distances_above_threshold_are_insufficient() {
        let retrieval = Retrieval::gate(vec![result("a", 1.6), result("b", 1.9)], 1.5);
        assert_eq!(retrieval, Retrieval::Insufficient);
    }

    #[test]
    fn evidence_keeps_rank_order_including_far_chunks() {
        let retrieval = Retrieval::gate(vec![result("a", 0.4), result("b", 1.8)], 1.5);
        let Retrieval::Evidence(evidence) = retrieval else {
            panic!("expected evidence");
        };
        let ids: Vec<&str> = evidence.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(evidence[0].filename, "a.txt");
    }

    #[test]
    fn infinitely_distant_results_are_dropped() {
        assert_eq!(Retrieval::gate(vec![result("a", f32::INFINITY)], 1.5), Retrieval::Insufficient);

        let retrieval = Retrieval::gate(vec![result("a", 0.4), result("b", f32::INFINITY)], 1.5);
        let Retrieval::Evidence(evidence) = retrieval else {
            panic!("expected evidence");
        };
        assert_eq!(evidence.len(), 1);
        assert_eq!(evidence[0].id, "a");
    }
}

//! Data types for documents, chunks, embedding records, and search results.

use serde::{Deserialize, Serialize};

/// A converted document, keyed by its filename within a collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// The uploaded filename. Unique within a collection.
    pub filename: String,
    /// The converted plain or markdown text.
    pub text: String,
}

impl Document {
    /// Create a document from a filename and its converted text.
    pub fn new(filename: impl Into<String>, text: impl Into<String>) -> Self {
        Self { filename: filename.into(), text: text.into() }
    }
}

/// A contiguous slice of a [`Document`] used as the unit of retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Record identifier, see [`record_id`].
    pub id: String,
    /// Filename of the owning document.
    pub filename: String,
    /// Ordinal position of this chunk within the document.
    pub index: usize,
    /// Byte offset of the chunk text within the document text.
    pub start: usize,
    /// The chunk text.
    pub text: String,
}

impl Chunk {
    /// Length of the chunk text in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Metadata stored alongside this chunk's embedding.
    pub fn metadata(&self) -> ChunkMetadata {
        ChunkMetadata {
            filename: self.filename.clone(),
            chunk_index: self.index,
            chunk_size: self.char_len(),
        }
    }
}

/// Metadata kept with every [`EmbeddingRecord`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkMetadata {
    /// Filename of the source document.
    pub filename: String,
    /// Ordinal position of the chunk within its document.
    pub chunk_index: usize,
    /// Chunk length in characters.
    pub chunk_size: usize,
}

/// One stored vector together with the chunk it was computed from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingRecord {
    /// Unique identifier within a collection.
    pub id: String,
    /// The embedding vector.
    pub embedding: Vec<f32>,
    /// The chunk text.
    pub text: String,
    /// Source metadata.
    pub metadata: ChunkMetadata,
}

impl EmbeddingRecord {
    /// Pair a chunk with its embedding.
    pub fn from_chunk(chunk: &Chunk, embedding: Vec<f32>) -> Self {
        Self {
            id: chunk.id.clone(),
            embedding,
            text: chunk.text.clone(),
            metadata: chunk.metadata(),
        }
    }
}

/// A stored record returned by a nearest-neighbour query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The record identifier.
    pub id: String,
    /// The chunk text.
    pub text: String,
    /// Distance to the query vector (lower is more similar).
    pub distance: f32,
    /// Source metadata.
    pub metadata: ChunkMetadata,
}

/// Build the deterministic record identifier for a chunk.
///
/// ```
/// assert_eq!(docqa_rag::record_id("notes.txt", 3), "notes.txt_chunk_3");
/// ```
pub fn record_id(filename: &str, chunk_index: usize) -> String {
    format!("{filename}_chunk_{chunk_index}")
}

/// Recover the filename part of a record identifier.
pub(crate) fn filename_from_record_id(id: &str) -> Option<&str> {
    id.rsplit_once("_chunk_").map(|(filename, _)| filename).filter(|f| !f.is_empty())
}

//! Document chunking.
//!
//! [`RecursiveChunker`] splits text on the highest-priority separator that
//! occurs in it (paragraph break, line break, space, then single characters),
//! recursing into pieces that are still too large, and merges the resulting
//! pieces back into chunks of at most `chunk_size` characters that overlap
//! their predecessor by up to `chunk_overlap` characters.

use std::collections::VecDeque;
use std::ops::Range;

use crate::config::RagConfig;
use crate::document::{Chunk, Document, record_id};

/// Separators tried in priority order. The empty separator splits into
/// single characters and always applies.
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s without embeddings; those are computed
/// later by the pipeline.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has no non-whitespace text.
    /// No returned chunk is empty.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Splits text recursively by a prioritised list of separators.
///
/// Chunk IDs are generated as `{filename}_chunk_{index}`. Chunk text is
/// trimmed of surrounding whitespace, so consecutive chunks reconstruct the
/// source up to whitespace at chunk boundaries.
///
/// # Example
///
/// ```rust
/// use docqa_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(12, 6);
/// let chunks: Vec<&str> =
///     chunker.split("alpha beta gamma delta epsilon").map(|(_, text)| text).collect();
/// assert_eq!(chunks, ["alpha beta", "beta gamma", "gamma delta", "epsilon"]);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker` using [`DEFAULT_SEPARATORS`].
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Create a chunker from the chunk settings of a [`RagConfig`].
    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Replace the separator priority list.
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators = separators.into_iter().map(Into::into).collect();
        self
    }

    /// Split `text` into chunks, yielding `(byte_offset, chunk_text)` pairs.
    ///
    /// The returned iterator borrows from `text` and can be cloned to
    /// restart it.
    pub fn split<'a>(&self, text: &'a str) -> TextChunks<'a> {
        let splitter = Splitter {
            text,
            chunk_size: self.chunk_size.max(1),
            chunk_overlap: self.chunk_overlap,
        };
        let mut spans = Vec::new();
        splitter.split(0..text.len(), &self.separators, &mut spans);
        TextChunks { text, spans: spans.into_iter() }
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        self.split(&document.text)
            .enumerate()
            .map(|(index, (start, text))| Chunk {
                id: record_id(&document.filename, index),
                filename: document.filename.clone(),
                index,
                start,
                text: text.to_string(),
            })
            .collect()
    }
}

/// Chunks of one text, in document order.
#[derive(Debug, Clone)]
pub struct TextChunks<'a> {
    text: &'a str,
    spans: std::vec::IntoIter<Range<usize>>,
}

impl<'a> Iterator for TextChunks<'a> {
    type Item = (usize, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        let span = self.spans.next()?;
        Some((span.start, &self.text[span]))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.spans.size_hint()
    }
}

impl ExactSizeIterator for TextChunks<'_> {}

/// Working state for one split call. All spans are byte ranges into `text`.
struct Splitter<'a> {
    text: &'a str,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Splitter<'_> {
    fn split(&self, span: Range<usize>, separators: &[String], out: &mut Vec<Range<usize>>) {
        let piece = &self.text[span.clone()];
        let (separator, remaining) = choose_separator(piece, separators);

        let mut fitting: Vec<Range<usize>> = Vec::new();
        for split in split_keeping_separator(piece, separator) {
            let split = (split.start + span.start)..(split.end + span.start);
            if char_len(&self.text[split.clone()]) < self.chunk_size {
                fitting.push(split);
                continue;
            }

            if !fitting.is_empty() {
                self.merge(&fitting, out);
                fitting.clear();
            }
            if remaining.is_empty() {
                self.push_trimmed(split, out);
            } else {
                self.split(split, remaining, out);
            }
        }

        if !fitting.is_empty() {
            self.merge(&fitting, out);
        }
    }

    /// Merge consecutive small splits into chunks, carrying up to
    /// `chunk_overlap` characters of the previous chunk into the next.
    fn merge(&self, splits: &[Range<usize>], out: &mut Vec<Range<usize>>) {
        let mut current: VecDeque<(Range<usize>, usize)> = VecDeque::new();
        let mut total = 0;

        for split in splits {
            let len = char_len(&self.text[split.clone()]);
            if total + len > self.chunk_size && !current.is_empty() {
                self.push_joined(&current, out);
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match current.pop_front() {
                        Some((_, popped)) => total -= popped,
                        None => break,
                    }
                }
            }
            current.push_back((split.clone(), len));
            total += len;
        }

        self.push_joined(&current, out);
    }

    fn push_joined(&self, current: &VecDeque<(Range<usize>, usize)>, out: &mut Vec<Range<usize>>) {
        if let (Some((first, _)), Some((last, _))) = (current.front(), current.back()) {
            self.push_trimmed(first.start..last.end, out);
        }
    }

    fn push_trimmed(&self, span: Range<usize>, out: &mut Vec<Range<usize>>) {
        let raw = &self.text[span.clone()];
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return;
        }
        let start = span.start + (raw.len() - raw.trim_start().len());
        out.push(start..start + trimmed.len());
    }
}

/// Pick the first separator present in `piece` and the separators left to
/// try on pieces that are still too large.
fn choose_separator<'s>(piece: &str, separators: &'s [String]) -> (&'s str, &'s [String]) {
    for (i, separator) in separators.iter().enumerate() {
        if separator.is_empty() {
            return ("", &[]);
        }
        if piece.contains(separator.as_str()) {
            return (separator.as_str(), &separators[i + 1..]);
        }
    }
    (separators.last().map(String::as_str).unwrap_or(""), &[])
}

/// Split text at a separator, attaching each separator to the segment that
/// follows it. Returns non-empty byte ranges relative to `text`.
fn split_keeping_separator(text: &str, separator: &str) -> Vec<Range<usize>> {
    if separator.is_empty() {
        return text.char_indices().map(|(i, c)| i..i + c.len_utf8()).collect();
    }

    let mut result = Vec::new();
    let mut start = 0;
    for (pos, _) in text.match_indices(separator) {
        if pos > start {
            result.push(start..pos);
        }
        start = pos;
    }
    if start < text.len() {
        result.push(start..text.len());
    }
    result
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

//! Per-session memory: bounded question history and processed documents.
//!
//! [`SessionState`] is owned by the calling layer (one per user session) and
//! passed by reference into the pipeline. Nothing here is persisted.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pipeline::{BatchResult, DocumentStats};

/// Default number of history entries kept.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// One answered question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// The question as asked.
    pub question: String,
    /// The answer shown to the user.
    pub answer: String,
    /// Source label of the answer.
    pub source: String,
    /// When the answer was recorded.
    pub timestamp: DateTime<Utc>,
}

/// State of one user session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    capacity: usize,
    history: VecDeque<HistoryEntry>,
    documents: Vec<DocumentStats>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl SessionState {
    /// Create an empty session keeping the default number of entries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty session keeping at most `capacity` entries (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { capacity, history: VecDeque::with_capacity(capacity), documents: Vec::new() }
    }

    /// Record an answered question, newest first, evicting the oldest entries
    /// beyond capacity.
    pub fn record(
        &mut self,
        question: impl Into<String>,
        answer: impl Into<String>,
        source: impl Into<String>,
    ) {
        self.record_at(question, answer, source, Utc::now());
    }

    /// Like [`record`](Self::record) with an explicit timestamp.
    pub fn record_at(
        &mut self,
        question: impl Into<String>,
        answer: impl Into<String>,
        source: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) {
        self.history.push_front(HistoryEntry {
            question: question.into(),
            answer: answer.into(),
            source: source.into(),
            timestamp,
        });
        self.history.truncate(self.capacity);
    }

    /// History entries, newest first.
    pub fn history(&self) -> impl ExactSizeIterator<Item = &HistoryEntry> {
        self.history.iter()
    }

    /// Number of history entries.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Maximum number of history entries kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Forget all history entries.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Remember the documents that were ingested by the latest batch.
    pub fn set_documents(&mut self, batch: &BatchResult) {
        self.documents = batch.succeeded.clone();
    }

    /// Statistics of the documents from the latest batch.
    pub fn documents(&self) -> &[DocumentStats] {
        &self.documents
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_ten_newest_entries_newest_first() {
        let mut session = SessionState::new();
        for i in 1..=15 {
            session.record(format!("q{i}"), format!("a{i}"), "doc.txt");
        }

        assert_eq!(session.history_len(), 10);
        let questions: Vec<&str> = session.history().map(|e| e.question.as_str()).collect();
        let expected: Vec<String> = (6..=15).rev().map(|i| format!("q{i}")).collect();
        assert_eq!(questions, expected);
    }

    #[test]
    fn capacity_is_at_least_one() {
        let mut session = SessionState::with_capacity(0);
        session.record("q1", "a1", "s");
        session.record("q2", "a2", "s");
        assert_eq!(session.capacity(), 1);
        assert_eq!(session.history().next().map(|e| e.question.as_str()), Some("q2"));
    }

    #[test]
    fn record_at_keeps_timestamp() {
        let mut session = SessionState::new();
        let at = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        session.record_at("q", "a", "s", at);
        assert_eq!(session.history().next().unwrap().timestamp, at);
        session.clear_history();
        assert_eq!(session.history_len(), 0);
    }
}

//! Executed-command history, most-recent-first.
//!
//! The store is owned by the UI context and mutated directly; it is
//! independent of the catalog and survives rebuilds. Search results
//! from this store keep its recency order verbatim.

use crate::Result;
use crate::token::{TokenLabel, TokenSequence};
use crate::utils::now_millis;
use quiver_types::{Candidate, CandidateSource};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// One executed command: the token sequence plus its canonical text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub tokens: TokenSequence,
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryFile {
    version: u32,
    saved_at: u64,
    records: Vec<HistoryRecord>,
}

/// Ordered list of previously executed token sequences.
#[derive(Debug, Default)]
pub struct HistoryStore {
    records: Vec<HistoryRecord>,
    max_items: usize,
}

impl HistoryStore {
    #[must_use]
    pub fn new(max_items: usize) -> Self {
        Self {
            records: Vec::new(),
            max_items,
        }
    }

    /// Load history from file. Missing or corrupt files yield an
    /// empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn load(path: &Path, max_items: usize) -> Result<Self> {
        if !path.exists() {
            debug!("History file not found at {}", path.display());
            return Ok(Self::new(max_items));
        }

        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str::<HistoryFile>(&content) {
            Ok(file) => {
                debug!("Loaded {} history records", file.records.len());
                let mut store = Self {
                    records: file.records,
                    max_items,
                };
                store.records.truncate(max_items);
                Ok(store)
            }
            Err(e) => {
                warn!(
                    "Failed to parse history {} (line {}): starting empty",
                    path.display(),
                    e.line()
                );
                Ok(Self::new(max_items))
            }
        }
    }

    /// Save history to file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = HistoryFile {
            version: 1,
            saved_at: now_millis(),
            records: self.records.clone(),
        };
        std::fs::write(path, serde_json::to_string(&file)?)?;
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append history candidates matching the query, preserving the
    /// store's most-recent-first order. An empty query matches every
    /// record. No re-sort is ever applied here; for history, source
    /// order is authoritative.
    pub fn search(&self, query_lower: &str, out: &mut Vec<Candidate>) {
        for (index, record) in self.records.iter().enumerate() {
            if !query_lower.is_empty() && !record.text.to_lowercase().contains(query_lower) {
                continue;
            }

            let (short_name, full_path) = match record.tokens.first().and_then(|t| t.top_result()) {
                Some(top) => (top.short_name.clone(), top.full_path.clone()),
                None => (record.text.clone(), record.text.clone()),
            };

            let mut candidate =
                Candidate::new(&short_name, &full_path, CandidateSource::History { index });
            candidate.name = record.text.clone();
            out.push(candidate);
        }
    }

    /// Record an executed sequence at the front, deduplicating by
    /// canonical text and enforcing the store cap. The first token is
    /// labeled `History` so a recalled record re-enters history mode.
    pub fn add_item(&mut self, tokens: &TokenSequence, separator: &str) {
        if tokens.is_empty() {
            return;
        }

        let text = tokens.to_string(false, separator);
        self.records.retain(|r| r.text != text);

        let mut tokens = tokens.clone();
        if let Some(first_token) = tokens.first_mut() {
            first_token.set_label(TokenLabel::History);
        }

        self.records.insert(0, HistoryRecord { tokens, text });
        self.records.truncate(self.max_items);
    }

    /// Get a stored sequence by store index.
    #[must_use]
    pub fn get_item(&self, index: usize) -> Option<&TokenSequence> {
        self.records.get(index).map(|r| &r.tokens)
    }

    /// Remove a record by store index; out-of-range is a no-op.
    pub fn remove_at(&mut self, index: usize) {
        if index < self.records.len() {
            self.records.remove(index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEP: &str = " | ";

    fn store_with(texts: &[&str]) -> HistoryStore {
        let mut store = HistoryStore::new(100);
        for text in texts {
            let tokens = TokenSequence::parse(text, SEP);
            store.add_item(&tokens, SEP);
        }
        store
    }

    #[test]
    fn test_add_item_most_recent_first() {
        let store = store_with(&["alpha", "beta"]);
        let mut out = Vec::new();
        store.search("", &mut out);
        assert_eq!(out[0].name, "beta");
        assert_eq!(out[1].name, "alpha");
    }

    #[test]
    fn test_add_item_dedupes_by_text() {
        let store = store_with(&["alpha", "beta", "alpha"]);
        assert_eq!(store.len(), 2);
        let mut out = Vec::new();
        store.search("", &mut out);
        assert_eq!(out[0].name, "alpha");
    }

    #[test]
    fn test_add_item_enforces_cap() {
        let mut store = HistoryStore::new(2);
        for text in ["a", "b", "c"] {
            store.add_item(&TokenSequence::parse(text, SEP), SEP);
        }
        assert_eq!(store.len(), 2);
        assert!(store.get_item(0).is_some());
    }

    #[test]
    fn test_add_item_labels_first_token_history() {
        let store = store_with(&["editor | notes"]);
        let tokens = store.get_item(0).unwrap();
        assert!(tokens.first().unwrap().has_label(TokenLabel::History));
    }

    #[test]
    fn test_search_preserves_store_order() {
        let store = store_with(&["make", "make dist", "cmake"]);
        let mut out = Vec::new();
        store.search("make", &mut out);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].name, "cmake");
        assert_eq!(out[1].name, "make dist");
        assert_eq!(out[2].name, "make");
    }

    #[test]
    fn test_search_carries_store_index() {
        let store = store_with(&["alpha", "beta"]);
        let mut out = Vec::new();
        store.search("alpha", &mut out);
        assert_eq!(out.len(), 1);
        assert!(matches!(
            out[0].source,
            CandidateSource::History { index: 1 }
        ));
    }

    #[test]
    fn test_remove_at_out_of_range_is_noop() {
        let mut store = store_with(&["alpha"]);
        store.remove_at(5);
        assert_eq!(store.len(), 1);
        store.remove_at(0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_empty_sequence_is_not_recorded() {
        let mut store = HistoryStore::new(10);
        store.add_item(&TokenSequence::parse("", SEP), SEP);
        assert!(store.is_empty());
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("history.json");

        let store = store_with(&["alpha", "beta"]);
        store.save(&path).unwrap();

        let loaded = HistoryStore::load(&path, 100).unwrap();
        assert_eq!(loaded.len(), 2);
        let mut out = Vec::new();
        loaded.search("", &mut out);
        assert_eq!(out[0].name, "beta");
    }

    #[test]
    fn test_load_missing_file_returns_empty() {
        let temp = tempfile::tempdir().unwrap();
        let store = HistoryStore::load(&temp.path().join("history.json"), 100).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_corrupt_file_returns_empty() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("history.json");
        std::fs::write(&path, "[[[").unwrap();
        let store = HistoryStore::load(&path, 100).unwrap();
        assert!(store.is_empty());
    }
}

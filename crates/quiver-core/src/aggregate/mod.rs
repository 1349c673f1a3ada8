//! Result aggregation: one merged, ranked candidate list per token
//! sequence, drawn from history, catalog, plugins, and filesystem.

use crate::catalog::CatalogHandle;
use crate::files;
use crate::history::HistoryStore;
use crate::plugin::PluginRegistry;
use crate::search::SearchEngine;
use crate::token::{TokenLabel, TokenSequence};
use quiver_types::Candidate;
use tracing::debug;

/// Merges and ranks results from all sources. Aggregation never
/// fails: a source that errors contributes zero candidates.
pub struct Aggregator {
    engine: SearchEngine,
    max_results: usize,
}

impl Aggregator {
    #[must_use]
    pub fn new(max_results: usize) -> Self {
        Self {
            engine: SearchEngine::new(),
            max_results,
        }
    }

    /// Produce the ranked candidate list for the current sequence.
    ///
    /// The history-only path (history-labeled first token, or empty
    /// input) returns `history.search` output verbatim: for history,
    /// recency order is authoritative and no re-sort is applied.
    /// Every other path merges catalog and plugin results, stable-
    /// sorts by (match quality, usage, source order), promotes the
    /// recent choice recorded for this exact query text, and finally
    /// appends filesystem matches when the text looks like a path.
    pub fn aggregate(
        &mut self,
        tokens: &mut TokenSequence,
        raw_text: &str,
        catalog: &CatalogHandle,
        history: &HistoryStore,
        plugins: &PluginRegistry,
    ) -> Vec<Candidate> {
        let search_text = tokens.live_text().to_string();
        let search_lower = search_text.to_lowercase();
        let mut results = Vec::new();

        let history_mode = tokens
            .first()
            .is_some_and(|t| t.has_label(TokenLabel::History));
        if history_mode || raw_text.is_empty() {
            debug!("Searching history for '{}'", search_text);
            history.search(&search_lower, &mut results);
            return results;
        }

        if tokens.len() == 1 {
            debug!("Searching catalog for '{}'", search_text);
            results = catalog.search(&search_lower, &mut self.engine);
            if let (Some(top), Some(token)) = (results.first().cloned(), tokens.last_mut()) {
                token.set_top_result(top);
            }
        }

        plugins.get_labels(tokens);
        plugins.get_results(tokens, &mut results);

        self.engine.rank(&search_lower, &mut results);
        catalog.promote_recently_used(&raw_text.to_lowercase(), &mut results);

        if files::looks_like_path(&search_text) {
            files::search(&search_text, &mut results, tokens);
        }

        results.truncate(self.max_results);
        results
    }
}

//! Indexed item set and the versioned handle the UI context reads
//! through while a rebuild constructs a replacement off-thread.

use crate::Result;
use crate::search::SearchEngine;
use quiver_types::{Candidate, CandidateSource};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One indexed launchable item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub short_name: String,
    pub low_name: String,
    pub full_path: String,

    /// Launch count; goes negative when the user demotes the item
    #[serde(default)]
    pub usage: i32,
}

/// The command the user actually picked for a given query text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentChoice {
    pub low_name: String,
    pub full_path: String,
}

/// Complete indexed item set plus per-query recent choices.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    items: Vec<CatalogItem>,

    /// Lowercased query text -> the command last executed for it
    #[serde(default)]
    recent: HashMap<String, RecentChoice>,
}

impl Catalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_item(&mut self, short_name: &str, full_path: &str) {
        self.items.push(CatalogItem {
            short_name: short_name.to_string(),
            low_name: short_name.to_lowercase(),
            full_path: full_path.to_string(),
            usage: 0,
        });
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Load a catalog from file. A missing file yields an empty
    /// catalog; a file that fails to parse is reported and replaced
    /// by an empty catalog so a corrupt cache never prevents startup.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("Catalog file not found at {}", path.display());
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str::<Self>(&content) {
            Ok(catalog) => {
                info!(
                    "Loaded catalog: {} items, {} recent choices",
                    catalog.items.len(),
                    catalog.recent.len()
                );
                Ok(catalog)
            }
            Err(e) => {
                warn!(
                    "Failed to parse catalog {} (line {}): starting empty",
                    path.display(),
                    e.line()
                );
                Ok(Self::new())
            }
        }
    }

    /// Save the catalog to file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string(self)?;
        std::fs::write(path, content)?;
        debug!("Saved catalog ({} items)", self.items.len());
        Ok(())
    }

    /// Carry usage counts and recent choices over from the catalog
    /// being replaced, matching items by full path. A rebuild must
    /// not forget what the user launches.
    pub fn adopt_stats(&mut self, old: &Self) {
        for item in &mut self.items {
            if let Some(prev) = old.items.iter().find(|o| o.full_path == item.full_path) {
                item.usage = prev.usage;
            }
        }
        for (query, choice) in &old.recent {
            self.recent
                .entry(query.clone())
                .or_insert_with(|| choice.clone());
        }
    }

    fn search(&self, query_lower: &str, engine: &mut SearchEngine) -> Vec<Candidate> {
        let mut results: Vec<Candidate> = self
            .items
            .iter()
            .filter(|item| engine.match_quality(query_lower, &item.low_name).is_some())
            .map(|item| {
                let mut c = Candidate::new(&item.short_name, &item.full_path, CandidateSource::Catalog);
                c.usage = item.usage;
                c
            })
            .collect();

        engine.rank(query_lower, &mut results);
        results
    }

    fn find_mut(&mut self, full_path: &str) -> Option<&mut CatalogItem> {
        self.items.iter_mut().find(|i| i.full_path == full_path)
    }
}

/// Shared, versioned reference to the indexed item set.
///
/// The UI context reads through `Arc` snapshots; the rebuild worker
/// builds a complete new `Catalog` privately and `install` publishes
/// it whole. Usage mutations go through `Arc::make_mut`, so a stale
/// snapshot held by an in-flight read stays valid until dropped.
#[derive(Debug, Clone)]
pub struct CatalogHandle {
    inner: Arc<Catalog>,
    version: u64,
}

impl CatalogHandle {
    #[must_use]
    pub fn new(catalog: Catalog) -> Self {
        Self {
            inner: Arc::new(catalog),
            version: 0,
        }
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<Catalog> {
        Arc::clone(&self.inner)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Search the catalog, best match first.
    #[must_use]
    pub fn search(&self, query_lower: &str, engine: &mut SearchEngine) -> Vec<Candidate> {
        self.inner.search(query_lower, engine)
    }

    /// Atomically swap in a freshly built catalog, carrying usage
    /// counts and recent choices over from the one it replaces.
    pub fn install(&mut self, mut new_catalog: Catalog) {
        new_catalog.adopt_stats(&self.inner);
        self.inner = Arc::new(new_catalog);
        self.version += 1;
        info!(
            "Installed catalog v{} ({} items)",
            self.version,
            self.inner.len()
        );
    }

    pub fn increment_usage(&mut self, candidate: &Candidate) {
        if let Some(item) = Arc::make_mut(&mut self.inner).find_mut(&candidate.full_path) {
            item.usage = item.usage.saturating_add(1);
        }
    }

    /// Lower an item's future rank. A first demotion cancels any
    /// accumulated usage; repeated demotions go negative so the item
    /// sinks below never-used entries.
    pub fn demote_item(&mut self, candidate: &Candidate) {
        if let Some(item) = Arc::make_mut(&mut self.inner).find_mut(&candidate.full_path) {
            item.usage = if item.usage > 0 { 0 } else { item.usage - 1 };
            debug!("Demoted {} to usage {}", item.short_name, item.usage);
        }
    }

    /// Remember which command the user executed for this query text.
    pub fn record_recent_choice(&mut self, query_lower: &str, candidate: &Candidate) {
        Arc::make_mut(&mut self.inner).recent.insert(
            query_lower.to_string(),
            RecentChoice {
                low_name: candidate.low_name.clone(),
                full_path: candidate.full_path.clone(),
            },
        );
    }

    /// Move the candidate previously executed for this exact query
    /// text to the front, leaving the relative order of the rest
    /// untouched.
    pub fn promote_recently_used(&self, query_lower: &str, results: &mut Vec<Candidate>) {
        let Some(choice) = self.inner.recent.get(query_lower) else {
            return;
        };
        if let Some(pos) = results
            .iter()
            .position(|c| c.full_path == choice.full_path)
            && pos > 0
        {
            let promoted = results.remove(pos);
            results.insert(0, promoted);
        }
    }

    /// Persist the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.inner.save(path)
    }
}

/// Collaborator that enumerates launchable items from scratch.
/// The core never walks the filesystem itself; it only schedules
/// `build` on a worker and reports the progress it emits.
pub trait CatalogBuilder: Send {
    /// Build a complete catalog, reporting percentage progress
    /// through the callback.
    ///
    /// # Errors
    ///
    /// Returns an error when the item set cannot be enumerated; the
    /// previous catalog stays authoritative in that case.
    fn build(&mut self, progress: &mut dyn FnMut(u8)) -> Result<Catalog>;
}

/// Builder that produces an empty catalog; the default when a host
/// wires no indexing collaborator.
pub struct EmptyCatalogBuilder;

impl CatalogBuilder for EmptyCatalogBuilder {
    fn build(&mut self, progress: &mut dyn FnMut(u8)) -> Result<Catalog> {
        progress(100);
        Ok(Catalog::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.add_item("Firefox", "/usr/bin/firefox");
        catalog.add_item("FileZilla", "/usr/bin/filezilla");
        catalog.add_item("Terminal", "/usr/bin/terminal");
        catalog
    }

    #[test]
    fn test_search_prefix_ranks_first() {
        let handle = CatalogHandle::new(make_catalog());
        let mut engine = SearchEngine::new();
        let results = handle.search("fire", &mut engine);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].short_name, "Firefox");
        assert_eq!(results[1].short_name, "FileZilla");
    }

    #[test]
    fn test_increment_usage_persists_in_handle() {
        let mut handle = CatalogHandle::new(make_catalog());
        let mut engine = SearchEngine::new();
        let results = handle.search("fire", &mut engine);

        handle.increment_usage(&results[0]);
        handle.increment_usage(&results[0]);

        let results = handle.search("fire", &mut engine);
        assert_eq!(results[0].usage, 2);
    }

    #[test]
    fn test_demote_cancels_usage_then_goes_negative() {
        let mut handle = CatalogHandle::new(make_catalog());
        let mut engine = SearchEngine::new();
        let top = handle.search("fire", &mut engine).remove(0);

        handle.increment_usage(&top);
        handle.demote_item(&top);
        assert_eq!(handle.search("fire", &mut engine)[0].usage.max(0), 0);

        handle.demote_item(&top);
        let results = handle.search("firefox", &mut engine);
        assert_eq!(results[0].usage, -1);
    }

    #[test]
    fn test_recent_choice_promotion_preserves_rest_order() {
        let mut handle = CatalogHandle::new(make_catalog());
        let mut engine = SearchEngine::new();
        let mut results = handle.search("f", &mut engine);
        let last = results.last().unwrap().clone();

        handle.record_recent_choice("f", &last);
        let first = results[0].clone();
        handle.promote_recently_used("f", &mut results);

        assert_eq!(results[0], last);
        assert_eq!(results[1], first);
    }

    #[test]
    fn test_promotion_without_record_is_noop() {
        let handle = CatalogHandle::new(make_catalog());
        let mut engine = SearchEngine::new();
        let mut results = handle.search("f", &mut engine);
        let before = results.clone();
        handle.promote_recently_used("f", &mut results);
        assert_eq!(results, before);
    }

    #[test]
    fn test_install_bumps_version_and_adopts_stats() {
        let mut handle = CatalogHandle::new(make_catalog());
        let mut engine = SearchEngine::new();
        let top = handle.search("fire", &mut engine).remove(0);
        handle.increment_usage(&top);
        handle.record_recent_choice("fire", &top);

        let mut rebuilt = Catalog::new();
        rebuilt.add_item("Firefox", "/usr/bin/firefox");
        rebuilt.add_item("Files", "/usr/bin/files");
        handle.install(rebuilt);

        assert_eq!(handle.version(), 1);
        let results = handle.search("firefox", &mut engine);
        assert_eq!(results[0].usage, 1, "usage carried over by path");

        let mut results = handle.search("fi", &mut engine);
        handle.promote_recently_used("fire", &mut results);
        assert_eq!(results[0].full_path, "/usr/bin/firefox");
    }

    #[test]
    fn test_old_snapshot_survives_install() {
        let mut handle = CatalogHandle::new(make_catalog());
        let old = handle.snapshot();
        handle.install(Catalog::new());

        assert_eq!(old.len(), 3, "in-flight read keeps the old handle alive");
        assert!(handle.is_empty());
    }

    #[test]
    fn test_load_missing_file_returns_empty() {
        let temp = tempfile::tempdir().unwrap();
        let catalog = Catalog::load(&temp.path().join("catalog.json")).unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_load_corrupt_file_returns_empty() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("catalog.json");
        std::fs::write(&path, "{ definitely not json").unwrap();
        let catalog = Catalog::load(&path).unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("catalog.json");

        let mut handle = CatalogHandle::new(make_catalog());
        let mut engine = SearchEngine::new();
        let top = handle.search("fire", &mut engine).remove(0);
        handle.increment_usage(&top);
        handle.save(&path).unwrap();

        let loaded = Catalog::load(&path).unwrap();
        assert_eq!(loaded.len(), 3);
        let loaded_handle = CatalogHandle::new(loaded);
        assert_eq!(loaded_handle.search("fire", &mut engine)[0].usage, 1);
    }

    #[test]
    fn test_empty_builder_reports_completion() {
        let mut builder = EmptyCatalogBuilder;
        let mut reported = Vec::new();
        let catalog = builder.build(&mut |p| reported.push(p)).unwrap();
        assert!(catalog.is_empty());
        assert_eq!(reported, vec![100]);
    }
}

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,
}

/// Search and presentation behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchConfig {
    /// Debounce delay before the drop-down appears; 0 shows immediately
    #[serde(default = "default_auto_suggest_delay")]
    pub auto_suggest_delay_ms: u64,

    /// Rows visible in the drop-down. A presentation hint for the
    /// front end sizing its list widget; the core never consults it.
    #[serde(default = "default_num_viewable")]
    pub num_viewable: usize,

    /// Cap on candidates kept after ranking
    #[serde(default = "default_max_results")]
    pub max_displayed_results: usize,

    /// Token separator inserted when a token is committed
    #[serde(default = "default_separator")]
    pub separator: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            auto_suggest_delay_ms: default_auto_suggest_delay(),
            num_viewable: default_num_viewable(),
            max_displayed_results: default_max_results(),
            separator: default_separator(),
        }
    }
}

/// Catalog maintenance behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogConfig {
    /// Minutes between periodic rebuilds; 0 disables the timer
    #[serde(default = "default_rebuild_interval")]
    pub rebuild_interval_min: u64,

    /// Cap on executed-command history records
    #[serde(default = "default_max_history")]
    pub max_history_items: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            rebuild_interval_min: default_rebuild_interval(),
            max_history_items: default_max_history(),
        }
    }
}

fn default_auto_suggest_delay() -> u64 {
    1000
}

fn default_num_viewable() -> usize {
    4
}

fn default_max_results() -> usize {
    100
}

fn default_separator() -> String {
    " | ".to_string()
}

fn default_rebuild_interval() -> u64 {
    10
}

fn default_max_history() -> usize {
    100
}

impl Config {
    /// Load config from file. A missing file yields defaults; a file
    /// that fails to parse is reported and replaced by defaults so a
    /// broken config never prevents startup.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!(
                    "Failed to parse config {} (line {}): using defaults",
                    path.display(),
                    e.line()
                );
                Ok(Self::default())
            }
        }
    }

    /// Save config to file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.search.auto_suggest_delay_ms, 1000);
        assert_eq!(config.search.num_viewable, 4);
        assert_eq!(config.search.max_displayed_results, 100);
        assert_eq!(config.search.separator, " | ");
        assert_eq!(config.catalog.rebuild_interval_min, 10);
        assert_eq!(config.catalog.max_history_items, 100);
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let config = Config::load(&temp.path().join("nope.json")).unwrap();
        assert_eq!(config.search.auto_suggest_delay_ms, 1000);
    }

    #[test]
    fn test_load_invalid_json_returns_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.search.num_viewable, 4);
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.json");

        let mut config = Config::default();
        config.search.auto_suggest_delay_ms = 250;
        config.catalog.rebuild_interval_min = 0;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.search.auto_suggest_delay_ms, 250);
        assert_eq!(loaded.catalog.rebuild_interval_min, 0);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.json");
        std::fs::write(&path, r#"{"search":{"autoSuggestDelayMs":0}}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.search.auto_suggest_delay_ms, 0);
        assert_eq!(config.search.num_viewable, 4);
        assert_eq!(config.catalog.rebuild_interval_min, 10);
    }
}

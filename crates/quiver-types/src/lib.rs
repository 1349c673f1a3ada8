//! Shared types for Quiver launcher components.
//!
//! This crate provides the data model exchanged between quiver-core
//! and its front ends: candidates, key events, and the updates the
//! core emits while resolving a query. All types are serializable so
//! a front end can live in another process.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Where a candidate came from.
///
/// History candidates carry an explicit store index instead of an
/// opaque pointer so a row can always be mapped back to the record
/// it represents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CandidateSource {
    /// Indexed catalog entry
    Catalog,

    /// Previously executed command; `index` points into the history store
    History { index: usize },

    /// Filesystem path match
    File,

    /// Supplied by a plugin
    Plugin { id: u32 },
}

/// One launchable/selectable item returned by a source for a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Stable identity, a hash of the full path
    pub id: u64,

    /// Display name
    pub name: String,

    /// Short name used when the candidate is committed into a token
    pub short_name: String,

    /// Lowercased short name, the text matched against queries
    pub low_name: String,

    /// Full path (or plugin-defined identifier)
    pub full_path: String,

    /// Source that produced this candidate
    pub source: CandidateSource,

    /// Launch count; negative after demotion
    pub usage: i32,
}

impl Candidate {
    /// Build a candidate from a short name and full path, deriving
    /// the id hash and lowercased name.
    #[must_use]
    pub fn new(short_name: &str, full_path: &str, source: CandidateSource) -> Self {
        Self {
            id: path_hash(full_path),
            name: short_name.to_string(),
            short_name: short_name.to_string(),
            low_name: short_name.to_lowercase(),
            full_path: full_path.to_string(),
            source,
            usage: 0,
        }
    }

    /// Whether this candidate is a history record.
    #[must_use]
    pub fn is_history(&self) -> bool {
        matches!(self.source, CandidateSource::History { .. })
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.full_path == other.full_path
    }
}

impl Eq for Candidate {}

/// Hash a full path into a stable candidate id.
#[must_use]
pub fn path_hash(full_path: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    full_path.hash(&mut hasher);
    hasher.finish()
}

/// A resolved icon. The core never rasterizes anything; an icon is a
/// theme name or an image path the front end knows how to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Icon {
    /// Theme icon name or absolute image path
    pub name: String,
}

impl Icon {
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

/// Non-character keys the completion state machine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Tab,
    BackTab,
    Enter,
    Escape,
    Down,
    Up,
    PageDown,
    PageUp,
    ShiftDelete,
}

/// Events sent from the front end to the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoreEvent {
    /// Input text changed (typing, paste, programmatic insert)
    QueryChanged { query: String },

    /// A non-character key was pressed
    KeyPressed { key: Key },

    /// The highlighted drop-down row changed
    RowSelected { index: usize },

    /// Launcher window became visible
    WindowShown,

    /// Launcher window was hidden externally
    WindowHidden,

    /// Explicit catalog rebuild request (menu, F5)
    RebuildRequested,
}

/// A text selection inside the input box, in char offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub start: usize,
    pub len: usize,
}

/// Updates sent from the core to the front end.
///
/// The core owns state and ordering, not pixels: every update names
/// the state change and leaves rendering to the receiver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoreUpdate {
    /// Replace the drop-down contents
    Results {
        candidates: Vec<Candidate>,
        reset_selection: bool,
    },

    /// Make the drop-down visible
    ShowList,

    /// Hide the drop-down and clear its selection
    HideList,

    /// Rewrite the input box text, optionally selecting a range
    SetInput {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        selection: Option<Selection>,
    },

    /// Set the output/preview label
    OutputText { text: String },

    /// Clear the output label and its icon
    ClearOutput,

    /// Icon for the output/preview item
    OutputIcon { icon: Icon },

    /// Clear only the output icon (the label stays; a replacement
    /// icon is on its way)
    ClearOutputIcon,

    /// Icon for a drop-down row
    RowIcon { index: usize, icon: Icon },

    /// Catalog rebuild progress (0 on start, 100 on completion)
    RebuildProgress { percent: u8 },

    /// Hide the launcher window
    HideWindow,

    /// A plugin asked for the options dialog
    ShowOptions,

    /// A plugin asked for a skin reload
    ReloadSkin,

    /// A plugin asked the application to exit
    Exit,
}

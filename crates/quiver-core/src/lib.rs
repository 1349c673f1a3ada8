//! Core query resolution engine for the Quiver launcher.
//!
//! The engine turns raw input text into a ranked candidate list and a
//! committed command: tokenizing on the separator, aggregating
//! catalog, history, plugin and filesystem sources, debouncing the
//! drop-down reveal, coordinating off-thread catalog rebuilds and
//! icon resolution, and accounting for every launch in usage counts
//! and history.

pub mod catalog;
pub mod config;
pub mod history;
pub mod icons;
pub mod plugin;
pub mod token;

// Exposed because `CatalogHandle::search` takes the engine - not
// part of the stable API
#[doc(hidden)]
pub mod search;

pub(crate) mod aggregate;
pub(crate) mod files;
pub(crate) mod present;
pub(crate) mod rebuild;
pub(crate) mod utils;

mod engine;
mod error;

#[cfg(test)]
mod tests;

pub use engine::{Collaborators, DetachedLauncher, ProgramLauncher, QuiverCore, WorkerEvent};
pub use error::{Error, Result};
pub use rebuild::RebuildEvent;

pub use quiver_types::*;

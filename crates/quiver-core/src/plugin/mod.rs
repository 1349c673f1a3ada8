//! Plugin capability interface and registry.
//!
//! Plugins are external collaborators: the core only knows the fixed
//! capability surface below. Registration order is iteration order
//! and thereby the final ranking tie-break among equal candidates.

use crate::Result;
use crate::token::TokenSequence;
use quiver_types::{Candidate, CandidateSource};
use tracing::warn;

/// What should happen after a plugin executed a candidate.
/// Mirrors the launcher's control actions: most plugins return
/// `Launch` and let the core hand the item to the program launcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginControl {
    /// Launch the candidate normally
    Launch,

    /// The plugin handled the action itself
    Handled,

    /// Exit the application
    Exit,

    /// Open the options dialog
    ShowOptions,

    /// Rebuild the catalog
    Rebuild,

    /// Reload the active skin
    ReloadSkin,
}

/// Fixed capability interface every loaded plugin implements.
pub trait Plugin {
    /// Stable plugin id, also used in `CandidateSource::Plugin`.
    fn id(&self) -> u32;

    fn name(&self) -> &str;

    /// Inspect the token sequence and optionally claim/relabel the
    /// active token.
    fn get_labels(&self, _tokens: &mut TokenSequence) {}

    /// Contribute candidates for the current sequence.
    ///
    /// # Errors
    ///
    /// May fail; a failing plugin contributes zero candidates and
    /// never aborts aggregation.
    fn get_results(&self, _tokens: &TokenSequence, _out: &mut Vec<Candidate>) -> Result<()> {
        Ok(())
    }

    /// Execute a candidate this plugin owns.
    ///
    /// # Errors
    ///
    /// May fail; the core logs and treats the launch as handled.
    fn execute(&self, _tokens: &TokenSequence, _candidate: &Candidate) -> Result<PluginControl> {
        Ok(PluginControl::Launch)
    }
}

/// Ordered set of loaded plugins.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plugin: Box<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Let every plugin relabel the sequence, in registration order.
    pub fn get_labels(&self, tokens: &mut TokenSequence) {
        for plugin in &self.plugins {
            plugin.get_labels(tokens);
        }
    }

    /// Collect candidates from every plugin, in registration order.
    /// A failing plugin is skipped with a warning.
    pub fn get_results(&self, tokens: &TokenSequence, out: &mut Vec<Candidate>) {
        for plugin in &self.plugins {
            if let Err(e) = plugin.get_results(tokens, out) {
                warn!("Plugin {} failed to produce results: {}", plugin.name(), e);
            }
        }
    }

    /// Dispatch execution to the plugin owning the candidate.
    /// Candidates nobody owns launch normally.
    pub fn execute(&self, tokens: &TokenSequence, candidate: &Candidate) -> PluginControl {
        let CandidateSource::Plugin { id } = candidate.source else {
            return PluginControl::Launch;
        };

        let Some(plugin) = self.plugins.iter().find(|p| p.id() == id) else {
            warn!("No plugin with id {} for {}", id, candidate.short_name);
            return PluginControl::Launch;
        };

        match plugin.execute(tokens, candidate) {
            Ok(control) => control,
            Err(e) => {
                warn!("Plugin {} failed to execute: {}", plugin.name(), e);
                PluginControl::Handled
            }
        }
    }
}

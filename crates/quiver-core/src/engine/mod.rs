//! Interactive query session engine.
//!
//! `QuiverCore` owns the launcher's interactive state: the token
//! sequence, the ranked candidate list, the drop-down visibility and
//! the output/preview item. It consumes `CoreEvent`s from a front
//! end, emits `CoreUpdate`s describing state changes, and hands slow
//! work (catalog rebuilds, icon resolution, the reveal debounce) to
//! background workers whose completions come back as `WorkerEvent`s.
//!
//! The engine itself is synchronous: the host drains the worker
//! channel and feeds each event into `handle_worker` on the same
//! context that calls `process`, so no state is ever shared across
//! threads.

mod process;

pub use process::{DetachedLauncher, ProgramLauncher};

use crate::Result;
use crate::aggregate::Aggregator;
use crate::catalog::{Catalog, CatalogBuilder, CatalogHandle, EmptyCatalogBuilder};
use crate::config::{Config, Directories};
use crate::history::HistoryStore;
use crate::icons::{IconEvent, IconPipeline, IconResolver, ThemeIconResolver};
use crate::plugin::{PluginControl, PluginRegistry};
use crate::present::DropTimer;
use crate::rebuild::{RebuildCoordinator, RebuildEvent};
use crate::token::{Token, TokenLabel, TokenSequence};
use quiver_types::{Candidate, CandidateSource, CoreEvent, CoreUpdate, Key, Selection};
use std::path::{MAIN_SEPARATOR, Path};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

/// Completions delivered by background workers. The host drains these
/// into [`QuiverCore::handle_worker`] on the UI context.
#[derive(Debug)]
pub enum WorkerEvent {
    /// The reveal debounce elapsed
    Debounce { generation: u64 },

    /// Rebuild progress or completion
    Rebuild(RebuildEvent),

    /// An icon resolution completed
    Icon(IconEvent),

    /// The periodic maintenance timer asked for a rebuild
    RebuildTick,
}

/// The host-supplied collaborators the engine delegates to.
pub struct Collaborators {
    pub plugins: PluginRegistry,
    pub builder: Box<dyn CatalogBuilder>,
    pub icons: Arc<dyn IconResolver>,
    pub launcher: Box<dyn ProgramLauncher>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            plugins: PluginRegistry::new(),
            builder: Box::new(EmptyCatalogBuilder),
            icons: Arc::new(ThemeIconResolver),
            launcher: Box::new(DetachedLauncher),
        }
    }
}

/// Per-session interactive state, rebuilt from scratch on every input
/// edit except for the annotations the flow itself applies.
struct SessionState {
    raw_text: String,
    tokens: TokenSequence,
    results: Vec<Candidate>,
    selected: Option<usize>,
    output: Option<Candidate>,
    list_visible: bool,
    window_visible: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            raw_text: String::new(),
            tokens: TokenSequence::default(),
            results: Vec::new(),
            selected: None,
            output: None,
            list_visible: false,
            window_visible: true,
        }
    }
}

/// The query resolution engine.
pub struct QuiverCore {
    dirs: Directories,
    config: Config,
    plugins: PluginRegistry,
    catalog: CatalogHandle,
    history: HistoryStore,
    aggregator: Aggregator,
    drop_timer: DropTimer,
    rebuild: RebuildCoordinator,
    icons: IconPipeline,
    launcher: Box<dyn ProgramLauncher>,
    state: SessionState,
    update_tx: UnboundedSender<CoreUpdate>,
    worker_tx: UnboundedSender<WorkerEvent>,
}

impl QuiverCore {
    /// Create the engine, loading persisted catalog and history.
    ///
    /// Returns the engine plus the two receivers the host drives: the
    /// update stream to render, and the worker stream to feed back
    /// into [`handle_worker`](Self::handle_worker).
    ///
    /// # Errors
    ///
    /// Returns an error when the data directories cannot be created
    /// or the persisted state files exist but cannot be read.
    pub fn new(
        dirs: Directories,
        config: Config,
        collaborators: Collaborators,
    ) -> Result<(
        Self,
        UnboundedReceiver<CoreUpdate>,
        UnboundedReceiver<WorkerEvent>,
    )> {
        dirs.ensure_exists()?;
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let (worker_tx, worker_rx) = mpsc::unbounded_channel();

        let catalog = CatalogHandle::new(Catalog::load(&dirs.catalog_file)?);
        let history = HistoryStore::load(&dirs.history_file, config.catalog.max_history_items)?;

        let core = Self {
            aggregator: Aggregator::new(config.search.max_displayed_results),
            drop_timer: DropTimer::new(config.search.auto_suggest_delay_ms, worker_tx.clone()),
            rebuild: RebuildCoordinator::new(collaborators.builder, worker_tx.clone()),
            icons: IconPipeline::new(collaborators.icons, worker_tx.clone()),
            launcher: collaborators.launcher,
            plugins: collaborators.plugins,
            catalog,
            history,
            state: SessionState::default(),
            dirs,
            config,
            update_tx,
            worker_tx,
        };
        Ok((core, update_rx, worker_rx))
    }

    /// Start periodic catalog maintenance. Needs a running runtime;
    /// hosts that drive rebuilds themselves can skip this.
    pub fn start(&self) {
        let minutes = self.config.catalog.rebuild_interval_min;
        if minutes == 0 {
            return;
        }
        let worker_tx = self.worker_tx.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(minutes * 60));
            interval.tick().await; // the first tick completes immediately
            loop {
                interval.tick().await;
                if worker_tx.send(WorkerEvent::RebuildTick).is_err() {
                    return;
                }
            }
        });
    }

    /// Handle one front-end event.
    pub fn process(&mut self, event: CoreEvent) {
        debug!("Processing {:?}", event);
        match event {
            CoreEvent::QueryChanged { query } => self.handle_query_changed(&query),
            CoreEvent::KeyPressed { key } => self.handle_key(key),
            CoreEvent::RowSelected { index } => self.handle_row_selected(index),
            CoreEvent::WindowShown => self.state.window_visible = true,
            CoreEvent::WindowHidden => {
                self.state.window_visible = false;
                self.hide_list();
            }
            CoreEvent::RebuildRequested => self.request_rebuild(),
        }
    }

    /// Handle one background-worker completion.
    pub fn handle_worker(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Debounce { generation } => {
                if self.drop_timer.is_current(generation) {
                    self.drop_timeout();
                }
            }
            WorkerEvent::RebuildTick => self.request_rebuild(),
            WorkerEvent::Rebuild(RebuildEvent::Progress(percent)) => {
                self.send(CoreUpdate::RebuildProgress { percent });
            }
            WorkerEvent::Rebuild(RebuildEvent::Finished(Ok(catalog))) => {
                self.catalog.install(catalog);
                if let Err(e) = self.save_state() {
                    warn!("Failed to persist state after rebuild: {}", e);
                }
                self.search_on_input();
                self.update_output(true);
            }
            WorkerEvent::Rebuild(RebuildEvent::Finished(Err(e))) => {
                warn!("Catalog rebuild failed: {}", e);
            }
            WorkerEvent::Icon(event) => self.handle_icon(event),
        }
    }

    /// Schedule a catalog rebuild; coalesces with one in flight.
    pub fn request_rebuild(&self) {
        self.rebuild.request_rebuild();
    }

    /// Replace the live catalog without going through a rebuild run.
    pub fn install_catalog(&mut self, catalog: Catalog) {
        self.catalog.install(catalog);
    }

    /// Persist catalog and history.
    ///
    /// # Errors
    ///
    /// Returns an error when either write fails.
    pub fn save_state(&self) -> Result<()> {
        self.catalog.save(&self.dirs.catalog_file)?;
        self.history.save(&self.dirs.history_file)?;
        Ok(())
    }

    #[must_use]
    pub fn results(&self) -> &[Candidate] {
        &self.state.results
    }

    #[must_use]
    pub fn raw_text(&self) -> &str {
        &self.state.raw_text
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenSequence {
        &self.state.tokens
    }

    #[must_use]
    pub fn is_list_visible(&self) -> bool {
        self.state.list_visible
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogHandle {
        &self.catalog
    }

    #[must_use]
    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut HistoryStore {
        &mut self.history
    }

    fn handle_key(&mut self, key: Key) {
        match key {
            Key::Tab => self.handle_tab(),
            Key::BackTab => self.handle_back_tab(),
            Key::Enter => self.handle_enter(),
            Key::Escape => self.handle_escape(),
            Key::Down | Key::PageDown => self.handle_down(),
            // The front end moves its own selection upward
            Key::Up | Key::PageUp => {}
            Key::ShiftDelete => self.handle_shift_delete(),
        }
    }

    fn handle_query_changed(&mut self, query: &str) {
        self.state.raw_text = query.to_string();
        self.state
            .tokens
            .reparse(query, &self.config.search.separator);
        self.search_on_input();
        self.update_output(true);

        if query.is_empty() {
            self.hide_list();
        } else if !self.state.list_visible && self.drop_timer.start() {
            self.drop_timeout();
        }
    }

    /// Tab completes: a path candidate extends the input in place, any
    /// other candidate is committed as a finished token and a fresh
    /// live token is opened after the separator.
    fn handle_tab(&mut self) {
        if self.state.tokens.is_empty() || self.state.results.is_empty() {
            return;
        }
        self.adopt_selected_row();

        let top = self.state.results[0].clone();
        let separator = self.config.search.separator.clone();
        let is_dir = Path::new(&top.full_path).is_dir();
        let file_token = self
            .state
            .tokens
            .last()
            .is_some_and(|t| t.has_label(TokenLabel::File));

        let new_text = if file_token || is_dir {
            // Splice the symlink's target so further completion walks
            // the real directory
            let mut path = if Path::new(&top.full_path).is_symlink() {
                std::fs::canonicalize(&top.full_path)
                    .map_or_else(|_| top.full_path.clone(), |p| {
                        p.to_string_lossy().into_owned()
                    })
            } else {
                top.full_path.clone()
            };
            if is_dir && !path.ends_with(MAIN_SEPARATOR) {
                path.push(MAIN_SEPARATOR);
            }
            format!("{}{}", self.state.tokens.to_string(true, &separator), path)
        } else {
            if let Some(token) = self.state.tokens.last_mut() {
                token.set_top_result(top.clone());
                token.set_text(&top.short_name);
            }
            format!(
                "{}{}",
                self.state.tokens.to_string(false, &separator),
                separator
            )
        };
        self.set_input(&new_text);
    }

    /// Shift-Tab peels the input back to the previous boundary: the
    /// last separator, else the last path separator, else the last
    /// space, else everything.
    fn handle_back_tab(&mut self) {
        let text = self.state.raw_text.clone();
        let separator = self.config.search.separator.clone();

        let truncated = if let Some(idx) = text.rfind(&separator) {
            text[..idx + separator.len()].to_string()
        } else if let Some(idx) = text.rfind(MAIN_SEPARATOR) {
            text[..=idx].to_string()
        } else if let Some(idx) = text.rfind(' ') {
            text[..=idx].to_string()
        } else {
            String::new()
        };
        self.set_input(&truncated);
    }

    fn handle_enter(&mut self) {
        self.adopt_selected_row();
        self.update_output(false);
        self.hide_list();

        let launchable = (!self.state.tokens.is_empty() && !self.state.results.is_empty())
            || self.state.tokens.len() > 1;
        if !launchable {
            return;
        }

        let Some(item) = self
            .state
            .tokens
            .first()
            .and_then(|t| t.top_result().cloned())
        else {
            debug!("Nothing to launch");
            return;
        };
        self.launch_item(&item);
        self.send(CoreUpdate::HideWindow);
    }

    fn handle_escape(&mut self) {
        if self.state.list_visible {
            self.hide_list();
        } else {
            self.send(CoreUpdate::HideWindow);
        }
    }

    /// Down reveals the list immediately when it is hidden; movement
    /// inside a visible list belongs to the front end.
    fn handle_down(&mut self) {
        if self.state.list_visible {
            return;
        }
        self.search_on_input();
        if !self.state.results.is_empty() {
            self.show_with_results();
        }
    }

    /// Shift-Delete removes the highlighted row at its source: a
    /// history row is deleted from the store, anything else demotes
    /// the catalog item below never-used entries.
    fn handle_shift_delete(&mut self) {
        let Some(row) = self.state.selected else {
            return;
        };
        let Some(candidate) = self.state.results.get(row).cloned() else {
            return;
        };

        if let CandidateSource::History { index } = candidate.source {
            self.history.remove_at(index);
            self.state.raw_text.clear();
            self.state.tokens = TokenSequence::parse("", &self.config.search.separator);
            self.send(CoreUpdate::SetInput {
                text: String::new(),
                selection: None,
            });
            self.search_on_input();
            if self.state.results.is_empty() {
                self.state.output = None;
                self.send(CoreUpdate::ClearOutput);
                self.hide_list();
            } else if self.state.list_visible {
                self.update_list(false);
                let next = row.min(self.state.results.len() - 1);
                self.handle_row_selected(next);
            }
        } else {
            self.catalog.demote_item(&candidate);
            self.search_on_input();
            self.update_output(false);
        }
    }

    /// React to the front end highlighting a row: a history row is
    /// recalled whole into the input (selected, so typing replaces
    /// it); in suggestion mode the live token is rewritten with the
    /// completion ghost-selected.
    fn handle_row_selected(&mut self, index: usize) {
        let Some(item) = self.state.results.get(index).cloned() else {
            return;
        };
        self.state.selected = Some(index);

        let history_mode = self
            .state
            .tokens
            .first()
            .is_some_and(|t| t.has_label(TokenLabel::History))
            || self.state.raw_text.is_empty();

        if history_mode {
            let CandidateSource::History { index: record } = item.source else {
                return;
            };
            let Some(tokens) = self.history.get_item(record).cloned() else {
                return;
            };
            let separator = self.config.search.separator.clone();
            let text = tokens.to_string(false, &separator);
            self.state.tokens = tokens;
            self.state.raw_text = text.clone();
            self.send(CoreUpdate::SetInput {
                selection: Some(Selection {
                    start: 0,
                    len: text.chars().count(),
                }),
                text,
            });
            self.set_output_item(&item);
            return;
        }

        let rewrite = self
            .state
            .tokens
            .last()
            .is_some_and(|t| t.has_label(TokenLabel::AutoSuggest) || t.text().is_empty());
        if !rewrite {
            return;
        }

        let separator = self.config.search.separator.clone();
        if let Some(token) = self.state.tokens.last_mut() {
            token.set_text(&item.short_name);
            token.set_label(TokenLabel::AutoSuggest);
            token.set_top_result(item.clone());
        }
        let root = self.state.tokens.to_string(true, &separator);
        let text = format!("{root}{}", item.short_name);
        self.state.raw_text = text.clone();
        self.send(CoreUpdate::SetInput {
            text,
            selection: Some(Selection {
                start: root.chars().count(),
                len: item.short_name.chars().count(),
            }),
        });
        self.set_output_item(&item);
    }

    /// Run the resolved program (or hand it to its owning plugin),
    /// then account for the launch in catalog and history.
    fn launch_item(&mut self, item: &Candidate) {
        self.catalog
            .record_recent_choice(&self.state.raw_text.to_lowercase(), item);

        match self.plugins.execute(&self.state.tokens, item) {
            PluginControl::Launch => {
                let args = self
                    .state
                    .tokens
                    .iter()
                    .skip(1)
                    .map(Token::text)
                    .collect::<Vec<_>>()
                    .join(" ");
                if let Err(e) = self.launcher.run(&item.full_path, &args) {
                    warn!("Failed to launch {}: {}", item.short_name, e);
                }
            }
            PluginControl::Handled => {}
            PluginControl::Exit => self.send(CoreUpdate::Exit),
            PluginControl::ShowOptions => self.send(CoreUpdate::ShowOptions),
            PluginControl::Rebuild => self.request_rebuild(),
            PluginControl::ReloadSkin => self.send(CoreUpdate::ReloadSkin),
        }

        self.catalog.increment_usage(item);
        let separator = self.config.search.separator.clone();
        self.history.add_item(&self.state.tokens, &separator);
    }

    fn search_on_input(&mut self) {
        let raw = self.state.raw_text.clone();
        self.state.results = self.aggregator.aggregate(
            &mut self.state.tokens,
            &raw,
            &self.catalog,
            &self.history,
            &self.plugins,
        );
    }

    /// Refresh the output/preview item from the current top result,
    /// binding it to the live token so Enter launches what the user
    /// sees. An empty result set clears the output and any stale
    /// binding.
    fn update_output(&mut self, reset_selection: bool) {
        let has_output = !self.state.results.is_empty()
            && (self.state.tokens.len() > 1 || !self.state.raw_text.is_empty());

        if has_output {
            let top = self.state.results[0].clone();
            if !top.is_history()
                && let Some(token) = self.state.tokens.last_mut()
            {
                token.set_top_result(top.clone());
            }
            self.set_output_item(&top);
            if self.state.list_visible {
                self.update_list(reset_selection);
            }
        } else {
            self.state.output = None;
            self.send(CoreUpdate::ClearOutput);
            if let Some(token) = self.state.tokens.last_mut() {
                token.clear_top_result();
            }
            self.hide_list();
        }
    }

    /// Show `item` in the output widgets, re-resolving its icon only
    /// when the item actually changed.
    fn set_output_item(&mut self, item: &Candidate) {
        self.send(CoreUpdate::OutputText {
            text: item.short_name.clone(),
        });
        if self.state.output.as_ref() != Some(item) {
            self.send(CoreUpdate::ClearOutputIcon);
            self.icons.request(None, &item.full_path);
            self.state.output = Some(item.clone());
        }
    }

    fn update_list(&mut self, reset_selection: bool) {
        self.send(CoreUpdate::Results {
            candidates: self.state.results.clone(),
            reset_selection,
        });
        self.icons
            .request_rows(self.state.results.iter().map(|c| c.full_path.clone()));
        if reset_selection && !self.state.results.is_empty() {
            self.handle_row_selected(0);
        }
    }

    fn show_with_results(&mut self) {
        self.drop_timer.cancel();
        self.state.list_visible = true;
        self.update_list(true);
        self.send(CoreUpdate::ShowList);
    }

    fn hide_list(&mut self) {
        self.drop_timer.cancel();
        if self.state.list_visible {
            self.send(CoreUpdate::HideList);
        }
        self.state.list_visible = false;
        self.state.selected = None;
    }

    /// The reveal debounce elapsed; show the list if there is still
    /// something to show and the window is still up.
    fn drop_timeout(&mut self) {
        if self.state.window_visible
            && !self.state.results.is_empty()
            && !self.state.raw_text.is_empty()
        {
            self.show_with_results();
        }
    }

    /// Record and front-load the row the user highlighted, if any.
    fn adopt_selected_row(&mut self) {
        let Some(row) = self.state.selected else {
            return;
        };
        let Some(candidate) = self.state.results.get(row).cloned() else {
            return;
        };
        self.catalog
            .record_recent_choice(&self.state.raw_text.to_lowercase(), &candidate);
        if row > 0 {
            let promoted = self.state.results.remove(row);
            self.state.results.insert(0, promoted);
            self.state.selected = Some(0);
        }
    }

    /// Apply a completed icon resolution, unless the target moved on
    /// while it was being resolved.
    fn handle_icon(&mut self, event: IconEvent) {
        match event.row {
            None => {
                if self
                    .state
                    .output
                    .as_ref()
                    .is_some_and(|o| o.full_path == event.path)
                {
                    self.send(CoreUpdate::OutputIcon { icon: event.icon });
                } else {
                    debug!("Dropping stale output icon for {}", event.path);
                }
            }
            Some(row) => {
                if self
                    .state
                    .results
                    .get(row)
                    .is_some_and(|c| c.full_path == event.path)
                {
                    self.send(CoreUpdate::RowIcon {
                        index: row,
                        icon: event.icon,
                    });
                } else {
                    debug!("Dropping stale row icon for {}", event.path);
                }
            }
        }
    }

    /// Programmatic input rewrite: the front end mirrors the text,
    /// then the edit flows through the normal input path.
    fn set_input(&mut self, text: &str) {
        self.send(CoreUpdate::SetInput {
            text: text.to_string(),
            selection: None,
        });
        self.handle_query_changed(text);
    }

    fn send(&self, update: CoreUpdate) {
        if self.update_tx.send(update).is_err() {
            debug!("Update channel closed");
        }
    }
}

//! Quiver launcher CLI
//!
//! Drives the query engine from a terminal without a graphical front
//! end: one-shot searches, catalog rebuilds and history inspection.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use quiver_core::catalog::{Catalog, CatalogBuilder};
use quiver_core::config::{Config, Directories};
use quiver_core::{Collaborators, CoreEvent, QuiverCore, RebuildEvent, WorkerEvent};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Quiver launcher CLI
#[derive(Parser)]
#[command(name = "quiver")]
#[command(about = "Quiver launcher - keystroke-driven program launcher")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a query against the catalog and print the ranked results
    Search {
        /// Query text, tokenized on the configured separator
        query: String,

        /// Maximum rows to print
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Rebuild the catalog by scanning the directories on PATH
    Rebuild,

    /// Print the executed-command history, most recent first
    History,
}

/// Builder that enumerates every executable on PATH.
struct PathCatalogBuilder;

impl CatalogBuilder for PathCatalogBuilder {
    fn build(&mut self, progress: &mut dyn FnMut(u8)) -> quiver_core::Result<Catalog> {
        let mut catalog = Catalog::new();
        let path_var = std::env::var("PATH").unwrap_or_default();
        let dirs: Vec<_> = std::env::split_paths(&path_var).collect();
        let total = dirs.len().max(1);

        for (done, dir) in dirs.iter().enumerate() {
            if let Ok(entries) = std::fs::read_dir(dir) {
                for entry in entries.flatten() {
                    if !entry.file_type().is_ok_and(|t| t.is_file()) {
                        continue;
                    }
                    let name = entry.file_name().to_string_lossy().into_owned();
                    catalog.add_item(&name, &entry.path().to_string_lossy());
                }
            }
            progress(u8::try_from((done + 1) * 100 / total).unwrap_or(100));
        }
        Ok(catalog)
    }
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("quiver=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Run the engine until the in-flight rebuild completes, feeding
/// every worker completion back into it.
async fn drive_rebuild(
    core: &mut QuiverCore,
    workers: &mut UnboundedReceiver<WorkerEvent>,
) -> Result<()> {
    core.request_rebuild();
    while let Some(event) = workers.recv().await {
        let finished = matches!(event, WorkerEvent::Rebuild(RebuildEvent::Finished(_)));
        core.handle_worker(event);
        if finished {
            return Ok(());
        }
    }
    anyhow::bail!("worker channel closed before the rebuild completed")
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();
    let cli = Cli::parse();

    let dirs = Directories::new();
    let config = Config::load(&dirs.config_file).context("Failed to load configuration")?;
    let collaborators = Collaborators {
        builder: Box::new(PathCatalogBuilder),
        ..Collaborators::default()
    };
    // The update receiver must stay alive while the session runs, but
    // a one-shot command has nothing to render from it.
    let (mut core, _updates, mut workers) =
        QuiverCore::new(dirs, config, collaborators).context("Failed to start the engine")?;

    match cli.command {
        Commands::Search { query, limit } => {
            if core.catalog().is_empty() {
                info!("Catalog is empty, rebuilding first");
                drive_rebuild(&mut core, &mut workers).await?;
            }
            core.process(CoreEvent::QueryChanged { query });

            for candidate in core.results().iter().take(limit) {
                println!("{:32} {}", candidate.short_name, candidate.full_path);
            }
        }
        Commands::Rebuild => {
            drive_rebuild(&mut core, &mut workers).await?;
            let count = core.catalog().snapshot().len();
            println!("Catalog rebuilt: {count} items");
        }
        Commands::History => {
            let mut records = Vec::new();
            core.history().search("", &mut records);
            for record in records {
                println!("{}", record.name);
            }
        }
    }
    Ok(())
}

//! Icon resolution pipeline.
//!
//! Resolving an icon can touch the filesystem, so requests run on the
//! blocking pool and results come back through the worker channel.
//! Deliveries carry the path they were resolved for; the session
//! re-validates that against current state before applying them, so
//! a resolution that raced with an input change is simply dropped.

use crate::engine::WorkerEvent;
use quiver_types::Icon;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// A resolved icon together with the target it was requested for.
/// `row: None` addresses the output/preview item.
#[derive(Debug)]
pub struct IconEvent {
    pub row: Option<usize>,
    pub path: String,
    pub icon: Icon,
}

/// Collaborator that maps a full path to a displayable icon.
pub trait IconResolver: Send + Sync {
    fn resolve(&self, path: &str) -> Icon;
}

/// Resolver mapping paths onto freedesktop theme icon names. Knows
/// nothing about pixels; the front end rasterizes the name.
pub struct ThemeIconResolver;

impl IconResolver for ThemeIconResolver {
    fn resolve(&self, path: &str) -> Icon {
        let p = Path::new(path);
        if p.is_dir() {
            return Icon::named("folder");
        }
        match p.extension().and_then(|e| e.to_str()) {
            Some("txt" | "md") => Icon::named("text-x-generic"),
            Some("png" | "jpg" | "jpeg" | "svg") => Icon::named("image-x-generic"),
            Some("desktop") => Icon::named("application-x-desktop"),
            _ => Icon::named("application-x-executable"),
        }
    }
}

/// Schedules icon resolutions and delivers them as worker events.
pub struct IconPipeline {
    resolver: Arc<dyn IconResolver>,
    worker_tx: UnboundedSender<WorkerEvent>,
}

impl IconPipeline {
    #[must_use]
    pub fn new(resolver: Arc<dyn IconResolver>, worker_tx: UnboundedSender<WorkerEvent>) -> Self {
        Self {
            resolver,
            worker_tx,
        }
    }

    /// Resolve the icon for one target off-thread.
    pub fn request(&self, row: Option<usize>, path: &str) {
        let resolver = Arc::clone(&self.resolver);
        let worker_tx = self.worker_tx.clone();
        let path = path.to_string();
        tokio::task::spawn_blocking(move || {
            let icon = resolver.resolve(&path);
            let _ = worker_tx.send(WorkerEvent::Icon(IconEvent { row, path, icon }));
        });
    }

    /// Request icons for every row of a freshly presented list.
    pub fn request_rows(&self, paths: impl Iterator<Item = String>) {
        for (row, path) in paths.enumerate() {
            self.request(Some(row), &path);
        }
    }
}

//! Asynchronous catalog rebuild coordination.
//!
//! A rebuild enumerates everything from scratch, so it runs on the
//! blocking pool while the UI context keeps serving queries against
//! the current catalog. Requests arriving while a rebuild is in
//! flight coalesce into it instead of queueing a second run.

use crate::Result;
use crate::catalog::{Catalog, CatalogBuilder};
use crate::engine::WorkerEvent;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

/// Progress and completion notifications from a rebuild run.
///
/// Every run ends in exactly one `Finished`, success or not; the
/// caller decides whether to install the result.
#[derive(Debug)]
pub enum RebuildEvent {
    /// Percentage progress reported by the builder
    Progress(u8),

    /// The run ended; `Ok` carries the freshly built catalog
    Finished(Result<Catalog>),
}

/// Schedules catalog rebuilds on the blocking pool, one at a time.
pub struct RebuildCoordinator {
    builder: Arc<std::sync::Mutex<Box<dyn CatalogBuilder>>>,
    in_flight: Arc<AtomicBool>,
    worker_tx: UnboundedSender<WorkerEvent>,
}

impl RebuildCoordinator {
    #[must_use]
    pub fn new(builder: Box<dyn CatalogBuilder>, worker_tx: UnboundedSender<WorkerEvent>) -> Self {
        Self {
            builder: Arc::new(std::sync::Mutex::new(builder)),
            in_flight: Arc::new(AtomicBool::new(false)),
            worker_tx,
        }
    }

    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Start a rebuild unless one is already running, in which case
    /// the request coalesces into it.
    pub fn request_rebuild(&self) {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            debug!("Rebuild already in flight, request coalesced");
            return;
        }

        info!("Starting catalog rebuild");
        let builder = Arc::clone(&self.builder);
        let in_flight = Arc::clone(&self.in_flight);
        let worker_tx = self.worker_tx.clone();

        tokio::task::spawn_blocking(move || {
            let result = {
                let mut builder = builder
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
                let progress_tx = worker_tx.clone();
                builder.build(&mut |percent| {
                    let _ = progress_tx.send(WorkerEvent::Rebuild(RebuildEvent::Progress(percent)));
                })
            };

            // Clear the flag before delivering completion, so a
            // rebuild requested in response to it is not coalesced
            // into the run that just ended.
            in_flight.store(false, Ordering::SeqCst);
            let _ = worker_tx.send(WorkerEvent::Rebuild(RebuildEvent::Finished(result)));
        });
    }
}

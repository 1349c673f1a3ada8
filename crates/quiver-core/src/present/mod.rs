//! Debounced presentation scheduler.
//!
//! Showing the drop-down on every keystroke would flicker; instead a
//! restartable timer delays the reveal until typing pauses. Each
//! restart bumps a generation counter, so a firing that raced with a
//! newer keystroke identifies itself as stale and is dropped.

use crate::engine::WorkerEvent;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// Restartable single-shot reveal timer.
pub struct DropTimer {
    delay: Duration,
    generation: u64,
    worker_tx: UnboundedSender<WorkerEvent>,
}

impl DropTimer {
    #[must_use]
    pub fn new(delay_ms: u64, worker_tx: UnboundedSender<WorkerEvent>) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            generation: 0,
            worker_tx,
        }
    }

    /// Restart the timer. Returns `true` when the configured delay is
    /// zero: no task is scheduled and the caller fires the timeout
    /// synchronously, so a zero delay never loses to channel latency.
    pub fn start(&mut self) -> bool {
        self.generation += 1;
        if self.delay.is_zero() {
            return true;
        }

        let generation = self.generation;
        let delay = self.delay;
        let worker_tx = self.worker_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = worker_tx.send(WorkerEvent::Debounce { generation });
        });
        false
    }

    /// Invalidate any scheduled firing without scheduling a new one.
    pub fn cancel(&mut self) {
        self.generation += 1;
    }

    /// Whether a delivered firing is the most recently scheduled one.
    #[must_use]
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[test]
    fn test_zero_delay_fires_synchronously() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = DropTimer::new(0, tx);
        assert!(timer.start(), "zero delay asks the caller to fire now");
        assert!(rx.try_recv().is_err(), "nothing goes through the channel");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = DropTimer::new(100, tx);
        assert!(!timer.start());

        tokio::time::sleep(Duration::from_millis(101)).await;
        let event = rx.recv().await.unwrap();
        let WorkerEvent::Debounce { generation } = event else {
            panic!("expected a debounce firing");
        };
        assert!(timer.is_current(generation));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_invalidates_pending_firing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = DropTimer::new(100, tx);
        timer.start();

        tokio::time::sleep(Duration::from_millis(50)).await;
        timer.start();

        tokio::time::sleep(Duration::from_millis(51)).await;
        let WorkerEvent::Debounce { generation } = rx.recv().await.unwrap() else {
            panic!("expected a debounce firing");
        };
        assert!(!timer.is_current(generation), "first firing is stale");

        tokio::time::sleep(Duration::from_millis(50)).await;
        let WorkerEvent::Debounce { generation } = rx.recv().await.unwrap() else {
            panic!("expected a debounce firing");
        };
        assert!(timer.is_current(generation), "second firing is live");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending_firing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = DropTimer::new(100, tx);
        timer.start();
        timer.cancel();

        tokio::time::sleep(Duration::from_millis(101)).await;
        let WorkerEvent::Debounce { generation } = rx.recv().await.unwrap() else {
            panic!("expected a debounce firing");
        };
        assert!(!timer.is_current(generation));
    }
}

//! Background poll loop.
//!
//! Every tick runs one pass per tracked change request, concurrently.
//! Failures are logged and the loop keeps going; the next tick retries.

use crate::reconcile::{PassOutcome, Reconciler};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::interval;

/// Counts for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub completed: usize,
    pub superseded: usize,
    pub failed: usize,
}

impl TickSummary {
    fn absorb(&mut self, other: TickSummary) {
        self.completed += other.completed;
        self.superseded += other.superseded;
        self.failed += other.failed;
    }
}

/// Totals over the lifetime of a worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    pub ticks: u64,
    pub passes: TickSummary,
}

pub struct PollWorker {
    reconciler: Arc<Reconciler>,
    interval: Duration,
    max_ticks: Option<u64>,
    trigger_rx: mpsc::Receiver<()>,
}

impl PollWorker {
    /// Create a worker and the sender that triggers an immediate tick.
    pub fn new(reconciler: Arc<Reconciler>, interval: Duration) -> (Self, mpsc::Sender<()>) {
        let (trigger_tx, trigger_rx) = mpsc::channel(10);
        let worker = Self {
            reconciler,
            interval,
            max_ticks: None,
            trigger_rx,
        };
        (worker, trigger_tx)
    }

    /// Stop after `ticks` ticks.
    pub fn with_max_ticks(mut self, ticks: u64) -> Self {
        self.max_ticks = Some(ticks);
        self
    }

    /// Run passes for every tracked change request.
    pub async fn tick(&self) -> TickSummary {
        let mut passes = JoinSet::new();
        for id in self.reconciler.tracked() {
            let reconciler = self.reconciler.clone();
            passes.spawn(async move {
                let outcome = reconciler.run_pass(&id).await;
                (id, outcome)
            });
        }

        let mut summary = TickSummary::default();
        while let Some(joined) = passes.join_next().await {
            match joined {
                Ok((_, Ok(PassOutcome::Completed(_)))) => summary.completed += 1,
                Ok((_, Ok(PassOutcome::Superseded { .. }))) => summary.superseded += 1,
                Ok((id, Err(e))) => {
                    tracing::error!(
                        change_request = %id,
                        error = %e,
                        transient = e.is_transient(),
                        "Reconciliation pass failed"
                    );
                    summary.failed += 1;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Reconciliation task panicked");
                    summary.failed += 1;
                }
            }
        }
        summary
    }

    /// Tick on the interval and on triggers until `shutdown` resolves or the
    /// tick limit is reached.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> WorkerSummary {
        tokio::pin!(shutdown);
        let mut ticker = interval(self.interval);
        let mut totals = WorkerSummary::default();

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            tracked = self.reconciler.tracked().len(),
            "Poll worker started"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
                Some(()) = self.trigger_rx.recv() => {
                    tracing::debug!("Triggered tick");
                }
            }

            let summary = self.tick().await;
            totals.ticks += 1;
            totals.passes.absorb(summary);
            tracing::debug!(
                tick = totals.ticks,
                completed = summary.completed,
                superseded = summary.superseded,
                failed = summary.failed,
                "Tick finished"
            );

            if self.max_ticks.is_some_and(|max| totals.ticks >= max) {
                break;
            }
        }

        tracing::info!(ticks = totals.ticks, "Poll worker stopped");
        totals
    }
}

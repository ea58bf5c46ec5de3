use std::sync::mpsc::{channel, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info};

use crate::error::DistributionError;

/// Counters returned by [`WorkerThread::stop`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    pub ticks: usize,
    /// Sum of what each successful tick reported.
    pub processed: usize,
    pub failures: usize,
}

/// A background thread calling `tick` every `interval` until stopped.
///
/// A failing tick is logged and counted; the next tick simply retries,
/// which is how the relay and the scheduler get their re-poll semantics.
///
/// ```
/// use std::time::Duration;
/// use distribution_core::workers::WorkerThread;
///
/// let worker = WorkerThread::spawn("noop", Duration::from_millis(5), || Ok(0));
/// let stats = worker.stop();
/// assert!(stats.ticks >= 1);
/// ```
pub struct WorkerThread {
    name: String,
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<WorkerStats>>,
}

impl WorkerThread {
    pub fn spawn<F>(name: impl Into<String>, interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Result<usize, DistributionError> + Send + 'static,
    {
        let (stop_tx, stop_rx) = channel();
        let name = name.into();
        let worker = name.clone();

        let handle = thread::spawn(move || {
            let mut stats = WorkerStats::default();
            info!(event = "worker_started", worker = %worker, "worker started");

            loop {
                stats.ticks += 1;
                match tick() {
                    Ok(0) => debug!(event = "worker_idle", worker = %worker, "nothing to do"),
                    Ok(n) => stats.processed += n,
                    Err(e) => {
                        stats.failures += 1;
                        error!(
                            event = "worker_tick_failed",
                            worker = %worker,
                            retryable = e.is_retryable(),
                            error = %e,
                            "worker tick failed"
                        );
                    }
                }

                match stop_rx.recv_timeout(interval) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) => {}
                }
            }

            info!(
                event = "worker_stopped",
                worker = %worker,
                ticks = stats.ticks,
                processed = stats.processed,
                failures = stats.failures,
                "worker stopped"
            );
            stats
        });

        Self {
            name,
            stop_tx,
            handle: Some(handle),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Signal the worker to stop and wait for the current tick to finish.
    pub fn stop(mut self) -> WorkerStats {
        let _ = self.stop_tx.send(());
        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or_default(),
            None => WorkerStats::default(),
        }
    }
}

impl Drop for WorkerThread {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
    }
}

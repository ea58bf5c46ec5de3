use std::time::Duration;

use crate::commands::{DistributionCommands, SweepReport};
use crate::error::DistributionError;

use super::WorkerThread;

/// Periodic driver for [`DistributionCommands::process_due_scheduled`].
#[derive(Clone)]
pub struct SchedulerJob {
    commands: DistributionCommands,
    batch_size: usize,
}

impl SchedulerJob {
    pub fn new(commands: DistributionCommands) -> Self {
        let batch_size = commands.config().scheduler_batch_size;
        Self {
            commands,
            batch_size,
        }
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn run_once(&self) -> Result<SweepReport, DistributionError> {
        self.commands.process_due_scheduled(self.batch_size)
    }

    /// Run the sweep on a [`WorkerThread`] named `distribution-scheduler`.
    pub fn spawn(self, interval: Duration) -> WorkerThread {
        WorkerThread::spawn("distribution-scheduler", interval, move || {
            self.run_once().map(|report| report.published)
        })
    }
}

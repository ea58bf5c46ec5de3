use tracing::{debug, info};

use super::DistributionCommands;
use crate::domain::DistributionItem;
use crate::error::DistributionError;

/// Counts for one pass over due scheduled items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub due: usize,
    pub published: usize,
    pub failed: usize,
}

impl DistributionCommands {
    /// Publish every `Scheduled` item whose time has come, oldest first.
    ///
    /// `limit == 0` uses the configured batch size. Each item is attempted
    /// even if an earlier one failed; failures go through the failure
    /// handler and the first one is returned once the pass is over.
    pub fn process_due_scheduled(&self, limit: usize) -> Result<SweepReport, DistributionError> {
        let limit = if limit == 0 {
            self.config.scheduler_batch_size
        } else {
            limit
        };
        let due = self.repository.list_due_scheduled(self.now(), limit)?;
        if due.is_empty() {
            debug!(event = "distribution_scheduler_idle", "no scheduled items due");
            return Ok(SweepReport::default());
        }

        let mut report = SweepReport {
            due: due.len(),
            ..SweepReport::default()
        };
        let mut first_error = None;
        for item in due {
            match self.publish_scheduled(item) {
                Ok(_) => report.published += 1,
                Err(err) => {
                    report.failed += 1;
                    first_error.get_or_insert(err);
                }
            }
        }

        info!(
            event = "distribution_scheduler_cycle_completed",
            due = report.due,
            published = report.published,
            failed = report.failed,
            "scheduler pass finished"
        );
        match first_error {
            Some(err) => Err(err),
            None => Ok(report),
        }
    }

    fn publish_scheduled(
        &self,
        item: DistributionItem,
    ) -> Result<DistributionItem, DistributionError> {
        let started = if item.platforms.is_empty() {
            Err(DistributionError::InvalidInput(format!(
                "scheduled item {} has no platforms",
                item.id
            )))
        } else {
            self.begin_publish(item.clone(), item.platforms.clone(), item.caption.clone())
        };
        match started {
            Ok(started) => self.finish_publish(started, "scheduler"),
            Err(err) => {
                self.record_failure(&item, &err, "scheduler");
                Err(err)
            }
        }
    }
}

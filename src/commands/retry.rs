use serde::Serialize;
use tracing::{info, warn};

use super::{CommandOutcome, DistributionCommands};
use crate::domain::{DistributionItem, DistributionStatus};
use crate::error::DistributionError;

#[derive(Debug, Clone, Default, Serialize)]
pub struct RetryCommand {
    pub item_id: String,
    pub influencer_id: String,
    #[serde(skip)]
    pub idempotency_key: Option<String>,
}

impl DistributionCommands {
    /// Publish a `Failed` item again with its stored platforms and caption.
    ///
    /// `retry_count` restarts at zero, so a retry that fails again leaves it
    /// at one.
    pub fn retry(
        &self,
        cmd: RetryCommand,
    ) -> Result<CommandOutcome<DistributionItem>, DistributionError> {
        self.idempotent(
            "retry",
            cmd.idempotency_key.as_deref(),
            &cmd,
            |_| self.load(&cmd.item_id),
            || Ok((self.retry_item(&cmd)?, None)),
        )
    }

    fn retry_item(&self, cmd: &RetryCommand) -> Result<DistributionItem, DistributionError> {
        let mut item = self.load_owned(&cmd.item_id, &cmd.influencer_id)?;
        if item.status != DistributionStatus::Failed {
            warn!(
                event = "distribution_retry_invalid_state",
                item_id = %item.id,
                status = %item.status,
                "retry rejected"
            );
            return Err(DistributionError::InvalidStateTransition {
                item_id: item.id,
                from: item.status,
                to: DistributionStatus::Publishing,
            });
        }
        if item.platforms.is_empty() {
            return Err(DistributionError::InvalidInput(format!(
                "distribution item {} has no platforms to retry",
                item.id
            )));
        }

        info!(
            event = "distribution_retry_requested",
            item_id = %item.id,
            previous_retry_count = item.retry_count,
            last_error = %item.last_error,
            "retrying publish"
        );
        item.retry_count = 0;
        item.last_error.clear();
        let platforms = item.platforms.clone();
        let caption = item.caption.clone();
        let started = self.begin_publish(item, platforms, caption)?;
        self.finish_publish(started, "retry")
    }
}

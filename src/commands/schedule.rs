use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{error, info, warn};

use super::{CommandOutcome, DistributionCommands};
use crate::domain::{DistributionItem, DistributionStatus, Platform};
use crate::error::DistributionError;

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleCommand {
    pub item_id: String,
    pub influencer_id: String,
    pub platform: String,
    pub scheduled_for: DateTime<Utc>,
    /// IANA name; empty means UTC.
    pub timezone: String,
    #[serde(skip)]
    pub idempotency_key: Option<String>,
}

/// Same shape as [`ScheduleCommand`]; only valid for `Scheduled` items.
pub type RescheduleCommand = ScheduleCommand;

impl DistributionCommands {
    /// Schedule a `Claimed` or `Failed` item for one platform.
    pub fn schedule(
        &self,
        cmd: ScheduleCommand,
    ) -> Result<CommandOutcome<DistributionItem>, DistributionError> {
        self.idempotent(
            "schedule",
            cmd.idempotency_key.as_deref(),
            &cmd,
            |_| self.load(&cmd.item_id),
            || Ok((self.schedule_item(&cmd, false)?, None)),
        )
    }

    /// Move the time or platform of an already `Scheduled` item.
    pub fn reschedule(
        &self,
        cmd: RescheduleCommand,
    ) -> Result<CommandOutcome<DistributionItem>, DistributionError> {
        self.idempotent(
            "reschedule",
            cmd.idempotency_key.as_deref(),
            &cmd,
            |_| self.load(&cmd.item_id),
            || Ok((self.schedule_item(&cmd, true)?, None)),
        )
    }

    fn schedule_item(
        &self,
        cmd: &ScheduleCommand,
        reschedule: bool,
    ) -> Result<DistributionItem, DistributionError> {
        let (rejected, accepted) = if reschedule {
            ("distribution_reschedule_invalid_state", "distribution_item_rescheduled")
        } else {
            ("distribution_schedule_invalid_state", "distribution_item_scheduled")
        };
        let mut item = self.load_owned(&cmd.item_id, &cmd.influencer_id)?;
        let previous = item.status;

        let allowed = if reschedule {
            previous == DistributionStatus::Scheduled
        } else {
            matches!(previous, DistributionStatus::Claimed | DistributionStatus::Failed)
        };
        if !allowed {
            warn!(
                event = rejected,
                item_id = %item.id,
                status = %previous,
                "schedule rejected"
            );
            return Err(DistributionError::InvalidStateTransition {
                item_id: item.id,
                from: previous,
                to: DistributionStatus::Scheduled,
            });
        }

        let platform = Platform::parse(&cmd.platform).map_err(|e| {
            warn!(event = "distribution_schedule_invalid_platform", item_id = %item.id, platform = %cmd.platform.trim(), "schedule rejected");
            e
        })?;

        let now = self.now();
        let earliest = now + self.config.schedule_buffer;
        let latest = now + self.config.schedule_window;
        if cmd.scheduled_for < earliest || cmd.scheduled_for > latest {
            warn!(
                event = "distribution_schedule_outside_window",
                item_id = %item.id,
                scheduled_for_utc = %cmd.scheduled_for.to_rfc3339(),
                "schedule rejected"
            );
            return Err(DistributionError::InvalidScheduleWindow {
                scheduled_for: cmd.scheduled_for,
                earliest,
                latest,
            });
        }

        let timezone = normalize_timezone(&cmd.timezone)?;

        item.transition_to(DistributionStatus::Scheduled, now)?;
        item.scheduled_for_utc = Some(cmd.scheduled_for);
        item.timezone = timezone;
        item.platforms = vec![platform];
        self.repository.update_item(item.clone(), previous).map_err(|e| {
            error!(event = "distribution_schedule_state_update_failed", item_id = %item.id, error = %e, "schedule write failed");
            e
        })?;

        info!(
            event = accepted,
            item_id = %item.id,
            scheduled_for_utc = %cmd.scheduled_for.to_rfc3339(),
            timezone = %item.timezone,
            platform = %platform,
            "distribution item schedule updated"
        );
        Ok(item)
    }
}

fn normalize_timezone(value: &str) -> Result<String, DistributionError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok("UTC".to_string());
    }
    value
        .parse::<Tz>()
        .map(|tz| tz.name().to_string())
        .map_err(|_| DistributionError::InvalidTimezone(value.to_string()))
}

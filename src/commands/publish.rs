use serde::Serialize;
use tracing::{error, info, warn};

use super::{CommandOutcome, DistributionCommands};
use crate::domain::{
    normalize_platforms, Caption, DistributionItem, DistributionStatus, Platform, PlatformStatus,
    PublishingAnalytics,
};
use crate::envelope::{EVENT_DISTRIBUTION_FAILED, EVENT_DISTRIBUTION_PUBLISHED};
use crate::error::DistributionError;
use crate::repository::ItemCommit;

/// Retry budget recorded on each platform-status row.
pub const PLATFORM_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Default, Serialize)]
pub struct PublishMultiCommand {
    pub item_id: String,
    pub influencer_id: String,
    /// Empty means the platforms already stored on the item.
    pub platforms: Vec<String>,
    pub caption: String,
    #[serde(skip)]
    pub idempotency_key: Option<String>,
}

impl DistributionCommands {
    /// Publish an item to several platforms now.
    ///
    /// Validation failures leave the item untouched. Once the item is
    /// `Publishing`, any failure is recorded on it (`Failed`, `retry_count`,
    /// `last_error`, a `distribution.failed` event) before being returned.
    pub fn publish_multi(
        &self,
        cmd: PublishMultiCommand,
    ) -> Result<CommandOutcome<DistributionItem>, DistributionError> {
        self.idempotent(
            "publish_multi",
            cmd.idempotency_key.as_deref(),
            &cmd,
            |_| self.load(&cmd.item_id),
            || Ok((self.publish_requested(&cmd)?, None)),
        )
    }

    fn publish_requested(
        &self,
        cmd: &PublishMultiCommand,
    ) -> Result<DistributionItem, DistributionError> {
        let item = self.load_owned(&cmd.item_id, &cmd.influencer_id)?;
        if !item.status.can_transition_to(DistributionStatus::Publishing) {
            warn!(
                event = "distribution_publish_invalid_state",
                item_id = %item.id,
                status = %item.status,
                "publish rejected"
            );
            return Err(DistributionError::InvalidStateTransition {
                item_id: item.id,
                from: item.status,
                to: DistributionStatus::Publishing,
            });
        }

        let requested: Vec<&str> = if cmd.platforms.is_empty() {
            item.platforms.iter().map(Platform::as_str).collect()
        } else {
            cmd.platforms.iter().map(String::as_str).collect()
        };
        let platforms = normalize_platforms(&requested).map_err(|e| {
            warn!(event = "distribution_publish_platform_validation_failed", item_id = %item.id, error = %e, "publish rejected");
            e
        })?;

        let caption = cmd.caption.trim().to_string();
        let started = self.begin_publish(item, platforms, caption)?;
        self.finish_publish(started, "publish_multi")
    }

    /// First write: the item becomes `Publishing` with its final platform
    /// list and caption. A crash after this leaves a resumable item.
    pub(super) fn begin_publish(
        &self,
        mut item: DistributionItem,
        platforms: Vec<Platform>,
        caption: String,
    ) -> Result<DistributionItem, DistributionError> {
        let previous = item.status;
        let now = self.now();
        item.transition_to(DistributionStatus::Publishing, now)?;
        item.platforms = platforms;
        item.caption = caption;
        item.publish_started_at = Some(now);

        self.repository
            .update_item(item.clone(), previous)
            .map_err(|e| {
                error!(event = "distribution_publish_start_state_update_failed", item_id = %item.id, error = %e, "publish start write failed");
                e
            })?;
        Ok(item)
    }

    /// Second phase. Every error is routed through [`Self::record_failure`].
    pub(super) fn finish_publish(
        &self,
        item: DistributionItem,
        source: &'static str,
    ) -> Result<DistributionItem, DistributionError> {
        match self.complete_publish(item.clone()) {
            Ok(published) => Ok(published),
            Err(err) => {
                self.record_failure(&item, &err, source);
                Err(err)
            }
        }
    }

    fn complete_publish(
        &self,
        mut item: DistributionItem,
    ) -> Result<DistributionItem, DistributionError> {
        let mut posts = Vec::with_capacity(item.platforms.len());
        for platform in &item.platforms {
            posts.push((*platform, self.platforms.publish(&item, *platform, &item.caption)?));
        }

        let completed = self.now();
        item.transition_to(DistributionStatus::Published, completed)?;
        item.publish_completed_at = Some(completed);
        item.published_at = Some(completed);
        item.last_error.clear();
        let started = item.publish_started_at.unwrap_or(completed);
        let time_to_publish = (completed - started).num_seconds().max(0);

        let mut commit = ItemCommit::new(item.clone())
            .expecting(DistributionStatus::Publishing)
            .caption(Caption {
                id: self.ids.new_id(),
                distribution_item_id: item.id.clone(),
                platform: None,
                caption_text: item.caption.clone(),
                created_at: started,
                updated_at: completed,
            });
        for (platform, post) in posts {
            commit = commit
                .platform_status(PlatformStatus {
                    id: self.ids.new_id(),
                    distribution_item_id: item.id.clone(),
                    platform,
                    status: DistributionStatus::Published,
                    platform_post_id: post.post_id,
                    platform_post_url: post.post_url,
                    error_message: String::new(),
                    retry_count: item.retry_count,
                    max_retries: PLATFORM_MAX_RETRIES,
                    published_at: Some(completed),
                    updated_at: completed,
                })
                .analytics(PublishingAnalytics {
                    id: self.ids.new_id(),
                    distribution_item_id: item.id.clone(),
                    influencer_id: item.influencer_id.clone(),
                    campaign_id: item.campaign_id.clone(),
                    platform,
                    success: true,
                    status: DistributionStatus::Published,
                    claimed_at: item.claimed_at,
                    publish_started_at: item.publish_started_at,
                    publish_completed_at: completed,
                    time_to_publish_seconds: time_to_publish,
                    created_at: completed,
                });
        }
        let commit = commit.outbox(self.outcome_event(
            EVENT_DISTRIBUTION_PUBLISHED,
            &item,
            None,
            completed,
        )?);

        self.repository.commit(commit).map_err(|e| {
            error!(event = "distribution_publish_complete_state_update_failed", item_id = %item.id, error = %e, "publish completion write failed");
            e
        })?;

        info!(
            event = "distribution_item_published",
            item_id = %item.id,
            influencer_id = %item.influencer_id,
            platform_count = item.platforms.len(),
            "distribution item published"
        );
        Ok(item)
    }

    /// Failure handler: mark the item `Failed`, bump `retry_count`, store the
    /// cause and append `distribution.failed`, in one commit.
    ///
    /// Best effort. A failure here is logged and dropped so the caller still
    /// sees the original `cause`.
    pub(super) fn record_failure(
        &self,
        item: &DistributionItem,
        cause: &DistributionError,
        source: &'static str,
    ) {
        let now = self.now();
        let mut failed = item.clone();
        if let Err(e) = failed.transition_to(DistributionStatus::Failed, now) {
            error!(event = "distribution_publish_failure_not_recorded", item_id = %item.id, source, error = %e, "item cannot move to failed");
            return;
        }
        failed.retry_count += 1;
        failed.last_error = cause.to_string().trim().to_string();

        let result = self
            .outcome_event(EVENT_DISTRIBUTION_FAILED, &failed, Some(failed.last_error.clone()), now)
            .and_then(|message| {
                self.repository
                    .commit(ItemCommit::new(failed.clone()).expecting(item.status).outbox(message))
                    .map_err(DistributionError::from)
            });

        match result {
            Ok(()) => warn!(
                event = "distribution_publish_failed",
                item_id = %failed.id,
                source,
                retry_count = failed.retry_count,
                error = %cause,
                "publish failure recorded"
            ),
            Err(e) => error!(
                event = "distribution_publish_failure_record_failed",
                item_id = %failed.id,
                source,
                error = %e,
                cause = %cause,
                "could not record publish failure"
            ),
        }
    }
}

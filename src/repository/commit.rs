use crate::domain::{
    Caption, DistributionItem, DistributionStatus, PlatformStatus, PublishingAnalytics,
};
use crate::outbox::OutboxMessage;

/// Everything one state transition writes, applied atomically.
///
/// A store must apply all of it or none of it. When `expected_status` is set
/// the commit only lands if the stored row still has that status.
///
/// ```ignore
/// repo.commit(
///     ItemCommit::new(item)
///         .expecting(DistributionStatus::Publishing)
///         .caption(caption)
///         .platform_status(status)
///         .outbox(message),
/// )?;
/// ```
#[derive(Debug, Clone)]
pub struct ItemCommit {
    pub item: DistributionItem,
    pub expected_status: Option<DistributionStatus>,
    pub caption: Option<Caption>,
    pub platform_statuses: Vec<PlatformStatus>,
    pub analytics: Vec<PublishingAnalytics>,
    pub outbox: Vec<OutboxMessage>,
}

impl ItemCommit {
    pub fn new(item: DistributionItem) -> Self {
        Self {
            item,
            expected_status: None,
            caption: None,
            platform_statuses: Vec::new(),
            analytics: Vec::new(),
            outbox: Vec::new(),
        }
    }

    pub fn expecting(mut self, status: DistributionStatus) -> Self {
        self.expected_status = Some(status);
        self
    }

    pub fn caption(mut self, caption: Caption) -> Self {
        self.caption = Some(caption);
        self
    }

    pub fn platform_status(mut self, status: PlatformStatus) -> Self {
        self.platform_statuses.push(status);
        self
    }

    pub fn analytics(mut self, analytics: PublishingAnalytics) -> Self {
        self.analytics.push(analytics);
        self
    }

    pub fn outbox(mut self, message: OutboxMessage) -> Self {
        self.outbox.push(message);
        self
    }
}

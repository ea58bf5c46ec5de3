use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Platform;
use crate::error::DistributionError;

/// Lifecycle state of a [`DistributionItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionStatus {
    Claimed,
    Scheduled,
    Publishing,
    Published,
    Failed,
    Cancelled,
}

impl DistributionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistributionStatus::Claimed => "claimed",
            DistributionStatus::Scheduled => "scheduled",
            DistributionStatus::Publishing => "publishing",
            DistributionStatus::Published => "published",
            DistributionStatus::Failed => "failed",
            DistributionStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DistributionStatus::Published | DistributionStatus::Cancelled
        )
    }

    /// The lifecycle transition table.
    ///
    /// `Scheduled -> Scheduled` is a reschedule and `Publishing -> Publishing`
    /// is a resumed publish after a crash between the two publish writes.
    pub fn can_transition_to(&self, next: DistributionStatus) -> bool {
        use DistributionStatus::*;

        if next == Cancelled {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (Claimed, Scheduled)
                | (Claimed, Publishing)
                | (Scheduled, Scheduled)
                | (Scheduled, Publishing)
                | (Scheduled, Failed)
                | (Publishing, Publishing)
                | (Publishing, Published)
                | (Publishing, Failed)
                | (Failed, Scheduled)
                | (Failed, Publishing)
        )
    }
}

impl fmt::Display for DistributionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A clip claimed by an influencer for distribution to social platforms.
///
/// Never hard-deleted; `Published` and `Cancelled` are terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionItem {
    pub id: String,
    pub influencer_id: String,
    pub clip_id: String,
    pub campaign_id: String,
    pub status: DistributionStatus,
    pub claimed_at: DateTime<Utc>,
    pub claim_expires_at: DateTime<Utc>,
    pub scheduled_for_utc: Option<DateTime<Utc>>,
    pub timezone: String,
    pub platforms: Vec<Platform>,
    pub caption: String,
    pub last_error: String,
    pub retry_count: u32,
    pub publish_started_at: Option<DateTime<Utc>>,
    pub publish_completed_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl DistributionItem {
    /// A freshly claimed item.
    pub fn claimed(
        id: impl Into<String>,
        influencer_id: impl Into<String>,
        clip_id: impl Into<String>,
        campaign_id: impl Into<String>,
        claimed_at: DateTime<Utc>,
        claim_expires_at: DateTime<Utc>,
    ) -> Self {
        DistributionItem {
            id: id.into(),
            influencer_id: influencer_id.into(),
            clip_id: clip_id.into(),
            campaign_id: campaign_id.into(),
            status: DistributionStatus::Claimed,
            claimed_at,
            claim_expires_at,
            scheduled_for_utc: None,
            timezone: String::new(),
            platforms: Vec::new(),
            caption: String::new(),
            last_error: String::new(),
            retry_count: 0,
            publish_started_at: None,
            publish_completed_at: None,
            published_at: None,
            updated_at: claimed_at,
        }
    }

    pub fn is_owned_by(&self, influencer_id: &str) -> bool {
        self.influencer_id == influencer_id.trim()
    }

    /// Whether this item shares the (influencer, clip, campaign) natural key.
    pub fn same_natural_key(&self, other: &DistributionItem) -> bool {
        self.influencer_id == other.influencer_id
            && self.clip_id == other.clip_id
            && self.campaign_id == other.campaign_id
    }

    /// Move to `next` if the transition table allows it.
    pub fn transition_to(
        &mut self,
        next: DistributionStatus,
        at: DateTime<Utc>,
    ) -> Result<(), DistributionError> {
        if !self.status.can_transition_to(next) {
            return Err(DistributionError::InvalidStateTransition {
                item_id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = at;
        Ok(())
    }
}

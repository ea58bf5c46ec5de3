use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DistributionStatus, Platform};
use crate::error::DistributionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayKind {
    Intro,
    Outro,
}

impl OverlayKind {
    pub fn parse(value: &str) -> Result<OverlayKind, DistributionError> {
        match value.trim().to_lowercase().as_str() {
            "intro" => Ok(OverlayKind::Intro),
            "outro" => Ok(OverlayKind::Outro),
            other => Err(DistributionError::InvalidInput(format!(
                "unknown overlay type {other:?}"
            ))),
        }
    }
}

/// Intro/outro clip attached to an item before publishing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    pub id: String,
    pub distribution_item_id: String,
    pub overlay_type: OverlayKind,
    pub asset_path: String,
    pub duration_seconds: f64,
    pub created_at: DateTime<Utc>,
}

/// Caption used for a publish. `platform == None` is the shared caption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caption {
    pub id: String,
    pub distribution_item_id: String,
    pub platform: Option<Platform>,
    pub caption_text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-platform publish result, upserted by (item, platform).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformStatus {
    pub id: String,
    pub distribution_item_id: String,
    pub platform: Platform,
    pub status: DistributionStatus,
    pub platform_post_id: String,
    pub platform_post_url: String,
    pub error_message: String,
    pub retry_count: u32,
    pub max_retries: u32,
    pub published_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// One row per platform per successful publish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishingAnalytics {
    pub id: String,
    pub distribution_item_id: String,
    pub influencer_id: String,
    pub campaign_id: String,
    pub platform: Platform,
    pub success: bool,
    pub status: DistributionStatus,
    pub claimed_at: DateTime<Utc>,
    pub publish_started_at: Option<DateTime<Utc>>,
    pub publish_completed_at: DateTime<Utc>,
    pub time_to_publish_seconds: i64,
    pub created_at: DateTime<Utc>,
}

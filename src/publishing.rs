//! The publish side effect: pushing an item to a social platform.

use thiserror::Error;

use crate::domain::{DistributionItem, Platform};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformPost {
    pub post_id: String,
    pub post_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformPublishError {
    #[error("{platform} rejected the post: {reason}")]
    Rejected { platform: Platform, reason: String },
    #[error("{platform} is unavailable: {reason}")]
    Unavailable { platform: Platform, reason: String },
}

pub trait PlatformPublisher: Send + Sync {
    fn publish(
        &self,
        item: &DistributionItem,
        platform: Platform,
        caption: &str,
    ) -> Result<PlatformPost, PlatformPublishError>;
}

/// Never fails; posts are addressed by item id.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyntheticPlatformPublisher;

impl PlatformPublisher for SyntheticPlatformPublisher {
    fn publish(
        &self,
        item: &DistributionItem,
        platform: Platform,
        _caption: &str,
    ) -> Result<PlatformPost, PlatformPublishError> {
        Ok(PlatformPost {
            post_id: item.id.clone(),
            post_url: format!("https://social.example/{}/post/{}", platform, item.id),
        })
    }
}

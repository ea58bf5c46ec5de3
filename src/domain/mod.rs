//! Distribution aggregate and the rows written alongside it.

mod item;
mod platform;
mod records;

pub use item::{DistributionItem, DistributionStatus};
pub use platform::{normalize_platforms, Platform};
pub use records::{Caption, Overlay, OverlayKind, PlatformStatus, PublishingAnalytics};

//! Persistence boundary for the distribution aggregate.
//!
//! `Repository` is the port the command layer talks to. `InMemoryStore` is
//! the reference adapter; it also implements the outbox, idempotency and
//! dedup ports so that an item commit and its outbox rows share one lock.

mod commit;
mod error;
mod in_memory;

use chrono::{DateTime, Utc};

use crate::domain::{DistributionItem, DistributionStatus, Overlay};

pub use commit::ItemCommit;
pub use error::RepositoryError;
pub use in_memory::InMemoryStore;
pub(crate) use in_memory::StoreState;

/// Result of [`Repository::create_item`].
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    Created(DistributionItem),
    /// A row with the same id or the same (influencer, clip, campaign) key
    /// already exists; this is the stored row.
    Existing(DistributionItem),
}

impl CreateOutcome {
    pub fn into_item(self) -> DistributionItem {
        match self {
            CreateOutcome::Created(item) | CreateOutcome::Existing(item) => item,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, CreateOutcome::Created(_))
    }
}

pub trait Repository: Send + Sync {
    /// Insert a freshly claimed item unless its id or natural key is taken.
    fn create_item(&self, item: DistributionItem) -> Result<CreateOutcome, RepositoryError>;

    fn get_item(&self, id: &str) -> Result<Option<DistributionItem>, RepositoryError>;

    /// Items owned by `influencer_id`, most recently claimed first.
    fn list_items_by_influencer(
        &self,
        influencer_id: &str,
    ) -> Result<Vec<DistributionItem>, RepositoryError>;

    /// `Scheduled` items due at or before `threshold`, earliest first.
    fn list_due_scheduled(
        &self,
        threshold: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<DistributionItem>, RepositoryError>;

    fn campaign_for_clip(&self, clip_id: &str) -> Result<Option<String>, RepositoryError>;

    fn add_overlay(&self, overlay: Overlay) -> Result<(), RepositoryError>;

    /// Apply an [`ItemCommit`] atomically.
    fn commit(&self, commit: ItemCommit) -> Result<(), RepositoryError>;

    /// Plain status-gated update with no side rows.
    fn update_item(
        &self,
        item: DistributionItem,
        expected: DistributionStatus,
    ) -> Result<(), RepositoryError> {
        self.commit(ItemCommit::new(item).expecting(expected))
    }
}

//! Transactional outbox.
//!
//! The outbox has two phases:
//! 1. **Write** - an [`OutboxMessage`] is appended in the same atomic unit as
//!    the aggregate change it announces (see `repository::ItemCommit`).
//! 2. **Relay** - [`OutboxRelay`] lists pending rows, publishes them to the
//!    bus and marks them published.

mod in_memory;
mod message;
mod relay;

use chrono::{DateTime, Utc};

use crate::envelope::EventEnvelope;
use crate::repository::RepositoryError;

pub use message::OutboxMessage;
pub use relay::{OutboxRelay, RelayReport, DEFAULT_RELAY_BATCH_SIZE, DEFAULT_RELAY_TOPIC};

pub trait OutboxWriter: Send + Sync {
    /// Append an event. Re-appending an identical row is a no-op; the same id
    /// with a different payload is [`RepositoryError::OutboxConflict`].
    fn append_outbox(&self, envelope: &EventEnvelope) -> Result<(), RepositoryError>;
}

pub trait OutboxRepository: Send + Sync {
    /// Up to `limit` unpublished rows, oldest first.
    fn list_pending_outbox(&self, limit: usize) -> Result<Vec<OutboxMessage>, RepositoryError>;

    fn mark_outbox_published(
        &self,
        outbox_id: &str,
        published_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
}

impl<T: OutboxRepository + ?Sized> OutboxRepository for std::sync::Arc<T> {
    fn list_pending_outbox(&self, limit: usize) -> Result<Vec<OutboxMessage>, RepositoryError> {
        (**self).list_pending_outbox(limit)
    }

    fn mark_outbox_published(
        &self,
        outbox_id: &str,
        published_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        (**self).mark_outbox_published(outbox_id, published_at)
    }
}

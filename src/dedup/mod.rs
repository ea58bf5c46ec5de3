//! Consumer-side deduplication of inbound events.

mod in_memory;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::repository::RepositoryError;

pub const DEFAULT_DEDUP_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDedupRecord {
    pub event_id: String,
    pub payload_hash: String,
    pub expires_at: DateTime<Utc>,
}

pub trait EventDedupStore: Send + Sync {
    /// Reserve `event_id` for processing.
    ///
    /// Returns `Ok(false)` the first time, `Ok(true)` when the same event was
    /// already reserved with the same hash, and
    /// [`RepositoryError::EventConflict`] when the hash differs.
    fn reserve_event(
        &self,
        event_id: &str,
        payload_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;

    /// Drop a reservation whose processing failed so a redelivery can retry.
    fn release_event(&self, event_id: &str) -> Result<(), RepositoryError>;
}

/// SHA-256 hex of the raw event bytes.
pub fn payload_hash(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

use chrono::{DateTime, Utc};

use super::{EventDedupRecord, EventDedupStore};
use crate::repository::{InMemoryStore, RepositoryError};

impl EventDedupStore for InMemoryStore {
    fn reserve_event(
        &self,
        event_id: &str,
        payload_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let now = self.now();
        let mut state = self.write("dedup reserve")?;

        if let Some(existing) = state.dedup.get(event_id) {
            if existing.expires_at > now {
                if existing.payload_hash != payload_hash {
                    return Err(RepositoryError::EventConflict(event_id.to_string()));
                }
                return Ok(true);
            }
        }

        state.dedup.insert(
            event_id.to_string(),
            EventDedupRecord {
                event_id: event_id.to_string(),
                payload_hash: payload_hash.to_string(),
                expires_at,
            },
        );
        Ok(false)
    }

    fn release_event(&self, event_id: &str) -> Result<(), RepositoryError> {
        self.write("dedup release")?.dedup.remove(event_id);
        Ok(())
    }
}

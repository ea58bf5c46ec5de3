use chrono::{DateTime, Utc};

use super::{IdempotencyRecord, IdempotencyStore};
use crate::repository::{InMemoryStore, RepositoryError};

impl IdempotencyStore for InMemoryStore {
    fn get_record(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<IdempotencyRecord>, RepositoryError> {
        let mut state = self.write("idempotency read")?;
        let expired = match state.idempotency.get(key) {
            None => return Ok(None),
            Some(record) => record.expires_at <= now,
        };
        if expired {
            state.idempotency.remove(key);
            return Ok(None);
        }
        Ok(state.idempotency.get(key).cloned())
    }

    fn put_record(&self, record: IdempotencyRecord) -> Result<(), RepositoryError> {
        let now = self.now();
        let mut state = self.write("idempotency write")?;
        if let Some(existing) = state.idempotency.get(&record.key) {
            if existing.expires_at > now && existing.request_hash != record.request_hash {
                return Err(RepositoryError::IdempotencyConflict(record.key));
            }
        }
        state.idempotency.insert(record.key.clone(), record);
        Ok(())
    }
}

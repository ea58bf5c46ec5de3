use chrono::{DateTime, Utc};

use super::{OutboxMessage, OutboxRepository, OutboxWriter};
use crate::envelope::EventEnvelope;
use crate::repository::{InMemoryStore, RepositoryError, StoreState};

impl StoreState {
    /// `Ok(true)` when an identical row is already stored.
    pub(crate) fn check_outbox(&self, message: &OutboxMessage) -> Result<bool, RepositoryError> {
        match self
            .outbox
            .iter()
            .find(|row| row.outbox_id == message.outbox_id)
        {
            Some(row) if row.payload == message.payload => Ok(true),
            Some(_) => Err(RepositoryError::OutboxConflict(message.outbox_id.clone())),
            None => Ok(false),
        }
    }

    pub(crate) fn append_outbox(&mut self, message: OutboxMessage) -> Result<(), RepositoryError> {
        if !self.check_outbox(&message)? {
            self.outbox.push(message);
        }
        Ok(())
    }
}

impl OutboxWriter for InMemoryStore {
    fn append_outbox(&self, envelope: &EventEnvelope) -> Result<(), RepositoryError> {
        let message = OutboxMessage::from_envelope(envelope)
            .map_err(|e| RepositoryError::Encoding(e.to_string()))?;
        self.write("outbox write")?.append_outbox(message)
    }
}

impl OutboxRepository for InMemoryStore {
    fn list_pending_outbox(&self, limit: usize) -> Result<Vec<OutboxMessage>, RepositoryError> {
        let state = self.read("outbox read")?;
        let mut pending: Vec<OutboxMessage> = state
            .outbox
            .iter()
            .filter(|row| row.is_pending())
            .cloned()
            .collect();
        // Stable sort keeps insertion order among equal timestamps.
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        pending.truncate(limit);
        Ok(pending)
    }

    fn mark_outbox_published(
        &self,
        outbox_id: &str,
        published_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut state = self.write("outbox write")?;
        let row = state
            .outbox
            .iter_mut()
            .find(|row| row.outbox_id == outbox_id.trim())
            .ok_or_else(|| RepositoryError::NotFound(outbox_id.to_string()))?;
        if row.published_at.is_none() {
            row.published_at = Some(published_at);
        }
        Ok(())
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::envelope::EventEnvelope;
use crate::error::DistributionError;

/// A pending or published integration event.
///
/// `outbox_id` is the envelope's event id, so a replayed append of the same
/// event lands on the same row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxMessage {
    pub outbox_id: String,
    pub event_type: String,
    pub partition_key: String,
    /// Serialized [`EventEnvelope`] (JSON bytes).
    #[serde(with = "crate::payload_serde")]
    pub payload: Vec<u8>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

impl OutboxMessage {
    pub fn from_envelope(envelope: &EventEnvelope) -> Result<Self, DistributionError> {
        let outbox_id = envelope.event_id.trim();
        if outbox_id.is_empty() {
            return Err(DistributionError::InvalidInput(
                "outbox event id is required".into(),
            ));
        }
        Ok(Self {
            outbox_id: outbox_id.to_string(),
            event_type: envelope.event_type.trim().to_string(),
            partition_key: envelope.partition_key.trim().to_string(),
            payload: envelope.to_bytes()?,
            created_at: envelope.occurred_at,
            published_at: None,
        })
    }

    pub fn decode(&self) -> Result<EventEnvelope, DistributionError> {
        EventEnvelope::from_bytes(&self.payload)
    }

    pub fn is_pending(&self) -> bool {
        self.published_at.is_none()
    }
}

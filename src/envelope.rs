//! Wire format shared by outbox payloads and consumed events.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::DistributionError;

pub const EVENT_DISTRIBUTION_CLAIMED: &str = "distribution.claimed";
pub const EVENT_DISTRIBUTION_PUBLISHED: &str = "distribution.published";
pub const EVENT_DISTRIBUTION_FAILED: &str = "distribution.failed";

/// Upstream topic the claim-ingestion consumer listens on.
pub const TOPIC_DISTRIBUTION_CLAIMED: &str = EVENT_DISTRIBUTION_CLAIMED;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: String,
    pub event_type: String,
    /// RFC 3339, UTC.
    pub occurred_at: DateTime<Utc>,
    pub source_service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    pub schema_version: u32,
    pub partition_key_path: String,
    pub partition_key: String,
    pub data: serde_json::Value,
}

impl EventEnvelope {
    /// Build an envelope around `data`, keyed by `claim_id`.
    ///
    /// The trace id defaults to the event id so a chain of outbox rows can be
    /// followed without a tracing backend.
    pub fn new<T: Serialize>(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        source_service: impl Into<String>,
        partition_key: impl Into<String>,
        occurred_at: DateTime<Utc>,
        data: &T,
    ) -> Result<Self, DistributionError> {
        let event_id = event_id.into();
        Ok(EventEnvelope {
            trace_id: Some(event_id.clone()),
            event_id,
            event_type: event_type.into(),
            occurred_at,
            source_service: source_service.into(),
            schema_version: SCHEMA_VERSION,
            partition_key_path: "claim_id".to_string(),
            partition_key: partition_key.into(),
            data: serde_json::to_value(data)?,
        })
    }

    pub fn decode_data<T: DeserializeOwned>(&self) -> Result<T, DistributionError> {
        Ok(serde_json::from_value(self.data.clone())?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DistributionError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DistributionError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// `data` of an upstream `distribution.claimed` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimedPayload {
    pub claim_id: String,
    pub clip_id: String,
    pub user_id: String,
    #[serde(default)]
    pub claim_type: String,
}

/// `data` of `distribution.published` and `distribution.failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionOutcomePayload {
    pub claim_id: String,
    pub distribution_item_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

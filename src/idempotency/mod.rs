//! Idempotency protocol for mutating commands.
//!
//! A command with a key hashes its significant fields, looks the key up, and
//! either replays the earlier outcome, fails with a conflict, or executes and
//! then records the hash. Records expire lazily on read.

mod in_memory;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::DistributionError;
use crate::repository::RepositoryError;

pub const DEFAULT_IDEMPOTENCY_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub key: String,
    pub operation: String,
    pub request_hash: String,
    #[serde(
        default,
        with = "crate::payload_serde::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub response_payload: Option<Vec<u8>>,
    pub expires_at: DateTime<Utc>,
}

pub trait IdempotencyStore: Send + Sync {
    /// The live record for `key`; an expired one is evicted and reported absent.
    fn get_record(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<IdempotencyRecord>, RepositoryError>;

    /// Insert or refresh a record. A live record under the same key with a
    /// different hash is [`RepositoryError::IdempotencyConflict`].
    fn put_record(&self, record: IdempotencyRecord) -> Result<(), RepositoryError>;
}

/// SHA-256 hex of the canonical JSON of `request`.
pub fn request_hash<T: Serialize>(request: &T) -> Result<String, DistributionError> {
    let body = serde_json::to_vec(request)?;
    Ok(hex::encode(Sha256::digest(&body)))
}

/// A keyed request that has not run yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyTicket {
    pub key: String,
    pub operation: String,
    pub request_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdempotencyCheck {
    /// No key supplied; run without recording.
    Untracked,
    /// Key unseen (or expired); run, then [`IdempotencyGuard::complete`].
    Fresh(IdempotencyTicket),
    /// Same key and same request as before.
    Replay(IdempotencyRecord),
}

/// Drives [`IdempotencyStore`] for one operation.
pub struct IdempotencyGuard<'a> {
    store: &'a dyn IdempotencyStore,
    ttl: Duration,
}

impl<'a> IdempotencyGuard<'a> {
    pub fn new(store: &'a dyn IdempotencyStore, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Keys are scoped per operation: `distribution:<operation>:<key>`.
    pub fn scoped_key(operation: &str, key: &str) -> String {
        format!("distribution:{}:{}", operation, key.trim())
    }

    pub fn begin<T: Serialize>(
        &self,
        operation: &str,
        key: Option<&str>,
        request: &T,
        now: DateTime<Utc>,
    ) -> Result<IdempotencyCheck, DistributionError> {
        let key = match key.map(str::trim) {
            Some(key) if !key.is_empty() => Self::scoped_key(operation, key),
            _ => return Ok(IdempotencyCheck::Untracked),
        };
        let request_hash = request_hash(request)?;

        match self.store.get_record(&key, now)? {
            Some(record) if record.request_hash == request_hash => {
                Ok(IdempotencyCheck::Replay(record))
            }
            Some(_) => {
                warn!(
                    event = "distribution_idempotency_conflict",
                    operation,
                    idempotency_key = %key,
                    "idempotency key reused with a different request"
                );
                Err(DistributionError::IdempotencyConflict(key))
            }
            None => Ok(IdempotencyCheck::Fresh(IdempotencyTicket {
                key,
                operation: operation.to_string(),
                request_hash,
            })),
        }
    }

    /// Record a successful execution.
    pub fn complete(
        &self,
        ticket: IdempotencyTicket,
        response_payload: Option<Vec<u8>>,
        now: DateTime<Utc>,
    ) -> Result<(), DistributionError> {
        self.store.put_record(IdempotencyRecord {
            key: ticket.key,
            operation: ticket.operation,
            request_hash: ticket.request_hash,
            response_payload,
            expires_at: now + self.ttl,
        })?;
        Ok(())
    }
}

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::bus::PublishError;
use crate::domain::DistributionStatus;
use crate::publishing::PlatformPublishError;
use crate::repository::RepositoryError;

/// Coarse classification of a [`DistributionError`], for callers that need to
/// branch (transport status codes, retry policy) without matching variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input. Never retried automatically.
    Validation,
    /// Illegal transition, ownership mismatch or a stale status gate.
    /// The caller should re-fetch the item.
    StateConflict,
    NotFound,
    /// Same idempotency key, different request.
    IdempotencyConflict,
    /// Same event/outbox id, different content.
    PayloadConflict,
    /// The publish side effect failed and was recorded on the item.
    PublishFailed,
    /// Persistence, bus or encoding failure.
    Transient,
}

#[derive(Debug, Error)]
pub enum DistributionError {
    #[error("invalid distribution input: {0}")]
    InvalidInput(String),
    #[error("unsupported platform: {0:?}")]
    UnsupportedPlatform(String),
    #[error("scheduled time {scheduled_for} must be between {earliest} and {latest}")]
    InvalidScheduleWindow {
        scheduled_for: DateTime<Utc>,
        earliest: DateTime<Utc>,
        latest: DateTime<Utc>,
    },
    #[error("invalid timezone: {0:?}")]
    InvalidTimezone(String),
    #[error("distribution item {item_id} is not owned by influencer {influencer_id}")]
    Unauthorized {
        item_id: String,
        influencer_id: String,
    },
    #[error("invalid distribution state transition for item {item_id}: {from} -> {to}")]
    InvalidStateTransition {
        item_id: String,
        from: DistributionStatus,
        to: DistributionStatus,
    },
    #[error("distribution item {item_id} is {status} and can no longer change")]
    TerminalState {
        item_id: String,
        status: DistributionStatus,
    },
    #[error("distribution item not found: {0}")]
    NotFound(String),
    #[error("idempotency key {0} was already used for a different request")]
    IdempotencyConflict(String),
    #[error("event {0} was already consumed with a different payload")]
    EventConflict(String),
    #[error(transparent)]
    PublishFailed(#[from] PlatformPublishError),
    #[error(transparent)]
    Repository(RepositoryError),
    #[error(transparent)]
    Bus(#[from] PublishError),
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl DistributionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DistributionError::InvalidInput(_)
            | DistributionError::UnsupportedPlatform(_)
            | DistributionError::InvalidScheduleWindow { .. }
            | DistributionError::InvalidTimezone(_) => ErrorKind::Validation,
            DistributionError::Unauthorized { .. }
            | DistributionError::InvalidStateTransition { .. }
            | DistributionError::TerminalState { .. } => ErrorKind::StateConflict,
            DistributionError::NotFound(_) => ErrorKind::NotFound,
            DistributionError::IdempotencyConflict(_) => ErrorKind::IdempotencyConflict,
            DistributionError::EventConflict(_) => ErrorKind::PayloadConflict,
            DistributionError::PublishFailed(_) => ErrorKind::PublishFailed,
            DistributionError::Repository(RepositoryError::StaleState { .. }) => {
                ErrorKind::StateConflict
            }
            DistributionError::Repository(RepositoryError::OutboxConflict(_)) => {
                ErrorKind::PayloadConflict
            }
            DistributionError::Repository(_)
            | DistributionError::Bus(_)
            | DistributionError::Serialization(_) => ErrorKind::Transient,
        }
    }

    /// Whether re-polling (relay, consumers) may succeed where this failed.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transient | ErrorKind::PublishFailed)
    }
}

impl From<RepositoryError> for DistributionError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => DistributionError::NotFound(id),
            RepositoryError::IdempotencyConflict(key) => {
                DistributionError::IdempotencyConflict(key)
            }
            RepositoryError::EventConflict(id) => DistributionError::EventConflict(id),
            other => DistributionError::Repository(other),
        }
    }
}

impl From<serde_json::Error> for DistributionError {
    fn from(err: serde_json::Error) -> Self {
        DistributionError::Serialization(err.to_string())
    }
}

impl From<bitcode::Error> for DistributionError {
    fn from(err: bitcode::Error) -> Self {
        DistributionError::Serialization(err.to_string())
    }
}

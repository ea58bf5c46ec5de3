use thiserror::Error;

use crate::domain::DistributionStatus;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("repository lock poisoned during {0}")]
    LockPoisoned(&'static str),
    #[error("distribution item not found: {0}")]
    NotFound(String),
    /// The commit was gated on a status the row no longer has.
    #[error("stale write for distribution item {id} (expected status {expected}, found {actual})")]
    StaleState {
        id: String,
        expected: DistributionStatus,
        actual: DistributionStatus,
    },
    #[error("outbox id {0} already holds a different payload")]
    OutboxConflict(String),
    #[error("idempotency key {0} is bound to a different request")]
    IdempotencyConflict(String),
    #[error("event {0} was reserved with a different payload hash")]
    EventConflict(String),
    #[error("encoding error: {0}")]
    Encoding(String),
}

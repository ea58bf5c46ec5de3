//! Outbound side of the event bus.

use std::error::Error;

use thiserror::Error;

use crate::envelope::EventEnvelope;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("serialization failed: {0}")]
    SerializationFailed(String),
    #[error("event rejected: {0}")]
    Rejected(String),
    #[error("publish timeout")]
    Timeout,
    #[error("publish error: {0}")]
    Other(Box<dyn Error + Send + Sync>),
}

/// Publishes envelopes to a topic.
///
/// Implementations might include:
/// - `InMemoryBus` - for tests and single-process wiring
/// - a Kafka or NATS producer keyed by `partition_key`
pub trait Publisher: Send + Sync {
    fn publish(&self, topic: &str, envelope: &EventEnvelope) -> Result<(), PublishError>;
}

impl<T: Publisher + ?Sized> Publisher for std::sync::Arc<T> {
    fn publish(&self, topic: &str, envelope: &EventEnvelope) -> Result<(), PublishError> {
        (**self).publish(topic, envelope)
    }
}

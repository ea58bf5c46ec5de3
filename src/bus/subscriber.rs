//! Inbound side of the event bus.

use std::sync::Arc;

use super::PublishError;
use crate::envelope::EventEnvelope;
use crate::error::DistributionError;

/// Handles one delivered envelope. An error means "not processed": the bus
/// should redeliver.
pub type EventHandler =
    Arc<dyn Fn(&EventEnvelope) -> Result<(), DistributionError> + Send + Sync>;

/// Push-based subscription with consumer groups.
///
/// Each group keeps its own position on a topic.
pub trait Subscriber: Send + Sync {
    fn subscribe(
        &self,
        topic: &str,
        group: &str,
        handler: EventHandler,
    ) -> Result<(), PublishError>;
}

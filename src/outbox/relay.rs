use std::sync::Arc;

use tracing::{debug, error, info};

use super::OutboxRepository;
use crate::bus::Publisher;
use crate::clock::{Clock, SystemClock};
use crate::error::DistributionError;

pub const DEFAULT_RELAY_TOPIC: &str = "distribution.events";
pub const DEFAULT_RELAY_BATCH_SIZE: usize = 100;

/// Outcome of one [`OutboxRelay::run_once`] cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RelayReport {
    /// Pending rows listed this cycle.
    pub pending: usize,
    /// Rows published and marked.
    pub published: usize,
}

/// Delivers pending outbox rows to the bus, oldest first.
///
/// A row is marked published only after the bus accepted it. The first
/// failure ends the cycle and leaves that row (and everything after it)
/// pending for the next run, so delivery is at-least-once.
pub struct OutboxRelay<R, P> {
    outbox: R,
    publisher: P,
    clock: Arc<dyn Clock>,
    topic: String,
    batch_size: usize,
}

impl<R, P> OutboxRelay<R, P> {
    pub fn new(outbox: R, publisher: P) -> Self {
        Self {
            outbox,
            publisher,
            clock: Arc::new(SystemClock),
            topic: DEFAULT_RELAY_TOPIC.to_string(),
            batch_size: DEFAULT_RELAY_BATCH_SIZE,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    /// Zero falls back to the default of 100.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = if size == 0 {
            DEFAULT_RELAY_BATCH_SIZE
        } else {
            size
        };
        self
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }
}

impl<R: OutboxRepository, P: Publisher> OutboxRelay<R, P> {
    pub fn run_once(&self) -> Result<RelayReport, DistributionError> {
        let rows = self.outbox.list_pending_outbox(self.batch_size).map_err(|e| {
            error!(event = "distribution_outbox_list_failed", error = %e, "outbox relay could not list pending rows");
            e
        })?;
        let mut report = RelayReport {
            pending: rows.len(),
            published: 0,
        };
        if rows.is_empty() {
            debug!(event = "distribution_outbox_idle", "no pending outbox rows");
            return Ok(report);
        }

        for row in rows {
            let envelope = row.decode().map_err(|e| {
                error!(event = "distribution_outbox_decode_failed", outbox_id = %row.outbox_id, error = %e, "outbox row is not a valid envelope");
                e
            })?;

            self.publisher.publish(&self.topic, &envelope).map_err(|e| {
                error!(
                    event = "distribution_outbox_publish_failed",
                    outbox_id = %row.outbox_id,
                    event_type = %row.event_type,
                    topic = %self.topic,
                    error = %e,
                    "outbox publish failed; row stays pending"
                );
                DistributionError::from(e)
            })?;

            self.outbox
                .mark_outbox_published(&row.outbox_id, self.clock.now())
                .map_err(|e| {
                    error!(event = "distribution_outbox_mark_failed", outbox_id = %row.outbox_id, error = %e, "published row could not be marked");
                    DistributionError::from(e)
                })?;

            report.published += 1;
            info!(
                event = "distribution_outbox_published",
                outbox_id = %row.outbox_id,
                event_type = %row.event_type,
                partition_key = %row.partition_key,
                "outbox row published"
            );
        }

        Ok(report)
    }
}

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use tracing::warn;

use super::{EventHandler, PublishError, Publisher, Subscriber};
use crate::envelope::EventEnvelope;
use crate::error::DistributionError;

struct Subscription {
    topic: String,
    group: String,
    handler: EventHandler,
    /// Index into the shared log of the next entry to look at.
    position: usize,
}

/// In-memory bus for tests and single-process wiring.
///
/// - Thread-safe; clones share the same log and subscriptions
/// - Published envelopes go to an append-only log of `(topic, envelope)`
/// - Each `(topic, group)` subscription keeps its own position
/// - Delivery happens on [`InMemoryBus::drain`]; a handler error leaves the
///   position on that envelope so the next drain redelivers it
///
/// ```
/// use distribution_core::bus::{InMemoryBus, Publisher};
/// use distribution_core::envelope::EventEnvelope;
/// use chrono::Utc;
///
/// let bus = InMemoryBus::new();
/// let envelope = EventEnvelope::new(
///     "evt-1", "distribution.published", "distribution-service", "item-1",
///     Utc::now(), &serde_json::json!({}),
/// ).unwrap();
/// bus.publish("distribution.events", &envelope).unwrap();
/// assert_eq!(bus.published("distribution.events").len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryBus {
    log: Arc<RwLock<Vec<(String, EventEnvelope)>>>,
    subscriptions: Arc<Mutex<Vec<Subscription>>>,
    fail_next: Arc<AtomicUsize>,
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` publishes fail with `ConnectionFailed`.
    pub fn fail_next_publishes(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Every envelope published to `topic`, in order.
    pub fn published(&self, topic: &str) -> Vec<EventEnvelope> {
        self.log
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, e)| e.clone())
            .collect()
    }

    pub fn event_types(&self) -> Vec<String> {
        self.log
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .map(|(_, e)| e.event_type.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.log.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn subscriptions(&self) -> MutexGuard<'_, Vec<Subscription>> {
        self.subscriptions.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Deliver everything pending to every subscription.
    ///
    /// Handlers run without any bus lock held. Returns how many envelopes
    /// were handled, or the first handler error after every subscription
    /// had its turn.
    pub fn drain(&self) -> Result<usize, DistributionError> {
        let subscription_count = self.subscriptions().len();
        let mut delivered = 0;
        let mut first_error = None;

        for index in 0..subscription_count {
            let (topic, group, handler, start) = {
                let subs = self.subscriptions();
                let sub = &subs[index];
                (sub.topic.clone(), sub.group.clone(), Arc::clone(&sub.handler), sub.position)
            };
            let (pending, end): (Vec<(usize, EventEnvelope)>, usize) = {
                let log = self.log.read().unwrap_or_else(|p| p.into_inner());
                let pending = log
                    .iter()
                    .enumerate()
                    .skip(start)
                    .filter(|(_, (t, _))| *t == topic)
                    .map(|(i, (_, e))| (i, e.clone()))
                    .collect();
                (pending, log.len())
            };

            let mut position = end;
            for (log_index, envelope) in pending {
                match handler(&envelope) {
                    Ok(()) => delivered += 1,
                    Err(err) => {
                        warn!(
                            event = "bus_delivery_failed",
                            topic = %topic,
                            group = %group,
                            event_id = %envelope.event_id,
                            error = %err,
                            "handler failed; envelope will be redelivered"
                        );
                        position = log_index;
                        first_error.get_or_insert(err);
                        break;
                    }
                }
            }

            if let Some(sub) = self.subscriptions().get_mut(index) {
                sub.position = position;
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(delivered),
        }
    }
}

impl Publisher for InMemoryBus {
    fn publish(&self, topic: &str, envelope: &EventEnvelope) -> Result<(), PublishError> {
        let injected = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(PublishError::ConnectionFailed("injected failure".into()));
        }
        self.log
            .write()
            .map_err(|_| PublishError::ConnectionFailed("bus log poisoned".into()))?
            .push((topic.to_string(), envelope.clone()));
        Ok(())
    }
}

impl Subscriber for InMemoryBus {
    /// A second subscription for the same `(topic, group)` replaces the
    /// handler and keeps the position.
    fn subscribe(
        &self,
        topic: &str,
        group: &str,
        handler: EventHandler,
    ) -> Result<(), PublishError> {
        let mut subs = self.subscriptions();
        match subs.iter_mut().find(|s| s.topic == topic && s.group == group) {
            Some(existing) => existing.handler = handler,
            None => subs.push(Subscription {
                topic: topic.to_string(),
                group: group.to_string(),
                handler,
                position: 0,
            }),
        }
        Ok(())
    }
}

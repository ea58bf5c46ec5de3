use std::sync::Arc;

use tracing::{error, info, warn};

use crate::bus::{EventHandler, PublishError, Subscriber};
use crate::clock::Clock;
use crate::commands::{ClaimCommand, DistributionCommands};
use crate::dedup::{payload_hash, EventDedupStore};
use crate::domain::DistributionItem;
use crate::envelope::{ClaimedPayload, EventEnvelope, TOPIC_DISTRIBUTION_CLAIMED};
use crate::error::{DistributionError, ErrorKind};

/// What [`ClaimedConsumer::handle`] did with one delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsumeOutcome {
    Applied(DistributionItem),
    /// Event id already reserved with the same payload; nothing was done.
    Duplicate,
}

/// Ingests upstream `distribution.claimed` events.
///
/// The upstream claim id becomes both the item id and the idempotency key,
/// so replays converge on one row even without the dedup store.
#[derive(Clone)]
pub struct ClaimedConsumer {
    commands: DistributionCommands,
    dedup: Arc<dyn EventDedupStore>,
    clock: Arc<dyn Clock>,
}

impl ClaimedConsumer {
    pub fn new(
        commands: DistributionCommands,
        dedup: Arc<dyn EventDedupStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            commands,
            dedup,
            clock,
        }
    }

    /// Subscribe to the claimed topic under the configured consumer group.
    ///
    /// Validation failures and payload conflicts are acknowledged so one bad
    /// event cannot hold back the group; every other error leaves the event
    /// for redelivery.
    pub fn start(&self, subscriber: &dyn Subscriber) -> Result<(), PublishError> {
        let consumer = self.clone();
        let handler: EventHandler = Arc::new(move |envelope: &EventEnvelope| {
            match consumer.handle(envelope) {
                Ok(_) => Ok(()),
                Err(err) if is_poison(&err) => {
                    warn!(
                        event = "distribution_claimed_event_dropped",
                        event_id = %envelope.event_id,
                        error = %err,
                        "claimed event acknowledged without applying"
                    );
                    Ok(())
                }
                Err(err) => Err(err),
            }
        });
        let group = &self.commands.config().claimed_consumer_group;
        subscriber.subscribe(TOPIC_DISTRIBUTION_CLAIMED, group, handler)?;
        info!(
            event = "distribution_claimed_consumer_started",
            topic = TOPIC_DISTRIBUTION_CLAIMED,
            group = %group,
            "claimed consumer subscribed"
        );
        Ok(())
    }

    pub fn handle(&self, envelope: &EventEnvelope) -> Result<ConsumeOutcome, DistributionError> {
        let payload = decode(envelope)?;
        let hash = payload_hash(&serde_json::to_vec(&envelope.data)?);
        let expires_at = self.clock.now() + self.commands.config().dedup_ttl;

        let already_processed = self
            .dedup
            .reserve_event(&envelope.event_id, &hash, expires_at)
            .map_err(|e| {
                error!(event = "distribution_claimed_dedup_failed", event_id = %envelope.event_id, error = %e, "dedup reservation failed");
                DistributionError::from(e)
            })?;
        if already_processed {
            warn!(
                event = "distribution_claimed_duplicate",
                event_id = %envelope.event_id,
                claim_id = %payload.claim_id,
                "event already processed"
            );
            return Ok(ConsumeOutcome::Duplicate);
        }

        match self.apply(&payload) {
            Ok(item) => {
                info!(
                    event = "distribution_claimed_applied",
                    event_id = %envelope.event_id,
                    item_id = %item.id,
                    "claimed event applied"
                );
                Ok(ConsumeOutcome::Applied(item))
            }
            Err(err) => {
                if let Err(release) = self.dedup.release_event(&envelope.event_id) {
                    error!(
                        event = "distribution_claimed_release_failed",
                        event_id = %envelope.event_id,
                        error = %release,
                        "could not release dedup reservation"
                    );
                }
                error!(
                    event = "distribution_claimed_apply_failed",
                    event_id = %envelope.event_id,
                    claim_id = %payload.claim_id,
                    error = %err,
                    "claimed event not applied"
                );
                Err(err)
            }
        }
    }

    fn apply(&self, payload: &ClaimedPayload) -> Result<DistributionItem, DistributionError> {
        let campaign_id = self
            .commands
            .repository()
            .campaign_for_clip(&payload.clip_id)?
            .ok_or_else(|| {
                DistributionError::NotFound(format!("campaign for clip {}", payload.clip_id))
            })?;

        let outcome = self.commands.claim(ClaimCommand {
            item_id: Some(payload.claim_id.clone()),
            influencer_id: payload.user_id.clone(),
            clip_id: payload.clip_id.clone(),
            campaign_id,
            idempotency_key: Some(payload.claim_id.clone()),
        })?;
        Ok(outcome.into_value())
    }
}

/// Errors that redelivering the same event can never fix.
fn is_poison(err: &DistributionError) -> bool {
    matches!(err.kind(), ErrorKind::Validation | ErrorKind::PayloadConflict)
}

fn decode(envelope: &EventEnvelope) -> Result<ClaimedPayload, DistributionError> {
    let payload: ClaimedPayload = envelope.decode_data().map_err(|e| {
        warn!(event = "distribution_claimed_decode_failed", event_id = %envelope.event_id, error = %e, "undecodable claimed event");
        DistributionError::InvalidInput(format!("undecodable claimed event: {e}"))
    })?;
    if envelope.event_id.trim().is_empty()
        || payload.claim_id.trim().is_empty()
        || payload.clip_id.trim().is_empty()
        || payload.user_id.trim().is_empty()
    {
        warn!(
            event = "distribution_claimed_invalid_payload",
            event_id = %envelope.event_id,
            "claimed event is missing fields"
        );
        return Err(DistributionError::InvalidInput(
            "claimed event needs event_id, claim_id, clip_id and user_id".into(),
        ));
    }
    Ok(payload)
}

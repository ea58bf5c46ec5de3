//! Use-case layer for the distribution lifecycle.
//!
//! Every mutating command follows the same protocol: idempotency check,
//! state-machine validation against the stored item, one atomic
//! [`ItemCommit`](crate::repository::ItemCommit) (aggregate plus outbox
//! rows), then the idempotency record.

mod claim;
mod overlay;
mod publish;
mod retry;
mod schedule;
mod scheduler;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::clock::{Clock, IdGenerator};
use crate::config::DistributionConfig;
use crate::domain::DistributionItem;
use crate::envelope::{DistributionOutcomePayload, EventEnvelope};
use crate::error::DistributionError;
use crate::idempotency::{IdempotencyCheck, IdempotencyGuard, IdempotencyRecord, IdempotencyStore};
use crate::outbox::OutboxMessage;
use crate::publishing::{PlatformPublisher, SyntheticPlatformPublisher};
use crate::repository::Repository;

pub use claim::ClaimCommand;
pub use overlay::AddOverlayCommand;
pub use publish::PublishMultiCommand;
pub use retry::RetryCommand;
pub use schedule::{RescheduleCommand, ScheduleCommand};
pub use scheduler::SweepReport;

/// A command result plus whether it was served from an idempotency record.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutcome<T> {
    pub value: T,
    pub replayed: bool,
}

impl<T> CommandOutcome<T> {
    pub fn fresh(value: T) -> Self {
        Self {
            value,
            replayed: false,
        }
    }

    pub fn replayed(value: T) -> Self {
        Self {
            value,
            replayed: true,
        }
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

/// The distribution command layer.
///
/// Holds only ports; any [`Repository`] / [`IdempotencyStore`] pair works.
#[derive(Clone)]
pub struct DistributionCommands {
    repository: Arc<dyn Repository>,
    idempotency: Arc<dyn IdempotencyStore>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    platforms: Arc<dyn PlatformPublisher>,
    config: DistributionConfig,
}

impl DistributionCommands {
    pub fn new(
        repository: Arc<dyn Repository>,
        idempotency: Arc<dyn IdempotencyStore>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            repository,
            idempotency,
            clock,
            ids,
            platforms: Arc::new(SyntheticPlatformPublisher),
            config: DistributionConfig::default(),
        }
    }

    pub fn with_platform_publisher(mut self, platforms: Arc<dyn PlatformPublisher>) -> Self {
        self.platforms = platforms;
        self
    }

    pub fn with_config(mut self, config: DistributionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &DistributionConfig {
        &self.config
    }

    pub fn repository(&self) -> &Arc<dyn Repository> {
        &self.repository
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Run `execute` under the idempotency protocol for `operation`.
    ///
    /// `execute` returns the value plus an optional payload to cache;
    /// `replay` rebuilds the value from a stored record.
    fn idempotent<C, T>(
        &self,
        operation: &'static str,
        key: Option<&str>,
        request: &C,
        replay: impl FnOnce(&IdempotencyRecord) -> Result<T, DistributionError>,
        execute: impl FnOnce() -> Result<(T, Option<Vec<u8>>), DistributionError>,
    ) -> Result<CommandOutcome<T>, DistributionError>
    where
        C: Serialize,
    {
        let guard = IdempotencyGuard::new(self.idempotency.as_ref(), self.config.idempotency_ttl);
        match guard.begin(operation, key, request, self.now())? {
            IdempotencyCheck::Replay(record) => {
                warn!(
                    event = "distribution_command_replayed",
                    operation,
                    idempotency_key = %record.key,
                    "idempotent replay"
                );
                replay(&record).map(CommandOutcome::replayed)
            }
            IdempotencyCheck::Untracked => execute().map(|(value, _)| CommandOutcome::fresh(value)),
            IdempotencyCheck::Fresh(ticket) => {
                let (value, payload) = execute()?;
                guard.complete(ticket, payload, self.now())?;
                Ok(CommandOutcome::fresh(value))
            }
        }
    }

    fn load(&self, item_id: &str) -> Result<DistributionItem, DistributionError> {
        let item_id = item_id.trim();
        self.repository
            .get_item(item_id)?
            .ok_or_else(|| DistributionError::NotFound(item_id.to_string()))
    }

    /// Load an item the caller must own.
    fn load_owned(
        &self,
        item_id: &str,
        influencer_id: &str,
    ) -> Result<DistributionItem, DistributionError> {
        let item = self.load(item_id)?;
        if !item.is_owned_by(influencer_id) {
            warn!(
                event = "distribution_unauthorized",
                item_id = %item.id,
                influencer_id = %influencer_id.trim(),
                "influencer does not own the item"
            );
            return Err(DistributionError::Unauthorized {
                item_id: item.id,
                influencer_id: influencer_id.trim().to_string(),
            });
        }
        Ok(item)
    }

    /// Outbox row announcing a publish outcome for `item`.
    fn outcome_event(
        &self,
        event_type: &str,
        item: &DistributionItem,
        reason: Option<String>,
        occurred_at: DateTime<Utc>,
    ) -> Result<OutboxMessage, DistributionError> {
        let envelope = EventEnvelope::new(
            self.ids.new_id(),
            event_type,
            &self.config.source_service,
            &item.id,
            occurred_at,
            &DistributionOutcomePayload {
                claim_id: item.id.clone(),
                distribution_item_id: item.id.clone(),
                reason,
            },
        )?;
        OutboxMessage::from_envelope(&envelope)
    }
}

//! Single-process wiring of the distribution module.

use std::sync::Arc;

use crate::bus::{InMemoryBus, PublishError};
use crate::clock::{Clock, IdGenerator, SystemClock, UuidGenerator};
use crate::commands::DistributionCommands;
use crate::config::DistributionConfig;
use crate::error::DistributionError;
use crate::outbox::OutboxRelay;
use crate::publishing::PlatformPublisher;
use crate::repository::InMemoryStore;
use crate::workers::{ClaimedConsumer, SchedulerJob, WorkerThread};

/// One [`InMemoryStore`] behind every port, one [`InMemoryBus`], and the
/// commands, relay, scheduler and consumer built on them.
///
/// ```
/// use distribution_core::module::InMemoryModule;
/// use distribution_core::commands::ClaimCommand;
///
/// let module = InMemoryModule::new();
/// let item = module
///     .commands
///     .claim(ClaimCommand {
///         influencer_id: "inf-1".into(),
///         clip_id: "clip-1".into(),
///         campaign_id: "camp-1".into(),
///         ..Default::default()
///     })
///     .unwrap()
///     .into_value();
/// assert_eq!(module.store.items().unwrap(), vec![item]);
/// ```
#[derive(Clone)]
pub struct InMemoryModule {
    pub config: DistributionConfig,
    pub clock: Arc<dyn Clock>,
    pub store: InMemoryStore,
    pub bus: InMemoryBus,
    pub commands: DistributionCommands,
    pub consumer: ClaimedConsumer,
    pub scheduler: SchedulerJob,
}

impl Default for InMemoryModule {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryModule {
    /// Default config, wall clock and UUID ids.
    pub fn new() -> Self {
        Self::with_parts(
            DistributionConfig::default(),
            Arc::new(SystemClock),
            Arc::new(UuidGenerator),
        )
    }

    pub fn with_parts(
        config: DistributionConfig,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        let store = InMemoryStore::new().with_clock(clock.clone());
        let commands = DistributionCommands::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            clock.clone(),
            ids,
        )
        .with_config(config.clone());
        Self::assemble(config, clock, store, InMemoryBus::new(), commands)
    }

    /// Swap the publish side effect on every component that uses it.
    pub fn with_platform_publisher(self, platforms: Arc<dyn PlatformPublisher>) -> Self {
        let commands = self.commands.with_platform_publisher(platforms);
        Self::assemble(self.config, self.clock, self.store, self.bus, commands)
    }

    fn assemble(
        config: DistributionConfig,
        clock: Arc<dyn Clock>,
        store: InMemoryStore,
        bus: InMemoryBus,
        commands: DistributionCommands,
    ) -> Self {
        let consumer =
            ClaimedConsumer::new(commands.clone(), Arc::new(store.clone()), clock.clone());
        let scheduler = SchedulerJob::new(commands.clone());
        Self {
            config,
            clock,
            store,
            bus,
            commands,
            consumer,
            scheduler,
        }
    }

    /// A relay over this module's outbox, publishing to its bus.
    pub fn relay(&self) -> OutboxRelay<InMemoryStore, InMemoryBus> {
        OutboxRelay::new(self.store.clone(), self.bus.clone())
            .with_clock(self.clock.clone())
            .with_topic(self.config.relay_topic.clone())
            .with_batch_size(self.config.relay_batch_size)
    }

    /// Subscribe the claimed consumer to the bus.
    pub fn start_consumer(&self) -> Result<(), PublishError> {
        self.consumer.start(&self.bus)
    }

    /// Relay once, then deliver everything on the bus to its subscribers.
    pub fn pump(&self) -> Result<usize, DistributionError> {
        let report = self.relay().run_once()?;
        self.bus.drain()?;
        Ok(report.published)
    }

    pub fn spawn_relay_worker(&self) -> WorkerThread {
        let relay = self.relay();
        WorkerThread::spawn("distribution-outbox-relay", self.config.poll_interval, move || {
            relay.run_once().map(|report| report.published)
        })
    }

    pub fn spawn_scheduler_worker(&self) -> WorkerThread {
        self.scheduler.clone().spawn(self.config.poll_interval)
    }
}

pub mod bus;
pub mod clock;
pub mod commands;
pub mod config;
pub mod dedup;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod idempotency;
pub mod module;
pub mod outbox;
pub mod publishing;
pub mod repository;
pub mod telemetry;
pub mod workers;

mod payload_serde;

pub use bus::{EventHandler, InMemoryBus, PublishError, Publisher, Subscriber};
pub use clock::{Clock, IdGenerator, ManualClock, SequenceIdGenerator, SystemClock, UuidGenerator};
pub use commands::{
    AddOverlayCommand, ClaimCommand, CommandOutcome, DistributionCommands, PublishMultiCommand,
    RescheduleCommand, RetryCommand, ScheduleCommand, SweepReport,
};
pub use config::{ConfigError, DistributionConfig};
pub use dedup::{payload_hash, EventDedupRecord, EventDedupStore};
pub use domain::{
    normalize_platforms, Caption, DistributionItem, DistributionStatus, Overlay, OverlayKind,
    Platform, PlatformStatus, PublishingAnalytics,
};
pub use envelope::{ClaimedPayload, DistributionOutcomePayload, EventEnvelope};
pub use error::{DistributionError, ErrorKind};
pub use idempotency::{request_hash, IdempotencyGuard, IdempotencyRecord, IdempotencyStore};
pub use module::InMemoryModule;
pub use outbox::{OutboxMessage, OutboxRelay, OutboxRepository, OutboxWriter, RelayReport};
pub use publishing::{
    PlatformPost, PlatformPublishError, PlatformPublisher, SyntheticPlatformPublisher,
};
pub use repository::{CreateOutcome, InMemoryStore, ItemCommit, Repository, RepositoryError};
pub use workers::{ClaimedConsumer, ConsumeOutcome, SchedulerJob, WorkerStats, WorkerThread};

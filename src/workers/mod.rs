//! Background drivers around the command layer and the outbox relay.
//!
//! - [`ClaimedConsumer`] turns upstream `distribution.claimed` events into
//!   Claim commands, deduplicated by event id
//! - [`SchedulerJob`] runs the due-scheduled sweep
//! - [`WorkerThread`] polls any tick function on its own thread

mod claimed_consumer;
mod scheduler_job;
mod thread;

pub use claimed_consumer::{ClaimedConsumer, ConsumeOutcome};
pub use scheduler_job::SchedulerJob;
pub use thread::{WorkerStats, WorkerThread};

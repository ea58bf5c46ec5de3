//! Distribution lifecycle integration tests.
//!
//! Drives the command layer end to end against the in-memory module:
//! - claim, schedule, reschedule and the due-scheduled sweep
//! - publish, failure recording and retry
//! - idempotent replays and persistence failures

#[path = "../support/mod.rs"]
mod support;
mod publish;
mod schedule;

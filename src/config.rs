use std::env;
use std::str::FromStr;

use chrono::Duration;
use dotenvy::dotenv;
use thiserror::Error;

const DEFAULT_BATCH_SIZE: usize = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

/// Tunables for commands and workers.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionConfig {
    /// Earliest schedule is `now + schedule_buffer`.
    pub schedule_buffer: Duration,
    /// Latest schedule is `now + schedule_window`.
    pub schedule_window: Duration,
    pub claim_ttl: Duration,
    pub idempotency_ttl: Duration,
    pub dedup_ttl: Duration,
    pub relay_batch_size: usize,
    pub relay_topic: String,
    pub scheduler_batch_size: usize,
    pub poll_interval: std::time::Duration,
    pub claimed_consumer_group: String,
    pub source_service: String,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            schedule_buffer: Duration::minutes(5),
            schedule_window: Duration::days(30),
            claim_ttl: Duration::hours(24),
            idempotency_ttl: Duration::days(7),
            dedup_ttl: Duration::days(7),
            relay_batch_size: DEFAULT_BATCH_SIZE,
            relay_topic: "distribution.events".to_string(),
            scheduler_batch_size: DEFAULT_BATCH_SIZE,
            poll_interval: std::time::Duration::from_secs(1),
            claimed_consumer_group: "distribution-service-claimed-cg".to_string(),
            source_service: "distribution-service".to_string(),
        }
    }
}

impl DistributionConfig {
    /// Load configuration from `DISTRIBUTION_*` environment variables.
    ///
    /// Durations are whole seconds; unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        let _ = dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let seconds = |key: &'static str, default: Duration| -> Result<Duration, ConfigError> {
            match parse::<i64>(&lookup, key)? {
                None => Ok(default),
                Some(secs) => Duration::try_seconds(secs).ok_or_else(|| ConfigError::Invalid {
                    key,
                    value: secs.to_string(),
                }),
            }
        };

        Ok(Self {
            schedule_buffer: seconds(
                "DISTRIBUTION_SCHEDULE_BUFFER_SECS",
                defaults.schedule_buffer,
            )?,
            schedule_window: seconds(
                "DISTRIBUTION_SCHEDULE_WINDOW_SECS",
                defaults.schedule_window,
            )?,
            claim_ttl: seconds("DISTRIBUTION_CLAIM_TTL_SECS", defaults.claim_ttl)?,
            idempotency_ttl: seconds(
                "DISTRIBUTION_IDEMPOTENCY_TTL_SECS",
                defaults.idempotency_ttl,
            )?,
            dedup_ttl: seconds("DISTRIBUTION_DEDUP_TTL_SECS", defaults.dedup_ttl)?,
            relay_batch_size: batch(parse(&lookup, "DISTRIBUTION_RELAY_BATCH_SIZE")?),
            relay_topic: lookup("DISTRIBUTION_RELAY_TOPIC").unwrap_or(defaults.relay_topic),
            scheduler_batch_size: batch(parse(&lookup, "DISTRIBUTION_SCHEDULER_BATCH_SIZE")?),
            poll_interval: parse(&lookup, "DISTRIBUTION_POLL_INTERVAL_MS")?
                .map(std::time::Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            claimed_consumer_group: lookup("DISTRIBUTION_CLAIMED_CONSUMER_GROUP")
                .unwrap_or(defaults.claimed_consumer_group),
            source_service: lookup("DISTRIBUTION_SOURCE_SERVICE")
                .unwrap_or(defaults.source_service),
        })
    }

    pub fn with_schedule_buffer(mut self, buffer: Duration) -> Self {
        self.schedule_buffer = buffer;
        self
    }

    pub fn with_schedule_window(mut self, window: Duration) -> Self {
        self.schedule_window = window;
        self
    }

    pub fn with_relay_topic(mut self, topic: impl Into<String>) -> Self {
        self.relay_topic = topic.into();
        self
    }

    pub fn with_relay_batch_size(mut self, size: usize) -> Self {
        self.relay_batch_size = if size > 0 { size } else { DEFAULT_BATCH_SIZE };
        self
    }

    pub fn with_scheduler_batch_size(mut self, size: usize) -> Self {
        self.scheduler_batch_size = if size > 0 { size } else { DEFAULT_BATCH_SIZE };
        self
    }

    pub fn with_poll_interval(mut self, interval: std::time::Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

/// Non-positive batch sizes fall back to the default.
fn batch(size: Option<i64>) -> usize {
    match size.and_then(|n| usize::try_from(n).ok()) {
        Some(n) if n > 0 => n,
        _ => DEFAULT_BATCH_SIZE,
    }
}

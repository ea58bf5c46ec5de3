//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use distribution_core::repository::{CreateOutcome, ItemCommit};
use distribution_core::{
    telemetry, DistributionConfig, DistributionItem, DistributionStatus, InMemoryModule,
    InMemoryStore, ManualClock, Overlay, Platform, PlatformPost, PlatformPublishError,
    PlatformPublisher, Repository, RepositoryError, SequenceIdGenerator,
};

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap()
}

/// A module on a manual clock with `id-N` ids and scripted platforms.
pub struct Fixture {
    pub clock: ManualClock,
    pub platforms: Arc<ScriptedPlatforms>,
    pub module: InMemoryModule,
}

pub fn fixture() -> Fixture {
    fixture_with(DistributionConfig::default())
}

pub fn fixture_with(config: DistributionConfig) -> Fixture {
    telemetry::init_test_tracing();
    let clock = ManualClock::new(start());
    let platforms = Arc::new(ScriptedPlatforms::default());
    let module = InMemoryModule::with_parts(
        config,
        Arc::new(clock.clone()),
        Arc::new(SequenceIdGenerator::new("id")),
    )
    .with_platform_publisher(platforms.clone());
    Fixture {
        clock,
        platforms,
        module,
    }
}

/// Platform publisher that fails for the platforms it is told to.
#[derive(Default)]
pub struct ScriptedPlatforms {
    down: Mutex<HashSet<Platform>>,
    calls: Mutex<Vec<(String, Platform)>>,
}

impl ScriptedPlatforms {
    pub fn take_down(&self, platform: Platform) {
        self.down.lock().unwrap().insert(platform);
    }

    pub fn restore(&self, platform: Platform) {
        self.down.lock().unwrap().remove(&platform);
    }

    pub fn calls(&self) -> Vec<(String, Platform)> {
        self.calls.lock().unwrap().clone()
    }
}

impl PlatformPublisher for ScriptedPlatforms {
    fn publish(
        &self,
        item: &DistributionItem,
        platform: Platform,
        _caption: &str,
    ) -> Result<PlatformPost, PlatformPublishError> {
        self.calls.lock().unwrap().push((item.id.clone(), platform));
        if self.down.lock().unwrap().contains(&platform) {
            return Err(PlatformPublishError::Unavailable {
                platform,
                reason: "503 from upstream".into(),
            });
        }
        Ok(PlatformPost {
            post_id: format!("{platform}-{}", item.id),
            post_url: format!("https://social.example/{platform}/post/{}", item.id),
        })
    }
}

/// Wraps an [`InMemoryStore`] and fails commits on demand.
#[derive(Clone)]
pub struct FailingRepository {
    pub inner: InMemoryStore,
    fail_commits: Arc<AtomicUsize>,
    fail_into: Arc<Mutex<Option<DistributionStatus>>>,
}

impl FailingRepository {
    pub fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            fail_commits: Arc::new(AtomicUsize::new(0)),
            fail_into: Arc::new(Mutex::new(None)),
        }
    }

    /// Fail the next `count` commits.
    pub fn fail_next_commits(&self, count: usize) {
        self.fail_commits.store(count, Ordering::SeqCst);
    }

    /// Fail every commit that would move an item into `status`.
    pub fn fail_commits_into(&self, status: DistributionStatus) {
        *self.fail_into.lock().unwrap() = Some(status);
    }
}

impl Repository for FailingRepository {
    fn create_item(&self, item: DistributionItem) -> Result<CreateOutcome, RepositoryError> {
        self.inner.create_item(item)
    }

    fn get_item(&self, id: &str) -> Result<Option<DistributionItem>, RepositoryError> {
        self.inner.get_item(id)
    }

    fn list_items_by_influencer(
        &self,
        influencer_id: &str,
    ) -> Result<Vec<DistributionItem>, RepositoryError> {
        self.inner.list_items_by_influencer(influencer_id)
    }

    fn list_due_scheduled(
        &self,
        threshold: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<DistributionItem>, RepositoryError> {
        self.inner.list_due_scheduled(threshold, limit)
    }

    fn campaign_for_clip(&self, clip_id: &str) -> Result<Option<String>, RepositoryError> {
        self.inner.campaign_for_clip(clip_id)
    }

    fn add_overlay(&self, overlay: Overlay) -> Result<(), RepositoryError> {
        self.inner.add_overlay(overlay)
    }

    fn commit(&self, commit: ItemCommit) -> Result<(), RepositoryError> {
        let injected = self
            .fail_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        let blocked = *self.fail_into.lock().unwrap() == Some(commit.item.status);
        if injected || blocked {
            return Err(RepositoryError::LockPoisoned("injected commit failure"));
        }
        self.inner.commit(commit)
    }
}

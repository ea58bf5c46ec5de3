use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use super::{CreateOutcome, ItemCommit, Repository, RepositoryError};
use crate::clock::{Clock, SystemClock};
use crate::dedup::EventDedupRecord;
use crate::domain::{
    Caption, DistributionItem, Overlay, Platform, PlatformStatus, PublishingAnalytics,
};
use crate::idempotency::IdempotencyRecord;
use crate::outbox::OutboxMessage;

#[derive(Default)]
pub(crate) struct StoreState {
    pub(crate) items: HashMap<String, DistributionItem>,
    pub(crate) clip_campaigns: HashMap<String, String>,
    pub(crate) overlays: HashMap<String, Overlay>,
    pub(crate) captions: HashMap<(String, Option<Platform>), Caption>,
    pub(crate) platform_statuses: HashMap<(String, Platform), PlatformStatus>,
    pub(crate) analytics: HashMap<String, PublishingAnalytics>,
    /// Append-only; position is the insertion sequence.
    pub(crate) outbox: Vec<OutboxMessage>,
    pub(crate) idempotency: HashMap<String, IdempotencyRecord>,
    pub(crate) dedup: HashMap<String, EventDedupRecord>,
}

impl StoreState {
    fn remember_clip(&mut self, item: &DistributionItem) {
        if !item.clip_id.trim().is_empty() && !item.campaign_id.trim().is_empty() {
            self.clip_campaigns
                .insert(item.clip_id.clone(), item.campaign_id.clone());
        }
    }
}

/// In-memory reference store.
///
/// Cloning yields another handle to the same state. Every port it implements
/// goes through one `RwLock`, so an [`ItemCommit`] and its outbox rows become
/// visible together.
#[derive(Clone)]
pub struct InMemoryStore {
    state: Arc<RwLock<StoreState>>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
            clock: Arc::new(SystemClock),
        }
    }

    /// A store pre-populated with `seed`; their clip/campaign pairs become
    /// resolvable through [`Repository::campaign_for_clip`].
    pub fn with_items(seed: impl IntoIterator<Item = DistributionItem>) -> Self {
        let store = Self::new();
        if let Ok(mut state) = store.state.write() {
            for item in seed {
                state.remember_clip(&item);
                state.items.insert(item.id.clone(), item);
            }
        }
        store
    }

    /// Clock used to judge dedup expiry.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Register a clip/campaign association without claiming anything.
    pub fn link_clip_to_campaign(
        &self,
        clip_id: impl Into<String>,
        campaign_id: impl Into<String>,
    ) -> Result<(), RepositoryError> {
        let mut state = self.write("link clip")?;
        state
            .clip_campaigns
            .insert(clip_id.into(), campaign_id.into());
        Ok(())
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn read(
        &self,
        operation: &'static str,
    ) -> Result<RwLockReadGuard<'_, StoreState>, RepositoryError> {
        self.state
            .read()
            .map_err(|_| RepositoryError::LockPoisoned(operation))
    }

    pub(crate) fn write(
        &self,
        operation: &'static str,
    ) -> Result<RwLockWriteGuard<'_, StoreState>, RepositoryError> {
        self.state
            .write()
            .map_err(|_| RepositoryError::LockPoisoned(operation))
    }

    pub fn items(&self) -> Result<Vec<DistributionItem>, RepositoryError> {
        Ok(self.read("items")?.items.values().cloned().collect())
    }

    pub fn overlays_for(&self, item_id: &str) -> Result<Vec<Overlay>, RepositoryError> {
        let state = self.read("overlays")?;
        let mut overlays: Vec<Overlay> = state
            .overlays
            .values()
            .filter(|o| o.distribution_item_id == item_id)
            .cloned()
            .collect();
        overlays.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(overlays)
    }

    pub fn caption_for(
        &self,
        item_id: &str,
        platform: Option<Platform>,
    ) -> Result<Option<Caption>, RepositoryError> {
        let state = self.read("captions")?;
        Ok(state
            .captions
            .get(&(item_id.to_string(), platform))
            .cloned())
    }

    pub fn platform_statuses_for(
        &self,
        item_id: &str,
    ) -> Result<Vec<PlatformStatus>, RepositoryError> {
        let state = self.read("platform statuses")?;
        Ok(Platform::ALL
            .iter()
            .filter_map(|p| state.platform_statuses.get(&(item_id.to_string(), *p)))
            .cloned()
            .collect())
    }

    pub fn analytics_for(
        &self,
        item_id: &str,
    ) -> Result<Vec<PublishingAnalytics>, RepositoryError> {
        let state = self.read("analytics")?;
        let mut rows: Vec<PublishingAnalytics> = state
            .analytics
            .values()
            .filter(|a| a.distribution_item_id == item_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    /// Every outbox row in insertion order, published or not.
    pub fn outbox_messages(&self) -> Result<Vec<OutboxMessage>, RepositoryError> {
        Ok(self.read("outbox read")?.outbox.clone())
    }
}

impl Repository for InMemoryStore {
    fn create_item(&self, item: DistributionItem) -> Result<CreateOutcome, RepositoryError> {
        let mut state = self.write("create item")?;

        if let Some(existing) = state.items.get(&item.id) {
            return Ok(CreateOutcome::Existing(existing.clone()));
        }
        if let Some(existing) = state.items.values().find(|e| e.same_natural_key(&item)) {
            return Ok(CreateOutcome::Existing(existing.clone()));
        }

        state.remember_clip(&item);
        state.items.insert(item.id.clone(), item.clone());
        Ok(CreateOutcome::Created(item))
    }

    fn get_item(&self, id: &str) -> Result<Option<DistributionItem>, RepositoryError> {
        let state = self.read("get item")?;
        Ok(state.items.get(id.trim()).cloned())
    }

    fn list_items_by_influencer(
        &self,
        influencer_id: &str,
    ) -> Result<Vec<DistributionItem>, RepositoryError> {
        let state = self.read("list by influencer")?;
        let influencer_id = influencer_id.trim();
        let mut items: Vec<DistributionItem> = state
            .items
            .values()
            .filter(|item| item.influencer_id == influencer_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.claimed_at.cmp(&a.claimed_at).then(a.id.cmp(&b.id)));
        Ok(items)
    }

    fn list_due_scheduled(
        &self,
        threshold: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<DistributionItem>, RepositoryError> {
        let state = self.read("list due scheduled")?;
        let mut due: Vec<(DateTime<Utc>, DistributionItem)> = state
            .items
            .values()
            .filter(|item| item.status == crate::domain::DistributionStatus::Scheduled)
            .filter_map(|item| {
                item.scheduled_for_utc
                    .filter(|at| *at <= threshold)
                    .map(|at| (at, item.clone()))
            })
            .collect();
        due.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.id.cmp(&b.1.id)));
        Ok(due.into_iter().take(limit).map(|(_, item)| item).collect())
    }

    fn campaign_for_clip(&self, clip_id: &str) -> Result<Option<String>, RepositoryError> {
        let state = self.read("campaign for clip")?;
        Ok(state.clip_campaigns.get(clip_id.trim()).cloned())
    }

    fn add_overlay(&self, overlay: Overlay) -> Result<(), RepositoryError> {
        let mut state = self.write("add overlay")?;
        if !state.items.contains_key(&overlay.distribution_item_id) {
            return Err(RepositoryError::NotFound(overlay.distribution_item_id));
        }
        state.overlays.insert(overlay.id.clone(), overlay);
        Ok(())
    }

    fn commit(&self, commit: ItemCommit) -> Result<(), RepositoryError> {
        let mut state = self.write("commit")?;

        let current = state
            .items
            .get(&commit.item.id)
            .ok_or_else(|| RepositoryError::NotFound(commit.item.id.clone()))?;
        if let Some(expected) = commit.expected_status {
            if current.status != expected {
                return Err(RepositoryError::StaleState {
                    id: commit.item.id.clone(),
                    expected,
                    actual: current.status,
                });
            }
        }
        // Reject outbox conflicts before touching anything.
        for message in &commit.outbox {
            state.check_outbox(message)?;
        }

        let item_id = commit.item.id.clone();
        if let Some(caption) = commit.caption {
            state
                .captions
                .insert((item_id.clone(), caption.platform), caption);
        }
        for status in commit.platform_statuses {
            state
                .platform_statuses
                .insert((item_id.clone(), status.platform), status);
        }
        for row in commit.analytics {
            state.analytics.insert(row.id.clone(), row);
        }
        for message in commit.outbox {
            state.append_outbox(message)?;
        }
        state.items.insert(item_id, commit.item);
        Ok(())
    }
}

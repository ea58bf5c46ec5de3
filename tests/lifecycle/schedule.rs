use chrono::Duration;
use distribution_core::envelope::EVENT_DISTRIBUTION_PUBLISHED;
use distribution_core::{
    ClaimCommand, DistributionError, DistributionOutcomePayload, DistributionStatus,
    OutboxRepository, Platform, Repository, RescheduleCommand, RetryCommand, ScheduleCommand,
    SweepReport,
};

use crate::support::{fixture, start, Fixture};

fn claim(f: &Fixture, clip: &str) -> String {
    f.module
        .commands
        .claim(ClaimCommand {
            influencer_id: "inf-1".into(),
            clip_id: clip.into(),
            campaign_id: "camp-1".into(),
            ..Default::default()
        })
        .unwrap()
        .into_value()
        .id
}

fn schedule(item_id: &str, platform: &str, in_minutes: i64) -> ScheduleCommand {
    ScheduleCommand {
        item_id: item_id.into(),
        influencer_id: "inf-1".into(),
        platform: platform.into(),
        scheduled_for: start() + Duration::minutes(in_minutes),
        timezone: "Asia/Tokyo".into(),
        idempotency_key: None,
    }
}

#[test]
fn scheduled_item_is_published_and_relayed() {
    let f = fixture();
    let id = claim(&f, "clip-1");
    f.module.commands.schedule(schedule(&id, "YouTube", 15)).unwrap();

    f.clock.advance(Duration::minutes(10));
    assert_eq!(f.module.scheduler.run_once().unwrap(), SweepReport::default());

    f.clock.advance(Duration::minutes(5));
    let report = f.module.scheduler.run_once().unwrap();
    assert_eq!(report.published, 1);

    let item = f.module.store.get_item(&id).unwrap().unwrap();
    assert_eq!(item.status, DistributionStatus::Published);
    assert_eq!(item.timezone, "Asia/Tokyo");
    assert_eq!(item.published_at, Some(start() + Duration::minutes(15)));
    assert_eq!(f.platforms.calls(), vec![(id.clone(), Platform::YouTube)]);

    assert_eq!(f.module.pump().unwrap(), 1);
    let relayed = f.module.bus.published("distribution.events");
    assert_eq!(relayed.len(), 1);
    assert_eq!(relayed[0].event_type, EVENT_DISTRIBUTION_PUBLISHED);
    assert_eq!(relayed[0].partition_key, id);
    let payload: DistributionOutcomePayload = relayed[0].decode_data().unwrap();
    assert_eq!(payload.distribution_item_id, id);
    assert!(f.module.store.list_pending_outbox(10).unwrap().is_empty());
}

#[test]
fn reschedule_moves_the_due_time() {
    let f = fixture();
    let id = claim(&f, "clip-1");
    f.module.commands.schedule(schedule(&id, "tiktok", 15)).unwrap();

    let moved = f
        .module
        .commands
        .reschedule(RescheduleCommand {
            platform: "snapchat".into(),
            ..schedule(&id, "tiktok", 90)
        })
        .unwrap()
        .into_value();
    assert_eq!(moved.platforms, vec![Platform::Snapchat]);

    f.clock.advance(Duration::minutes(30));
    assert_eq!(f.module.scheduler.run_once().unwrap().due, 0);

    f.clock.advance(Duration::hours(1));
    assert_eq!(f.module.scheduler.run_once().unwrap().published, 1);
    assert_eq!(f.platforms.calls(), vec![(id, Platform::Snapchat)]);
}

#[test]
fn failed_sweep_then_retry() {
    let f = fixture();
    let id = claim(&f, "clip-1");
    f.module.commands.schedule(schedule(&id, "instagram", 10)).unwrap();
    f.platforms.take_down(Platform::Instagram);
    f.clock.advance(Duration::minutes(10));

    let err = f.module.scheduler.run_once().unwrap_err();
    assert!(err.is_retryable());

    let failed = f.module.store.get_item(&id).unwrap().unwrap();
    assert_eq!(failed.status, DistributionStatus::Failed);
    assert_eq!(failed.retry_count, 1);
    assert!(failed.last_error.contains("503 from upstream"));

    f.platforms.restore(Platform::Instagram);
    let published = f
        .module
        .commands
        .retry(RetryCommand {
            item_id: id.clone(),
            influencer_id: "inf-1".into(),
            idempotency_key: Some("retry-1".into()),
        })
        .unwrap()
        .into_value();
    assert_eq!(published.status, DistributionStatus::Published);
    assert_eq!(published.retry_count, 0);

    f.module.pump().unwrap();
    let types: Vec<String> = f
        .module
        .bus
        .published("distribution.events")
        .into_iter()
        .map(|e| e.event_type)
        .collect();
    assert_eq!(types, vec!["distribution.failed", "distribution.published"]);
}

#[test]
fn failed_item_can_be_rescheduled() {
    let f = fixture();
    let id = claim(&f, "clip-1");
    f.module.commands.schedule(schedule(&id, "instagram", 10)).unwrap();
    f.platforms.take_down(Platform::Instagram);
    f.clock.advance(Duration::minutes(10));
    f.module.scheduler.run_once().unwrap_err();

    let err = f
        .module
        .commands
        .reschedule(schedule(&id, "tiktok", 60))
        .unwrap_err();
    assert!(matches!(
        err,
        DistributionError::InvalidStateTransition { from: DistributionStatus::Failed, .. }
    ));

    let again = f.module.commands.schedule(schedule(&id, "tiktok", 60)).unwrap().into_value();
    assert_eq!(again.status, DistributionStatus::Scheduled);
    assert_eq!(again.retry_count, 1);
}

#[test]
fn schedule_window_follows_config() {
    let f = crate::support::fixture_with(
        distribution_core::DistributionConfig::default()
            .with_schedule_buffer(Duration::minutes(30))
            .with_schedule_window(Duration::days(2)),
    );
    let id = claim(&f, "clip-1");

    let err = f.module.commands.schedule(schedule(&id, "tiktok", 15)).unwrap_err();
    let DistributionError::InvalidScheduleWindow { earliest, latest, .. } = err else {
        panic!("expected a window error, got {err:?}");
    };
    assert_eq!(earliest, start() + Duration::minutes(30));
    assert_eq!(latest, start() + Duration::days(2));

    f.module.commands.schedule(schedule(&id, "tiktok", 30)).unwrap();
}

#[test]
fn sweep_only_touches_scheduled_items() {
    let f = fixture();
    let claimed = claim(&f, "clip-1");
    let scheduled = claim(&f, "clip-2");
    f.module.commands.schedule(schedule(&scheduled, "tiktok", 10)).unwrap();
    f.clock.advance(Duration::days(1));

    let report = f.module.scheduler.run_once().unwrap();

    assert_eq!(report.published, 1);
    let untouched = f.module.store.get_item(&claimed).unwrap().unwrap();
    assert_eq!(untouched.status, DistributionStatus::Claimed);

    let mine = f.module.store.list_items_by_influencer("inf-1").unwrap();
    assert_eq!(mine.len(), 2);
}

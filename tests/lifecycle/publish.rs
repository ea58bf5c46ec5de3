use std::sync::Arc;

use distribution_core::{
    AddOverlayCommand, ClaimCommand, DistributionCommands, DistributionError, DistributionStatus,
    ErrorKind, InMemoryStore, ManualClock, OutboxRepository, Platform, PublishMultiCommand,
    Repository, SequenceIdGenerator,
};

use crate::support::{fixture, start, FailingRepository, Fixture, ScriptedPlatforms};

fn claim(commands: &DistributionCommands, clip: &str) -> String {
    commands
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

fn publish(item_id: &str, platforms: &[&str]) -> PublishMultiCommand {
    PublishMultiCommand {
        item_id: item_id.into(),
        influencer_id: "inf-1".into(),
        platforms: platforms.iter().map(|p| p.to_string()).collect(),
        caption: "new drop".into(),
        idempotency_key: None,
    }
}

fn pending_types(f: &Fixture) -> Vec<String> {
    f.module
        .store
        .list_pending_outbox(100)
        .unwrap()
        .into_iter()
        .map(|m| m.event_type)
        .collect()
}

#[test]
fn one_platform_down_fails_the_whole_publish() {
    let f = fixture();
    let id = claim(&f.module.commands, "clip-1");
    f.platforms.take_down(Platform::YouTube);

    let err = f
        .module
        .commands
        .publish_multi(publish(&id, &["tiktok", "youtube"]))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::PublishFailed);
    let item = f.module.store.get_item(&id).unwrap().unwrap();
    assert_eq!(item.status, DistributionStatus::Failed);
    assert_eq!(item.platforms, vec![Platform::TikTok, Platform::YouTube]);
    assert!(item.publish_started_at.is_some());
    assert!(f.module.store.platform_statuses_for(&id).unwrap().is_empty());
    assert_eq!(pending_types(&f), vec!["distribution.failed"]);
}

#[test]
fn keyed_publish_is_applied_once() {
    let f = fixture();
    let id = claim(&f.module.commands, "clip-1");
    let keyed = PublishMultiCommand {
        idempotency_key: Some("pub-1".into()),
        ..publish(&id, &["instagram"])
    };

    let first = f.module.commands.publish_multi(keyed.clone()).unwrap();
    let second = f.module.commands.publish_multi(keyed.clone()).unwrap();

    assert!(!first.replayed);
    assert!(second.replayed);
    assert_eq!(second.value, first.value);
    assert_eq!(f.platforms.calls().len(), 1);
    assert_eq!(pending_types(&f), vec!["distribution.published"]);

    let err = f
        .module
        .commands
        .publish_multi(PublishMultiCommand {
            caption: "different".into(),
            ..keyed
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IdempotencyConflict);
}

#[test]
fn keys_are_scoped_per_operation() {
    let f = fixture();
    let id = claim(&f.module.commands, "clip-1");

    let overlay = f
        .module
        .commands
        .add_overlay(AddOverlayCommand {
            item_id: id.clone(),
            overlay_type: "outro".into(),
            asset_path: "brand/outro.mov".into(),
            duration_seconds: 1.5,
            idempotency_key: Some("shared".into()),
        })
        .unwrap();
    let published = f
        .module
        .commands
        .publish_multi(PublishMultiCommand {
            idempotency_key: Some("shared".into()),
            ..publish(&id, &["snapchat"])
        })
        .unwrap();

    assert!(!overlay.replayed);
    assert!(!published.replayed);
    assert_eq!(published.value.status, DistributionStatus::Published);
}

#[test]
fn published_item_is_terminal() {
    let f = fixture();
    let id = claim(&f.module.commands, "clip-1");
    f.module.commands.publish_multi(publish(&id, &["tiktok"])).unwrap();

    let err = f
        .module
        .commands
        .add_overlay(AddOverlayCommand {
            item_id: id.clone(),
            overlay_type: "intro".into(),
            asset_path: "brand/intro.mov".into(),
            duration_seconds: 2.0,
            idempotency_key: None,
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StateConflict);

    let err = f.module.commands.publish_multi(publish(&id, &["tiktok"])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StateConflict);
    assert_eq!(pending_types(&f), vec!["distribution.published"]);
}

#[test]
fn failure_to_record_failure_keeps_original_error() {
    let clock = ManualClock::new(start());
    let store = InMemoryStore::new().with_clock(Arc::new(clock.clone()));
    let repository = FailingRepository::new(store.clone());
    let platforms = Arc::new(ScriptedPlatforms::default());
    let commands = DistributionCommands::new(
        Arc::new(repository.clone()),
        Arc::new(store.clone()),
        Arc::new(clock),
        Arc::new(SequenceIdGenerator::new("id")),
    )
    .with_platform_publisher(platforms.clone());
    let id = claim(&commands, "clip-1");
    platforms.take_down(Platform::TikTok);
    repository.fail_commits_into(DistributionStatus::Failed);

    let err = commands.publish_multi(publish(&id, &["tiktok"])).unwrap_err();

    assert!(matches!(err, DistributionError::PublishFailed(_)));
    let stuck = store.get_item(&id).unwrap().unwrap();
    assert_eq!(stuck.status, DistributionStatus::Publishing);
    assert!(store.outbox_messages().unwrap().is_empty());

    // A Publishing item can be resumed.
    platforms.restore(Platform::TikTok);
    let resumed = commands.publish_multi(publish(&id, &[])).unwrap().into_value();
    assert_eq!(resumed.status, DistributionStatus::Published);
    assert_eq!(resumed.platforms, vec![Platform::TikTok]);
}

#[test]
fn persistence_failure_before_publishing_changes_nothing() {
    let clock = ManualClock::new(start());
    let store = InMemoryStore::new().with_clock(Arc::new(clock.clone()));
    let repository = FailingRepository::new(store.clone());
    let platforms = Arc::new(ScriptedPlatforms::default());
    let commands = DistributionCommands::new(
        Arc::new(repository.clone()),
        Arc::new(store.clone()),
        Arc::new(clock),
        Arc::new(SequenceIdGenerator::new("id")),
    )
    .with_platform_publisher(platforms.clone());
    let id = claim(&commands, "clip-1");
    repository.fail_next_commits(1);

    let err = commands
        .publish_multi(PublishMultiCommand {
            idempotency_key: Some("pub-9".into()),
            ..publish(&id, &["tiktok"])
        })
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transient);
    assert_eq!(store.get_item(&id).unwrap().unwrap().status, DistributionStatus::Claimed);
    assert!(platforms.calls().is_empty());

    // The failed attempt recorded no idempotency record, so the key is reusable.
    let ok = commands
        .publish_multi(PublishMultiCommand {
            idempotency_key: Some("pub-9".into()),
            ..publish(&id, &["tiktok"])
        })
        .unwrap();
    assert!(!ok.replayed);
    assert_eq!(ok.value.status, DistributionStatus::Published);
}

#[test]
fn side_rows_are_written_with_the_published_item() {
    let f = fixture();
    let id = claim(&f.module.commands, "clip-1");

    f.module
        .commands
        .publish_multi(publish(&id, &["snapchat", "instagram"]))
        .unwrap();

    let statuses = f.module.store.platform_statuses_for(&id).unwrap();
    let posts: Vec<&str> = statuses.iter().map(|s| s.platform_post_id.as_str()).collect();
    assert_eq!(posts, vec![format!("instagram-{id}"), format!("snapchat-{id}")]);
    assert!(statuses.iter().all(|s| s.status == DistributionStatus::Published));

    let caption = f.module.store.caption_for(&id, None).unwrap().unwrap();
    assert_eq!(caption.caption_text, "new drop");
    assert_eq!(f.module.store.analytics_for(&id).unwrap().len(), 2);
}

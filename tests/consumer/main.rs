//! Claimed-event consumer integration tests.
//!
//! Upstream `distribution.claimed` events arrive through the bus, possibly
//! more than once; each claim must be applied exactly once.

#[path = "../support/mod.rs"]
mod support;

use chrono::Duration;
use distribution_core::envelope::TOPIC_DISTRIBUTION_CLAIMED;
use distribution_core::{
    Clock, DistributionStatus, ErrorKind, EventEnvelope, Publisher, Repository, ScheduleCommand,
};
use serde_json::json;

use support::{fixture, start, Fixture};

fn claimed_event(event_id: &str, claim_id: &str, clip_id: &str) -> EventEnvelope {
    EventEnvelope::new(
        event_id,
        "distribution.claimed",
        "clip-service",
        claim_id,
        start(),
        &json!({
            "claim_id": claim_id,
            "clip_id": clip_id,
            "user_id": "inf-7",
            "claim_type": "standard",
        }),
    )
    .unwrap()
}

fn started() -> Fixture {
    let f = fixture();
    f.module.store.link_clip_to_campaign("clip-1", "camp-1").unwrap();
    f.module.start_consumer().unwrap();
    f
}

fn deliver(f: &Fixture, envelope: &EventEnvelope) {
    f.module.bus.publish(TOPIC_DISTRIBUTION_CLAIMED, envelope).unwrap();
}

#[test]
fn claimed_event_creates_the_item() {
    let f = started();
    deliver(&f, &claimed_event("evt-1", "claim-1", "clip-1"));

    assert_eq!(f.module.bus.drain().unwrap(), 1);

    let item = f.module.store.get_item("claim-1").unwrap().unwrap();
    assert_eq!(item.status, DistributionStatus::Claimed);
    assert_eq!(item.influencer_id, "inf-7");
    assert_eq!(item.campaign_id, "camp-1");
    assert_eq!(item.claim_expires_at, start() + Duration::hours(24));
}

#[test]
fn redelivered_event_is_applied_once() {
    let f = started();
    let envelope = claimed_event("evt-1", "claim-1", "clip-1");
    deliver(&f, &envelope);
    f.module.bus.drain().unwrap();

    // The influencer moves the item on before the duplicate arrives.
    f.module
        .commands
        .schedule(ScheduleCommand {
            item_id: "claim-1".into(),
            influencer_id: "inf-7".into(),
            platform: "tiktok".into(),
            scheduled_for: start() + Duration::hours(1),
            timezone: String::new(),
            idempotency_key: None,
        })
        .unwrap();
    deliver(&f, &envelope);
    deliver(&f, &envelope);

    assert_eq!(f.module.bus.drain().unwrap(), 2);
    assert_eq!(f.module.store.items().unwrap().len(), 1);
    let item = f.module.store.get_item("claim-1").unwrap().unwrap();
    assert_eq!(item.status, DistributionStatus::Scheduled);
}

#[test]
fn new_event_id_for_the_same_claim_converges() {
    let f = started();
    deliver(&f, &claimed_event("evt-1", "claim-1", "clip-1"));
    f.clock.advance(Duration::minutes(3));
    deliver(&f, &claimed_event("evt-2", "claim-1", "clip-1"));

    f.module.bus.drain().unwrap();

    let items = f.module.store.items().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].claimed_at, start());
}

#[test]
fn conflicting_payload_is_reported_but_not_redelivered() {
    let f = started();
    f.module.store.link_clip_to_campaign("clip-2", "camp-1").unwrap();
    let first = claimed_event("evt-1", "claim-1", "clip-1");
    deliver(&f, &first);
    f.module.bus.drain().unwrap();

    let conflicting = claimed_event("evt-1", "claim-1", "clip-2");
    let err = f.module.consumer.handle(&conflicting).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PayloadConflict);

    deliver(&f, &conflicting);
    assert_eq!(f.module.bus.drain().unwrap(), 1);
    assert_eq!(f.module.bus.drain().unwrap(), 0);
    assert_eq!(f.module.store.items().unwrap().len(), 1);
}

#[test]
fn bad_event_does_not_block_later_claims() {
    let f = started();
    let blank = EventEnvelope::new(
        "evt-bad",
        "distribution.claimed",
        "clip-service",
        "claim-x",
        start(),
        &json!({ "claim_id": "", "clip_id": "clip-1", "user_id": "inf-7" }),
    )
    .unwrap();
    deliver(&f, &blank);
    deliver(&f, &claimed_event("evt-ok", "claim-2", "clip-1"));

    assert_eq!(f.module.bus.drain().unwrap(), 2);

    let item = f.module.store.get_item("claim-2").unwrap().unwrap();
    assert_eq!(item.status, DistributionStatus::Claimed);
    assert_eq!(f.module.store.items().unwrap().len(), 1);
    assert_eq!(f.module.bus.drain().unwrap(), 0);
}

#[test]
fn missing_campaign_is_retried_on_redelivery() {
    let f = started();
    deliver(&f, &claimed_event("evt-5", "claim-5", "clip-new"));

    let err = f.module.bus.drain().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(f.module.store.get_item("claim-5").unwrap().is_none());

    f.module.store.link_clip_to_campaign("clip-new", "camp-9").unwrap();
    assert_eq!(f.module.bus.drain().unwrap(), 1);
    let item = f.module.store.get_item("claim-5").unwrap().unwrap();
    assert_eq!(item.campaign_id, "camp-9");
}

#[test]
fn dedup_record_expires_after_ttl() {
    let f = started();
    let envelope = claimed_event("evt-1", "claim-1", "clip-1");
    f.module.consumer.handle(&envelope).unwrap();

    f.clock.advance(Duration::days(8));
    let conflicting = claimed_event("evt-1", "claim-2", "clip-1");
    let outcome = f.module.consumer.handle(&conflicting).unwrap();

    // The reservation expired, so the same event id is accepted again; the
    // natural key still resolves to the first item.
    assert!(matches!(
        outcome,
        distribution_core::ConsumeOutcome::Applied(ref item) if item.id == "claim-1"
    ));
    assert_eq!(f.clock.now(), start() + Duration::days(8));
}

#[test]
fn outbound_events_do_not_reach_the_consumer() {
    let f = started();
    deliver(&f, &claimed_event("evt-1", "claim-1", "clip-1"));
    f.module.bus.drain().unwrap();
    f.module
        .commands
        .publish_multi(distribution_core::PublishMultiCommand {
            item_id: "claim-1".into(),
            influencer_id: "inf-7".into(),
            platforms: vec!["instagram".into()],
            caption: "hi".into(),
            idempotency_key: None,
        })
        .unwrap();

    assert_eq!(f.module.pump().unwrap(), 1);
    assert_eq!(f.module.bus.event_types(), vec!["distribution.claimed", "distribution.published"]);
    assert_eq!(f.module.store.items().unwrap().len(), 1);
}

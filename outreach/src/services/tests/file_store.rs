use tempfile::TempDir;

use shared::{AttemptStatus, Channel, CheckIn, CheckInId, EngagementEvent, EngagementEventType, ResponseType};

use super::{new_attempt, sample_campaign};
use crate::core::EngagementWeights;
use crate::services::JsonFileStore;
use crate::OutreachError;
use crate::traits::{InsertOutcome, PersistenceStore};

#[tokio::test]
async fn test_state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let campaign = sample_campaign();

    let attempt_id = {
        let store = JsonFileStore::open(dir.path()).await.unwrap();
        store.insert_campaign(campaign.clone()).await.unwrap();
        let InsertOutcome::Created(attempt) = store
            .insert_attempt(new_attempt(&campaign, "acme", Channel::Email))
            .await
            .unwrap()
        else {
            panic!("expected a new attempt");
        };
        store
            .update_attempt_status(attempt.id, AttemptStatus::Sent, None)
            .await
            .unwrap();
        store
            .apply_engagement(
                attempt.id,
                EngagementEvent::new("evt-click", EngagementEventType::Click),
                EngagementWeights::default(),
            )
            .await
            .unwrap();
        assert!(store.path().exists());
        attempt.id
    };

    let reopened = JsonFileStore::open(dir.path()).await.unwrap();
    let stored_campaign = reopened.get_campaign(campaign.id).await.unwrap().unwrap();
    assert_eq!(stored_campaign.job.category, "fence_repair");

    let attempt = reopened.get_attempt(attempt_id).await.unwrap().unwrap();
    assert_eq!(attempt.status, AttemptStatus::Sent);
    assert_eq!(attempt.engagement_score, 25);

    // The applied-event index is rebuilt from the log
    let replay = reopened
        .apply_engagement(
            attempt_id,
            EngagementEvent::new("evt-click", EngagementEventType::Click),
            EngagementWeights::default(),
        )
        .await
        .unwrap();
    assert!(replay.is_none());
}

#[tokio::test]
async fn test_open_creates_missing_directory() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("state").join("outreach");

    let store = JsonFileStore::open(&nested).await.unwrap();
    assert!(nested.is_dir());
    assert!(store.list_campaigns().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_corrupt_state_file_rejected() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("outreach_state.json"), "{ not json").unwrap();

    let result = JsonFileStore::open(dir.path()).await;
    assert!(result.is_err());
}

/// Occupy the state path with a non-empty directory so the rename fails
fn block_writes(store: &JsonFileStore) {
    std::fs::remove_file(store.path()).unwrap();
    std::fs::create_dir_all(store.path().join("occupied")).unwrap();
}

fn unblock_writes(store: &JsonFileStore) {
    std::fs::remove_dir_all(store.path()).unwrap();
}

#[tokio::test]
async fn test_failed_write_rolls_back_engagement() {
    let dir = TempDir::new().unwrap();
    let campaign = sample_campaign();
    let store = JsonFileStore::open(dir.path()).await.unwrap();
    store.insert_campaign(campaign.clone()).await.unwrap();
    let InsertOutcome::Created(attempt) = store
        .insert_attempt(new_attempt(&campaign, "acme", Channel::Email))
        .await
        .unwrap()
    else {
        panic!("expected a new attempt");
    };
    store
        .update_attempt_status(attempt.id, AttemptStatus::Delivered, None)
        .await
        .unwrap();
    let bid = EngagementEvent::new("evt-bid", EngagementEventType::Reply)
        .with_response(ResponseType::BidSubmitted)
        .with_bid(2400.0);

    block_writes(&store);
    let failed = store
        .apply_engagement(attempt.id, bid.clone(), EngagementWeights::default())
        .await;
    assert!(matches!(failed, Err(OutreachError::IoError(_))));

    let unchanged = store.get_attempt(attempt.id).await.unwrap().unwrap();
    assert!(!unchanged.bid_submitted);
    assert_eq!(unchanged.engagement_score, 0);
    assert!(store.list_engagement(Some(campaign.id)).await.unwrap().is_empty());

    // The retry is applied, not dropped as a duplicate
    unblock_writes(&store);
    let applied = store
        .apply_engagement(attempt.id, bid, EngagementWeights::default())
        .await
        .unwrap()
        .expect("retry applies the event");
    assert!(applied.new_bid);

    let reopened = JsonFileStore::open(dir.path()).await.unwrap();
    let stored = reopened.get_attempt(attempt.id).await.unwrap().unwrap();
    assert!(stored.bid_submitted);
    assert_eq!(stored.engagement_score, applied.attempt.engagement_score);
}

#[tokio::test]
async fn test_failed_write_leaves_checkin_unclaimed() {
    let dir = TempDir::new().unwrap();
    let campaign = sample_campaign();
    let store = JsonFileStore::open(dir.path()).await.unwrap();
    store.insert_campaign(campaign.clone()).await.unwrap();
    let checkin = CheckIn {
        id: CheckInId::new(),
        campaign_id: campaign.id,
        sequence: 1,
        fraction: 0.25,
        scheduled_at: campaign.created_at + chrono::Duration::hours(18),
        expected_response_count: 3,
        actual_response_count: None,
        escalated: false,
        fired_at: None,
    };
    store.insert_checkins(vec![checkin.clone()]).await.unwrap();

    block_writes(&store);
    assert!(store.claim_checkin(checkin.id).await.is_err());
    let listed = store.list_checkins(campaign.id).await.unwrap();
    assert!(!listed[0].has_fired());

    unblock_writes(&store);
    let claimed = store.claim_checkin(checkin.id).await.unwrap();
    assert!(claimed.is_some_and(|c| c.has_fired()));
}

//! Test helpers and builder patterns for outreach tests
//!
//! [`EngineBuilder`] wires a [`CampaignEngine`] to mock sources and senders,
//! an in-memory store and a recording notification sink.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use outreach::services::InMemoryStore;
use outreach::traits::{MockCandidateSource, MockChannelSender};
use outreach::{
    CampaignEngine, CandidateSource, ChannelSender, Collaborators, NotificationSink, OutreachConfig,
    SourceError,
};
use shared::{
    AttemptId, Candidate, CampaignId, Channel, EngagementEvent, EngagementEventType,
    EngagementOutcome, NotificationEvent, OutreachAttempt, ResponseType, SendReceipt, Tier,
};

/// Notification sink that keeps everything it is handed
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<NotificationEvent>>,
}

impl RecordingSink {
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|event| event.kind())
            .collect()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify(&self, event: NotificationEvent) -> Result<(), SourceError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// Every (tier, radius) a source was queried with, in call order
pub type QueryLog = Arc<Mutex<Vec<(Tier, f64)>>>;

/// An engine plus the handles tests inspect
pub struct TestEngine {
    pub engine: CampaignEngine,
    pub notifications: Arc<RecordingSink>,
    pub queries: QueryLog,
}

impl TestEngine {
    pub fn radii_for(&self, tier: Tier) -> Vec<f64> {
        self.queries
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| *t == tier)
            .map(|(_, radius)| *radius)
            .collect()
    }
}

/// Builder for test engines with sensible defaults
pub struct EngineBuilder {
    config: OutreachConfig,
    pools: Vec<(Tier, Vec<Candidate>)>,
}

impl EngineBuilder {
    /// No sources, every channel sender succeeds, timers off
    pub fn new() -> Self {
        let mut config = OutreachConfig::default();
        config.monitor.schedule_timers = false;
        Self {
            config,
            pools: Vec::new(),
        }
    }

    /// Adjust the configuration with a setup function
    pub fn with_config<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut OutreachConfig),
    {
        setup(&mut self.config);
        self
    }

    /// A source returning the part of `pool` within the queried radius
    pub fn with_source(mut self, tier: Tier, pool: Vec<Candidate>) -> Self {
        self.pools.push((tier, pool));
        self
    }

    pub fn with_sources(self, pools: Vec<(Tier, Vec<Candidate>)>) -> Self {
        pools
            .into_iter()
            .fold(self, |builder, (tier, pool)| builder.with_source(tier, pool))
    }

    pub fn build(self) -> TestEngine {
        let queries: QueryLog = Arc::new(Mutex::new(Vec::new()));

        let sources: Vec<Arc<dyn CandidateSource>> = self
            .pools
            .into_iter()
            .map(|(tier, pool)| {
                let log = Arc::clone(&queries);
                let mut source = MockCandidateSource::new();
                source.expect_tier().return_const(tier);
                source.expect_find().returning(move |_, radius| {
                    log.lock().unwrap().push((tier, radius));
                    Ok(pool
                        .iter()
                        .filter(|c| c.distance_miles.unwrap_or(0.0) <= radius)
                        .cloned()
                        .collect())
                });
                Arc::new(source) as Arc<dyn CandidateSource>
            })
            .collect();

        let senders: Vec<Arc<dyn ChannelSender>> = Channel::ALL
            .into_iter()
            .map(|channel| {
                let mut sender = MockChannelSender::new();
                sender.expect_channel().return_const(channel);
                sender.expect_send().returning(|_, message| {
                    Ok(SendReceipt {
                        provider_id: Some(format!("test-{}", message.attempt_id)),
                        delivered: true,
                    })
                });
                Arc::new(sender) as Arc<dyn ChannelSender>
            })
            .collect();

        let notifications = Arc::new(RecordingSink::default());
        let engine = CampaignEngine::new(
            self.config,
            Collaborators {
                sources,
                oracle: None,
                senders,
                notifier: notifications.clone(),
                store: Arc::new(InMemoryStore::new()),
                policy: None,
            },
        )
        .expect("test config is valid");

        TestEngine {
            engine,
            notifications,
            queries,
        }
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper functions for common test operations
pub struct TestHelpers;

impl TestHelpers {
    /// Attempts of a campaign, one per contractor, in creation order
    pub async fn first_attempts(engine: &CampaignEngine, campaign_id: CampaignId) -> Vec<OutreachAttempt> {
        let mut seen = std::collections::HashSet::new();
        engine
            .attempts(campaign_id)
            .await
            .unwrap()
            .into_iter()
            .filter(|a| a.status.is_success() && seen.insert(a.contractor_key.clone()))
            .collect()
    }

    pub async fn reply(
        engine: &CampaignEngine,
        attempt_id: AttemptId,
        event_id: &str,
        response: ResponseType,
    ) -> EngagementOutcome {
        let event = EngagementEvent::new(event_id, EngagementEventType::Reply).with_response(response);
        engine.record_response_event(attempt_id, event).await.unwrap()
    }

    pub async fn bid(engine: &CampaignEngine, attempt_id: AttemptId, event_id: &str, amount: f64) -> EngagementOutcome {
        let event = EngagementEvent::new(event_id, EngagementEventType::Reply)
            .with_response(ResponseType::BidSubmitted)
            .with_bid(amount);
        engine.record_response_event(attempt_id, event).await.unwrap()
    }

    /// Poll until the sink has seen `kind`; notifications are delivered off the caller's task
    pub async fn wait_for_notification(sink: &RecordingSink, kind: &str) -> bool {
        for _ in 0..100 {
            if sink.kinds().iter().any(|seen| *seen == kind) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

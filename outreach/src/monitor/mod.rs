//! Campaign monitoring: check-ins, escalation decisions and timers
//!
//! Every campaign mutation runs under that campaign's lock, taken through
//! [`CampaignMonitor::lock`]. Check-ins are computed once at activation and
//! each fires at most once (the store claims it atomically). A shortfall
//! escalates until the escalation budget is spent; the next shortfall expires
//! the campaign.

pub mod escalation;
pub mod scheduler;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use shared::{Campaign, CampaignId, CheckIn, CheckInId};

use crate::config::MonitorConfig;

pub use escalation::{EscalationAction, EscalationContext, LadderPolicy};
pub use scheduler::TimerScheduler;

/// What a fired check-in decided
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckInOutcome {
    OnTrack,
    Escalated { action: EscalationAction },
    /// Shortfall with the escalation budget spent
    Expired { escalations: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckInReport {
    pub checkin_id: CheckInId,
    pub campaign_id: CampaignId,
    pub sequence: u32,
    pub expected_response_count: u32,
    pub actual_response_count: u32,
    pub outcome: CheckInOutcome,
}

/// Per-campaign serialization, check-in planning and timers
pub struct CampaignMonitor {
    config: MonitorConfig,
    locks: Mutex<HashMap<CampaignId, Arc<Mutex<()>>>>,
    timers: TimerScheduler,
}

impl CampaignMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            locks: Mutex::new(HashMap::new()),
            timers: TimerScheduler::new(),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn timers(&self) -> &TimerScheduler {
        &self.timers
    }

    /// Exclusive access to one campaign until the guard drops
    pub async fn lock(&self, campaign_id: CampaignId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(campaign_id).or_default())
        };
        lock.lock_owned().await
    }

    /// Forget a terminal campaign's lock
    ///
    /// Tasks already waiting keep the old mutex; later callers get a fresh one.
    pub async fn release(&self, campaign_id: CampaignId) {
        self.locks.lock().await.remove(&campaign_id);
    }

    /// Campaigns with a lock entry
    pub async fn tracked_campaigns(&self) -> usize {
        self.locks.lock().await.len()
    }

    /// Check-ins at each configured fraction of the campaign timeline
    ///
    /// Expected counts are `round(expected_responses × fraction)`.
    pub fn plan_checkins(&self, campaign: &Campaign) -> Vec<CheckIn> {
        let start = campaign.activated_at.unwrap_or(campaign.created_at);
        let timeline = campaign.deadline_at - start;

        self.config
            .checkin_fractions
            .iter()
            .enumerate()
            .map(|(index, fraction)| {
                let offset_ms = (timeline.num_milliseconds() as f64 * fraction).round() as i64;
                CheckIn {
                    id: CheckInId::new(),
                    campaign_id: campaign.id,
                    sequence: index as u32 + 1,
                    fraction: *fraction,
                    scheduled_at: start + chrono::Duration::milliseconds(offset_ms),
                    expected_response_count: (campaign.expected_responses * fraction).round() as u32,
                    actual_response_count: None,
                    escalated: false,
                    fired_at: None,
                }
            })
            .collect()
    }

    /// actual / expected below the threshold; nothing is expected of a zero target
    pub fn is_shortfall(&self, expected: u32, actual: u32) -> bool {
        expected > 0 && (actual as f64 / expected as f64) < self.config.escalation_threshold
    }

    pub fn escalation_budget_spent(&self, campaign: &Campaign) -> bool {
        campaign.escalation_count >= self.config.max_escalations
    }

    /// Time left until `at`, zero when it has passed
    pub fn delay_until(at: DateTime<Utc>) -> std::time::Duration {
        (at - Utc::now()).to_std().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Channel, Job, JobRequest, Location, Urgency};

    fn monitor() -> CampaignMonitor {
        CampaignMonitor::new(MonitorConfig::default())
    }

    fn campaign(expected: f64) -> Campaign {
        let job = Job::from_request(
            JobRequest::new("painting", Location::named("Tulsa, OK")),
            5,
            Urgency::Standard,
        );
        let mut campaign = Campaign::forming(job, vec![Channel::Email], 15.0, 30.0, chrono::Duration::hours(72));
        campaign.expected_responses = expected;
        campaign
    }

    #[test]
    fn test_checkins_at_timeline_fractions() {
        let c = campaign(20.0);
        let checkins = monitor().plan_checkins(&c);

        assert_eq!(checkins.len(), 3);
        assert_eq!(checkins[0].sequence, 1);
        assert_eq!(checkins[0].expected_response_count, 5);
        assert_eq!(checkins[1].expected_response_count, 10);
        assert_eq!(checkins[2].expected_response_count, 15);
        assert_eq!(checkins[0].scheduled_at - c.created_at, chrono::Duration::hours(18));
        assert_eq!(checkins[2].scheduled_at - c.created_at, chrono::Duration::hours(54));
    }

    #[test]
    fn test_shortfall_threshold() {
        let m = monitor();
        // 2 of 5 is 40%
        assert!(m.is_shortfall(5, 2));
        assert!(!m.is_shortfall(4, 3));
        assert!(!m.is_shortfall(0, 0));
    }

    #[test]
    fn test_escalation_budget() {
        let m = monitor();
        let mut c = campaign(10.0);
        c.escalation_count = 2;
        assert!(!m.escalation_budget_spent(&c));
        c.escalation_count = 3;
        assert!(m.escalation_budget_spent(&c));
    }

    #[tokio::test]
    async fn test_lock_serializes_per_campaign() {
        let m = Arc::new(monitor());
        let id = CampaignId::new();

        let guard = m.lock(id).await;
        // A different campaign is not blocked
        let _other = m.lock(CampaignId::new()).await;

        let waiter = {
            let m = Arc::clone(&m);
            tokio::spawn(async move {
                let _guard = m.lock(id).await;
            })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_release_drops_lock_entry() {
        let m = monitor();
        let id = CampaignId::new();

        let guard = m.lock(id).await;
        assert_eq!(m.tracked_campaigns().await, 1);

        m.release(id).await;
        drop(guard);
        assert_eq!(m.tracked_campaigns().await, 0);

        // A released campaign can still be locked again
        let _again = m.lock(id).await;
        assert_eq!(m.tracked_campaigns().await, 1);
    }
}

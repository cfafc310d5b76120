//! In-memory persistence store
//!
//! All state sits behind one `tokio::sync::RwLock`. Each trait method takes
//! the lock once, so guarded read-then-write sequences (open-attempt checks,
//! check-in claims, engagement increments) are atomic.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::RwLock;

use shared::{
    component_debug, AttemptId, AttemptStatus, Campaign, CampaignId, CheckIn, CheckInId, Component,
    DiscoveryRun, EngagementEvent, EngagementRecord, EventId, NewAttempt, OutreachAttempt,
};

use crate::core::engagement::apply_event;
use crate::core::{AppliedEngagement, EngagementWeights};
use crate::error::{OutreachError, OutreachResult};
use crate::traits::{InsertOutcome, PersistenceStore};

/// Serializable snapshot of everything the store holds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    pub campaigns: BTreeMap<CampaignId, Campaign>,
    pub discovery_runs: Vec<DiscoveryRun>,
    /// Insertion order
    pub attempts: Vec<OutreachAttempt>,
    pub checkins: Vec<CheckIn>,
    pub engagement: Vec<EngagementRecord>,
    #[serde(skip)]
    attempt_index: HashMap<AttemptId, usize>,
    #[serde(skip)]
    applied_events: HashSet<EventId>,
}

impl StoreState {
    /// Rebuild lookup indexes after deserialization
    pub fn reindex(&mut self) {
        self.attempt_index = self
            .attempts
            .iter()
            .enumerate()
            .map(|(position, attempt)| (attempt.id, position))
            .collect();
        self.applied_events = self.engagement.iter().map(|r| r.event_id.clone()).collect();
    }

    fn attempt_mut(&mut self, attempt_id: AttemptId) -> OutreachResult<&mut OutreachAttempt> {
        let position = *self
            .attempt_index
            .get(&attempt_id)
            .ok_or(OutreachError::AttemptNotFound { attempt_id })?;
        self.attempts
            .get_mut(position)
            .ok_or(OutreachError::AttemptNotFound { attempt_id })
    }

    fn checkin_mut(&mut self, checkin_id: CheckInId) -> OutreachResult<&mut CheckIn> {
        self.checkins
            .iter_mut()
            .find(|c| c.id == checkin_id)
            .ok_or_else(|| OutreachError::Persistence {
                message: format!("check-in not found: {checkin_id}"),
            })
    }
}

pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::from_state(StoreState::default())
    }

    pub fn from_state(mut state: StoreState) -> Self {
        state.reindex();
        Self {
            state: RwLock::new(state),
        }
    }

    /// Clone of the current state
    pub async fn snapshot(&self) -> StoreState {
        self.state.read().await.clone()
    }

    /// Replace the whole state with an earlier snapshot
    pub async fn restore(&self, mut state: StoreState) {
        state.reindex();
        *self.state.write().await = state;
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersistenceStore for InMemoryStore {
    async fn insert_campaign(&self, campaign: Campaign) -> OutreachResult<()> {
        let mut state = self.state.write().await;
        if state.campaigns.contains_key(&campaign.id) {
            return Err(OutreachError::Persistence {
                message: format!("campaign already exists: {}", campaign.id),
            });
        }
        state.campaigns.insert(campaign.id, campaign);
        Ok(())
    }

    async fn update_campaign(&self, campaign: Campaign) -> OutreachResult<()> {
        let mut state = self.state.write().await;
        match state.campaigns.get_mut(&campaign.id) {
            Some(existing) => {
                *existing = campaign;
                Ok(())
            }
            None => Err(OutreachError::CampaignNotFound {
                campaign_id: campaign.id,
            }),
        }
    }

    async fn get_campaign(&self, campaign_id: CampaignId) -> OutreachResult<Option<Campaign>> {
        Ok(self.state.read().await.campaigns.get(&campaign_id).cloned())
    }

    async fn list_campaigns(&self) -> OutreachResult<Vec<Campaign>> {
        let state = self.state.read().await;
        let mut campaigns: Vec<Campaign> = state.campaigns.values().cloned().collect();
        campaigns.sort_by_key(|c| c.created_at);
        Ok(campaigns)
    }

    async fn append_discovery_run(&self, run: DiscoveryRun) -> OutreachResult<()> {
        self.state.write().await.discovery_runs.push(run);
        Ok(())
    }

    async fn list_discovery_runs(&self, campaign_id: CampaignId) -> OutreachResult<Vec<DiscoveryRun>> {
        let state = self.state.read().await;
        Ok(state
            .discovery_runs
            .iter()
            .filter(|run| run.campaign_id == campaign_id)
            .cloned()
            .collect())
    }

    async fn insert_attempt(&self, attempt: NewAttempt) -> OutreachResult<InsertOutcome> {
        let mut state = self.state.write().await;
        let open = state.attempts.iter().find(|existing| {
            existing.campaign_id == attempt.campaign_id
                && existing.contractor_key == attempt.contractor_key
                && existing.channel == attempt.channel
                && existing.status.is_open()
        });
        if let Some(existing) = open {
            return Ok(InsertOutcome::Duplicate(existing.clone()));
        }

        let created = OutreachAttempt::from_new(attempt);
        let position = state.attempts.len();
        state.attempt_index.insert(created.id, position);
        state.attempts.push(created.clone());
        Ok(InsertOutcome::Created(created))
    }

    async fn update_attempt_status(
        &self,
        attempt_id: AttemptId,
        status: AttemptStatus,
        error: Option<String>,
    ) -> OutreachResult<OutreachAttempt> {
        let mut state = self.state.write().await;
        let attempt = state.attempt_mut(attempt_id)?;
        attempt.status = status;
        attempt.error = error;
        if status.is_success() && attempt.sent_at.is_none() {
            attempt.sent_at = Some(Utc::now());
        }
        Ok(attempt.clone())
    }

    async fn get_attempt(&self, attempt_id: AttemptId) -> OutreachResult<Option<OutreachAttempt>> {
        let state = self.state.read().await;
        Ok(state
            .attempt_index
            .get(&attempt_id)
            .and_then(|position| state.attempts.get(*position))
            .cloned())
    }

    async fn list_attempts(&self, campaign_id: Option<CampaignId>) -> OutreachResult<Vec<OutreachAttempt>> {
        let state = self.state.read().await;
        Ok(state
            .attempts
            .iter()
            .filter(|a| campaign_id.map_or(true, |id| a.campaign_id == id))
            .cloned()
            .collect())
    }

    async fn insert_checkins(&self, checkins: Vec<CheckIn>) -> OutreachResult<()> {
        self.state.write().await.checkins.extend(checkins);
        Ok(())
    }

    async fn list_checkins(&self, campaign_id: CampaignId) -> OutreachResult<Vec<CheckIn>> {
        let state = self.state.read().await;
        let mut checkins: Vec<CheckIn> = state
            .checkins
            .iter()
            .filter(|c| c.campaign_id == campaign_id)
            .cloned()
            .collect();
        checkins.sort_by_key(|c| c.sequence);
        Ok(checkins)
    }

    async fn claim_checkin(&self, checkin_id: CheckInId) -> OutreachResult<Option<CheckIn>> {
        let mut state = self.state.write().await;
        let checkin = state.checkin_mut(checkin_id)?;
        if checkin.has_fired() {
            return Ok(None);
        }
        checkin.fired_at = Some(Utc::now());
        Ok(Some(checkin.clone()))
    }

    async fn record_checkin_result(
        &self,
        checkin_id: CheckInId,
        actual_response_count: u32,
        escalated: bool,
    ) -> OutreachResult<()> {
        let mut state = self.state.write().await;
        let checkin = state.checkin_mut(checkin_id)?;
        checkin.actual_response_count = Some(actual_response_count);
        checkin.escalated = escalated;
        Ok(())
    }

    async fn apply_engagement(
        &self,
        attempt_id: AttemptId,
        event: EngagementEvent,
        weights: EngagementWeights,
    ) -> OutreachResult<Option<AppliedEngagement>> {
        let mut state = self.state.write().await;
        if state.applied_events.contains(&event.event_id) {
            component_debug!(
                Component::Store,
                event_id = %event.event_id,
                "🔁 Engagement event already applied"
            );
            return Ok(None);
        }

        let attempt = state.attempt_mut(attempt_id)?;
        let applied = apply_event(attempt, &event, &weights);
        state.applied_events.insert(event.event_id);
        state.engagement.push(applied.record.clone());
        Ok(Some(applied))
    }

    async fn list_engagement(&self, campaign_id: Option<CampaignId>) -> OutreachResult<Vec<EngagementRecord>> {
        let state = self.state.read().await;
        Ok(state
            .engagement
            .iter()
            .filter(|r| campaign_id.map_or(true, |id| r.campaign_id == id))
            .cloned()
            .collect())
    }
}

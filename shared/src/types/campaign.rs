//! Campaign aggregate and its scheduled check-ins

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::{CampaignId, Channel, CheckInId, ContractorKey, Job, Tier};

/// Campaign lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignState {
    Forming,
    Active,
    Escalated,
    Completed,
    Expired,
}

impl CampaignState {
    /// Completed and Expired never transition again
    pub fn is_terminal(&self) -> bool {
        matches!(self, CampaignState::Completed | CampaignState::Expired)
    }
}

impl fmt::Display for CampaignState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CampaignState::Forming => "forming",
            CampaignState::Active => "active",
            CampaignState::Escalated => "escalated",
            CampaignState::Completed => "completed",
            CampaignState::Expired => "expired",
        };
        write!(f, "{name}")
    }
}

/// Why a campaign expired
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExpiryReason {
    DeadlinePassed,
    CouldNotFulfill { escalations: u32 },
}

/// One outreach campaign for a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub job: Job,
    pub target_bids: u32,
    pub state: CampaignState,
    pub expiry_reason: Option<ExpiryReason>,
    pub contacted_by_tier: BTreeMap<Tier, u32>,
    pub enabled_channels: Vec<Channel>,
    pub radius_miles: f64,
    pub min_score: f64,
    pub expected_responses: f64,
    /// Percentage in [0, 100], observability only
    pub confidence: f64,
    pub escalation_count: u32,
    /// Distinct contractors that have submitted a bid
    pub bidders: BTreeSet<ContractorKey>,
    pub created_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
    pub deadline_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    /// New campaign in the Forming state
    pub fn forming(
        job: Job,
        enabled_channels: Vec<Channel>,
        radius_miles: f64,
        min_score: f64,
        timeline: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: CampaignId::new(),
            target_bids: job.bids_needed,
            job,
            state: CampaignState::Forming,
            expiry_reason: None,
            contacted_by_tier: BTreeMap::new(),
            enabled_channels,
            radius_miles,
            min_score,
            expected_responses: 0.0,
            confidence: 0.0,
            escalation_count: 0,
            bidders: BTreeSet::new(),
            created_at: now,
            activated_at: None,
            deadline_at: now + timeline,
            closed_at: None,
            updated_at: now,
        }
    }

    pub fn total_contacted(&self) -> u32 {
        self.contacted_by_tier.values().sum()
    }

    pub fn bids_received(&self) -> u32 {
        self.bidders.len() as u32
    }

    pub fn bid_target_met(&self) -> bool {
        self.bids_received() >= self.target_bids
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// A pre-computed progress check at a fraction of the campaign timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckIn {
    pub id: CheckInId,
    pub campaign_id: CampaignId,
    /// 1-based, increasing with `scheduled_at`
    pub sequence: u32,
    pub fraction: f64,
    pub scheduled_at: DateTime<Utc>,
    pub expected_response_count: u32,
    pub actual_response_count: Option<u32>,
    pub escalated: bool,
    pub fired_at: Option<DateTime<Utc>>,
}

impl CheckIn {
    pub fn has_fired(&self) -> bool {
        self.fired_at.is_some()
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.has_fired() && self.scheduled_at <= now
    }
}

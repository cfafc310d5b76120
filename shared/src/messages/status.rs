//! Campaign status snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{
    AttemptStatus, CampaignId, CampaignState, Channel, ExpiryReason, JobId, OutreachAttempt, Tier,
};

/// Attempt tallies by status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptCounts {
    pub total: u32,
    pub queued: u32,
    pub sent: u32,
    pub delivered: u32,
    pub failed: u32,
    pub bounced: u32,
    /// Attempts with at least one response event
    pub responded: u32,
}

impl AttemptCounts {
    pub fn tally<'a>(attempts: impl IntoIterator<Item = &'a OutreachAttempt>) -> Self {
        let mut counts = Self::default();
        for attempt in attempts {
            counts.total += 1;
            match attempt.status {
                AttemptStatus::Queued => counts.queued += 1,
                AttemptStatus::Sent => counts.sent += 1,
                AttemptStatus::Delivered => counts.delivered += 1,
                AttemptStatus::Failed => counts.failed += 1,
                AttemptStatus::Bounced => counts.bounced += 1,
            }
            if attempt.has_responded() {
                counts.responded += 1;
            }
        }
        counts
    }
}

/// Point-in-time view of a campaign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignStatus {
    pub campaign_id: CampaignId,
    pub job_id: JobId,
    pub state: CampaignState,
    pub expiry_reason: Option<ExpiryReason>,
    pub target_bids: u32,
    pub bids_received: u32,
    pub contacted_by_tier: BTreeMap<Tier, u32>,
    pub attempts: AttemptCounts,
    pub enabled_channels: Vec<Channel>,
    pub radius_miles: f64,
    pub min_score: f64,
    pub expected_responses: f64,
    pub confidence: f64,
    pub escalation_count: u32,
    pub hot_leads: u32,
    pub discovery_runs: u32,
    pub next_checkin_at: Option<DateTime<Utc>>,
    pub deadline_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

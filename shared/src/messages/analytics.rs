//! Read-side engagement analytics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{CampaignId, Channel, OutreachAttempt, Tier};

/// Narrows the attempts an analytics report covers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsFilter {
    pub campaign_id: Option<CampaignId>,
    pub channel: Option<Channel>,
    pub tier: Option<Tier>,
    /// Inclusive lower bound on attempt creation time
    pub since: Option<DateTime<Utc>>,
    /// Exclusive upper bound on attempt creation time
    pub until: Option<DateTime<Utc>>,
}

impl AnalyticsFilter {
    pub fn for_campaign(campaign_id: CampaignId) -> Self {
        Self {
            campaign_id: Some(campaign_id),
            ..Self::default()
        }
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = Some(tier);
        self
    }

    pub fn between(mut self, since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self.until = Some(until);
        self
    }

    pub fn matches(&self, attempt: &OutreachAttempt) -> bool {
        self.campaign_id.map_or(true, |id| attempt.campaign_id == id)
            && self.channel.map_or(true, |channel| attempt.channel == channel)
            && self.tier.map_or(true, |tier| attempt.tier == tier)
            && self.since.map_or(true, |since| attempt.created_at >= since)
            && self.until.map_or(true, |until| attempt.created_at < until)
    }
}

/// Funnel metrics for one slice of attempts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentMetrics {
    pub attempts: u32,
    pub sent: u32,
    pub opened: u32,
    pub responded: u32,
    /// opened / sent
    pub open_rate: f64,
    /// responded / sent
    pub response_rate: f64,
}

pub type ChannelMetrics = SegmentMetrics;
pub type TierMetrics = SegmentMetrics;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub filter: AnalyticsFilter,
    pub totals: SegmentMetrics,
    pub avg_time_to_response_secs: Option<f64>,
    pub median_time_to_response_secs: Option<f64>,
    /// Highest response rate among channels with successful sends
    pub best_channel: Option<Channel>,
    pub by_channel: BTreeMap<Channel, ChannelMetrics>,
    pub by_tier: BTreeMap<Tier, TierMetrics>,
    pub hot_leads: u32,
    pub bids: u32,
}

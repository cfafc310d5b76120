//! Result of recording an engagement event

use serde::{Deserialize, Serialize};

use crate::types::{AttemptId, CampaignId, CampaignState, EventId, InterestLevel};

/// What an engagement event changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementOutcome {
    pub event_id: EventId,
    pub attempt_id: AttemptId,
    pub campaign_id: CampaignId,
    /// The event id had already been applied; nothing changed
    pub duplicate: bool,
    pub score_delta: u32,
    pub engagement_score: u32,
    pub interest_level: InterestLevel,
    /// First transition of this attempt to high interest
    pub hot_lead: bool,
    /// A new distinct bidder was counted for the campaign
    pub bid_recorded: bool,
    pub campaign_state: CampaignState,
}

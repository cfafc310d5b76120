//! Outreach attempts: one contractor contacted on one channel

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{AttemptId, CampaignId, Channel, ContractorKey, InterestLevel, ResponseType, Tier};

/// Delivery status of an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Queued,
    Sent,
    Delivered,
    Failed,
    Bounced,
}

impl AttemptStatus {
    /// Open attempts block re-dispatch on the same contractor and channel
    pub fn is_open(&self) -> bool {
        !matches!(self, AttemptStatus::Failed | AttemptStatus::Bounced)
    }

    /// The message left our side successfully
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptStatus::Sent | AttemptStatus::Delivered)
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttemptStatus::Queued => "queued",
            AttemptStatus::Sent => "sent",
            AttemptStatus::Delivered => "delivered",
            AttemptStatus::Failed => "failed",
            AttemptStatus::Bounced => "bounced",
        };
        write!(f, "{name}")
    }
}

/// Attempt fields supplied by the dispatcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAttempt {
    pub campaign_id: CampaignId,
    pub contractor_key: ContractorKey,
    pub company_name: String,
    pub tier: Tier,
    pub channel: Channel,
}

/// One contractor × channel contact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutreachAttempt {
    pub id: AttemptId,
    pub campaign_id: CampaignId,
    pub contractor_key: ContractorKey,
    pub company_name: String,
    pub tier: Tier,
    pub channel: Channel,
    pub status: AttemptStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub engagement_score: u32,
    pub interest_level: InterestLevel,
    pub response_type: Option<ResponseType>,
    pub first_response_at: Option<DateTime<Utc>>,
    pub bid_submitted: bool,
    pub bid_amount: Option<f64>,
}

impl OutreachAttempt {
    pub fn from_new(new: NewAttempt) -> Self {
        Self {
            id: AttemptId::new(),
            campaign_id: new.campaign_id,
            contractor_key: new.contractor_key,
            company_name: new.company_name,
            tier: new.tier,
            channel: new.channel,
            status: AttemptStatus::Queued,
            error: None,
            created_at: Utc::now(),
            sent_at: None,
            engagement_score: 0,
            interest_level: InterestLevel::None,
            response_type: None,
            first_response_at: None,
            bid_submitted: false,
            bid_amount: None,
        }
    }

    pub fn has_responded(&self) -> bool {
        self.first_response_at.is_some()
    }

    /// Seconds between send and first response
    pub fn time_to_response_secs(&self) -> Option<f64> {
        let sent = self.sent_at.unwrap_or(self.created_at);
        self.first_response_at
            .map(|responded| (responded - sent).num_milliseconds().max(0) as f64 / 1000.0)
    }
}

/// Rendered outbound message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutreachMessage {
    pub attempt_id: AttemptId,
    pub channel: Channel,
    pub subject: String,
    pub body: String,
}

/// Acknowledgement from a channel sender
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendReceipt {
    pub provider_id: Option<String>,
    /// Provider already confirmed delivery
    pub delivered: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_statuses() {
        assert!(AttemptStatus::Queued.is_open());
        assert!(AttemptStatus::Sent.is_open());
        assert!(AttemptStatus::Delivered.is_open());
        assert!(!AttemptStatus::Failed.is_open());
        assert!(!AttemptStatus::Bounced.is_open());
    }

    #[test]
    fn test_new_attempt_starts_queued() {
        let attempt = OutreachAttempt::from_new(NewAttempt {
            campaign_id: CampaignId::new(),
            contractor_key: ContractorKey::new("abc lawn"),
            company_name: "ABC Lawn".to_string(),
            tier: Tier::Tier1,
            channel: Channel::Email,
        });
        assert_eq!(attempt.status, AttemptStatus::Queued);
        assert_eq!(attempt.engagement_score, 0);
        assert_eq!(attempt.interest_level, InterestLevel::None);
        assert!(attempt.time_to_response_secs().is_none());
    }
}

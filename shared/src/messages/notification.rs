//! Notifications pushed to the outside world

use serde::{Deserialize, Serialize};

use crate::types::{AttemptId, CampaignId, Channel, ExpiryReason, ResponseType, Tier};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// An attempt reached high interest for the first time
    HotLead {
        campaign_id: CampaignId,
        attempt_id: AttemptId,
        company_name: String,
        channel: Channel,
        tier: Tier,
        response_type: Option<ResponseType>,
    },
    CampaignEscalated {
        campaign_id: CampaignId,
        sequence: u32,
        action: String,
    },
    CampaignCompleted {
        campaign_id: CampaignId,
        bids_received: u32,
    },
    CampaignExpired {
        campaign_id: CampaignId,
        reason: ExpiryReason,
    },
}

impl NotificationEvent {
    pub fn campaign_id(&self) -> CampaignId {
        match self {
            NotificationEvent::HotLead { campaign_id, .. }
            | NotificationEvent::CampaignEscalated { campaign_id, .. }
            | NotificationEvent::CampaignCompleted { campaign_id, .. }
            | NotificationEvent::CampaignExpired { campaign_id, .. } => *campaign_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            NotificationEvent::HotLead { .. } => "hot_lead",
            NotificationEvent::CampaignEscalated { .. } => "campaign_escalated",
            NotificationEvent::CampaignCompleted { .. } => "campaign_completed",
            NotificationEvent::CampaignExpired { .. } => "campaign_expired",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_is_tagged() {
        let event = NotificationEvent::CampaignExpired {
            campaign_id: CampaignId::new(),
            reason: ExpiryReason::CouldNotFulfill { escalations: 3 },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "campaign_expired");
        assert_eq!(json["reason"]["kind"], "could_not_fulfill");
        assert_eq!(event.kind(), "campaign_expired");
    }
}

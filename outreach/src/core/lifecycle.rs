//! Campaign state machine
//!
//! Forming → Active → {Completed, Escalated, Expired}, Escalated → Active.
//! Completed and Expired are terminal: every event on a terminal campaign is
//! rejected.

use chrono::Utc;
use std::fmt;

use shared::{Campaign, CampaignState, ExpiryReason};

use crate::error::{OutreachError, OutreachResult};

/// Something that can move a campaign between states
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CampaignEvent {
    FirstDispatch,
    BidTargetMet,
    DeadlinePassed,
    CheckInShortfall,
    EscalationResolved,
    /// Shortfall after the escalation budget is spent
    EscalationLimitReached { escalations: u32 },
}

impl fmt::Display for CampaignEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CampaignEvent::FirstDispatch => write!(f, "first_dispatch"),
            CampaignEvent::BidTargetMet => write!(f, "bid_target_met"),
            CampaignEvent::DeadlinePassed => write!(f, "deadline_passed"),
            CampaignEvent::CheckInShortfall => write!(f, "check_in_shortfall"),
            CampaignEvent::EscalationResolved => write!(f, "escalation_resolved"),
            CampaignEvent::EscalationLimitReached { .. } => write!(f, "escalation_limit_reached"),
        }
    }
}

/// Next state for `event` from `from`, or an error if the move is illegal
pub fn next_state(from: CampaignState, event: &CampaignEvent) -> OutreachResult<CampaignState> {
    use CampaignEvent as E;
    use CampaignState as S;

    let next = match (from, event) {
        (S::Forming, E::FirstDispatch) => S::Active,
        (S::Active, E::BidTargetMet) => S::Completed,
        (S::Active, E::DeadlinePassed) => S::Expired,
        (S::Active, E::CheckInShortfall) => S::Escalated,
        (S::Active, E::EscalationLimitReached { .. }) => S::Expired,
        (S::Escalated, E::EscalationResolved) => S::Active,
        _ => {
            return Err(OutreachError::InvalidTransition {
                from,
                event: event.to_string(),
            })
        }
    };
    Ok(next)
}

/// Apply a transition to a campaign, stamping timestamps and expiry reasons
pub fn apply(campaign: &mut Campaign, event: CampaignEvent) -> OutreachResult<CampaignState> {
    let next = next_state(campaign.state, &event)?;
    let now = Utc::now();

    match (&event, next) {
        (CampaignEvent::FirstDispatch, _) => campaign.activated_at = Some(now),
        (CampaignEvent::CheckInShortfall, _) => campaign.escalation_count += 1,
        (CampaignEvent::DeadlinePassed, _) => {
            campaign.expiry_reason = Some(ExpiryReason::DeadlinePassed)
        }
        (CampaignEvent::EscalationLimitReached { escalations }, _) => {
            campaign.expiry_reason = Some(ExpiryReason::CouldNotFulfill {
                escalations: *escalations,
            })
        }
        _ => {}
    }
    if next.is_terminal() {
        campaign.closed_at = Some(now);
    }
    campaign.state = next;
    campaign.updated_at = now;
    Ok(next)
}

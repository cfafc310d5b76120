//! Escalation actions and the default ladder policy

use serde::{Deserialize, Serialize};
use std::fmt;

use shared::{CampaignId, Channel, Tier};

use crate::traits::EscalationPolicy;

/// What the policy sees when a check-in falls short
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationContext {
    pub campaign_id: CampaignId,
    pub checkin_sequence: u32,
    /// Escalations already performed before this one
    pub prior_escalations: u32,
    pub expected_responses: u32,
    pub actual_responses: u32,
    pub radius_miles: f64,
    pub max_radius_miles: f64,
    /// Tier re-queried when the radius widens
    pub shortfall_tier: Tier,
    pub enabled_channels: Vec<Channel>,
    /// Channels with a sender that the campaign does not use yet
    pub unused_channels: Vec<Channel>,
    pub min_score: f64,
}

impl EscalationContext {
    pub fn can_widen(&self) -> bool {
        self.radius_miles < self.max_radius_miles
    }
}

/// Corrective action for one shortfall
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EscalationAction {
    /// Multiply the radius and re-run discovery for `tier`
    WidenRadius { multiplier: f64, tier: Tier },
    /// Enable another channel for contractors already contacted
    AddChannel { channel: Channel },
    /// Lower the minimum score and reach further down the ranking
    RelaxScoreBar { by: f64 },
}

impl fmt::Display for EscalationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EscalationAction::WidenRadius { multiplier, tier } => {
                write!(f, "widen radius x{multiplier} for {tier}")
            }
            EscalationAction::AddChannel { channel } => write!(f, "add channel {channel}"),
            EscalationAction::RelaxScoreBar { by } => write!(f, "relax score bar by {by}"),
        }
    }
}

/// Widen radius, then add a channel, then relax the score bar
///
/// A rung that cannot apply (radius already at the cap, no unused channel)
/// falls through to the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct LadderPolicy {
    pub radius_multiplier: f64,
    pub score_relaxation: f64,
}

impl Default for LadderPolicy {
    fn default() -> Self {
        Self {
            radius_multiplier: 2.0,
            score_relaxation: 10.0,
        }
    }
}

impl EscalationPolicy for LadderPolicy {
    fn choose(&self, context: &EscalationContext) -> EscalationAction {
        let widen = EscalationAction::WidenRadius {
            multiplier: self.radius_multiplier,
            tier: context.shortfall_tier,
        };
        let add_channel = context
            .unused_channels
            .first()
            .map(|channel| EscalationAction::AddChannel { channel: *channel });
        let relax = EscalationAction::RelaxScoreBar {
            by: self.score_relaxation,
        };

        match context.prior_escalations {
            0 if context.can_widen() => widen,
            0 | 1 => add_channel.unwrap_or(relax),
            _ => relax,
        }
    }
}

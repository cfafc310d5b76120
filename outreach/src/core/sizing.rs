//! Outreach sizing: converting a bid target into a contact plan
//!
//! One canonical entry point, [`plan_outreach`], parameterised by a
//! [`SizingPolicy`]. The blended policy multiplies the bid target by a fixed
//! factor and assumes a single response rate; the per-tier policy fills
//! contacts greedily in tier priority until the expected bid count covers the
//! target. When supply runs short both degrade to contacting everyone.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use shared::Tier;

const EPSILON: f64 = 1e-9;

/// How many contacts a bid target requires
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SizingPolicy {
    /// Contact `ceil(B × multiplier)` contractors at one blended response rate
    Blended { multiplier: f64, response_rate: f64 },

    /// Per-tier response probabilities, filled greedily in tier order
    PerTier { tier1: f64, tier2: f64, tier3: f64 },
}

impl Default for SizingPolicy {
    fn default() -> Self {
        SizingPolicy::Blended {
            multiplier: 5.0,
            response_rate: 0.33,
        }
    }
}

impl SizingPolicy {
    pub fn per_tier_default() -> Self {
        SizingPolicy::PerTier {
            tier1: 0.90,
            tier2: 0.50,
            tier3: 0.20,
        }
    }

    /// Expected response probability of one contact from `tier`
    pub fn rate_for(&self, tier: Tier) -> f64 {
        match self {
            SizingPolicy::Blended { response_rate, .. } => *response_rate,
            SizingPolicy::PerTier { tier1, tier2, tier3 } => match tier {
                Tier::Tier1 => *tier1,
                Tier::Tier2 => *tier2,
                Tier::Tier3 => *tier3,
            },
        }
    }

    /// Validate rates and multiplier, returning the offending field
    pub fn validate(&self) -> Result<(), String> {
        let in_unit = |value: f64| value > 0.0 && value <= 1.0;
        match self {
            SizingPolicy::Blended {
                multiplier,
                response_rate,
            } => {
                if !(*multiplier >= 1.0) {
                    return Err("sizing.multiplier".to_string());
                }
                if !in_unit(*response_rate) {
                    return Err("sizing.response_rate".to_string());
                }
            }
            SizingPolicy::PerTier { tier1, tier2, tier3 } => {
                for (name, rate) in [("tier1", tier1), ("tier2", tier2), ("tier3", tier3)] {
                    if !in_unit(*rate) {
                        return Err(format!("sizing.{name}"));
                    }
                }
            }
        }
        Ok(())
    }
}

/// How the plan distributes contacts across the ranked candidates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Allocation {
    /// Top-N overall by rank
    Total(u32),
    /// Top-N within each tier
    PerTier(BTreeMap<Tier, u32>),
}

impl Allocation {
    pub fn total(&self) -> u32 {
        match self {
            Allocation::Total(count) => *count,
            Allocation::PerTier(counts) => counts.values().sum(),
        }
    }
}

/// Result of sizing a bid target against available supply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutreachPlan {
    pub bids_needed: u32,
    /// Contacts the policy wants with unlimited supply
    pub desired_contacts: u32,
    pub allocation: Allocation,
    pub expected_responses: f64,
    /// Percentage in [0, 100]
    pub confidence: f64,
    /// Supply was short and every candidate is contacted
    pub best_effort: bool,
}

impl OutreachPlan {
    pub fn planned_contacts(&self) -> u32 {
        self.allocation.total()
    }
}

/// Confidence that `expected` responses cover `bids_needed`, as a percentage
pub fn confidence(expected: f64, bids_needed: u32) -> f64 {
    if bids_needed == 0 {
        return 100.0;
    }
    (expected / bids_needed as f64 * 100.0).clamp(0.0, 100.0)
}

/// Expected responses from actual per-tier contact counts
pub fn expected_responses(contacted: &BTreeMap<Tier, u32>, policy: &SizingPolicy) -> f64 {
    contacted
        .iter()
        .map(|(tier, count)| *count as f64 * policy.rate_for(*tier))
        .sum()
}

/// Contacts needed before discovery may stop querying lower tiers
pub fn discovery_target(bids_needed: u32, policy: &SizingPolicy) -> u32 {
    match policy {
        SizingPolicy::Blended { multiplier, .. } => ceil_count(bids_needed as f64 * multiplier),
        SizingPolicy::PerTier { tier3, .. } => ceil_count(bids_needed as f64 / tier3),
    }
}

/// Size outreach for `bids_needed` given the per-tier candidate supply
pub fn plan_outreach(
    bids_needed: u32,
    supply: &BTreeMap<Tier, u32>,
    policy: &SizingPolicy,
) -> OutreachPlan {
    match policy {
        SizingPolicy::Blended {
            multiplier,
            response_rate,
        } => {
            let desired = ceil_count(bids_needed as f64 * multiplier);
            let available: u32 = supply.values().sum();
            let contacts = desired.min(available);
            let expected = contacts as f64 * response_rate;
            OutreachPlan {
                bids_needed,
                desired_contacts: desired,
                allocation: Allocation::Total(contacts),
                expected_responses: expected,
                confidence: confidence(expected, bids_needed),
                best_effort: available < desired,
            }
        }
        SizingPolicy::PerTier { .. } => {
            let mut remaining = bids_needed as f64;
            let mut counts = BTreeMap::new();
            let mut expected = 0.0;

            for tier in Tier::ALL {
                let available = supply.get(&tier).copied().unwrap_or(0);
                let rate = policy.rate_for(tier);
                let take = if remaining <= EPSILON {
                    0
                } else {
                    ceil_count(remaining / rate).min(available)
                };
                if take > 0 {
                    counts.insert(tier, take);
                }
                expected += take as f64 * rate;
                remaining -= take as f64 * rate;
            }

            // Greedy fill only leaves a gap when every tier was exhausted
            let best_effort = remaining > EPSILON;
            let planned: u32 = counts.values().sum();
            let desired = if best_effort {
                planned + ceil_count(remaining / policy.rate_for(Tier::Tier3))
            } else {
                planned
            };

            OutreachPlan {
                bids_needed,
                desired_contacts: desired,
                allocation: Allocation::PerTier(counts),
                expected_responses: expected,
                confidence: confidence(expected, bids_needed),
                best_effort,
            }
        }
    }
}

fn ceil_count(value: f64) -> u32 {
    if value <= 0.0 {
        0
    } else {
        (value - EPSILON).ceil().max(0.0) as u32
    }
}

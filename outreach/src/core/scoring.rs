//! Deterministic scoring fallback, ranking and selection

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use shared::{Assessment, Candidate, ContractorKey, OracleAssessment, ScoreSource, ScoredCandidate, Tier};

use super::dedup::KeyedCandidate;
use super::sizing::Allocation;

/// Weights for the heuristic used when the oracle is unavailable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicWeights {
    pub base: f64,
    /// Points per rating star above `rating_pivot`
    pub rating_weight: f64,
    pub rating_pivot: f64,
    /// (minimum review count, bonus), highest threshold first
    pub review_bonuses: Vec<(u32, f64)>,
    /// Bonus for having at least one usable contact channel
    pub contact_bonus: f64,
}

impl Default for HeuristicWeights {
    fn default() -> Self {
        Self {
            base: 40.0,
            rating_weight: 10.0,
            rating_pivot: 3.0,
            review_bonuses: vec![(100, 15.0), (25, 10.0), (5, 5.0)],
            contact_bonus: 10.0,
        }
    }
}

/// Score a candidate without the oracle
pub fn heuristic_assessment(candidate: &Candidate, weights: &HeuristicWeights, reason: &str) -> Assessment {
    let mut score = weights.base;
    let mut strengths = Vec::new();
    let mut concerns = Vec::new();

    match candidate.rating {
        Some(rating) => {
            let bonus = (rating - weights.rating_pivot).max(0.0) * weights.rating_weight;
            score += bonus;
            if bonus > 0.0 {
                strengths.push(format!("rated {rating:.1}"));
            } else {
                concerns.push(format!("rated {rating:.1}"));
            }
        }
        None => concerns.push("no rating".to_string()),
    }

    let reviews = candidate.review_count.unwrap_or(0);
    if let Some((_, bonus)) = weights
        .review_bonuses
        .iter()
        .find(|(threshold, _)| reviews >= *threshold)
    {
        score += bonus;
        strengths.push(format!("{reviews} reviews"));
    } else {
        concerns.push("few reviews".to_string());
    }

    if candidate.contact.has_any() {
        score += weights.contact_bonus;
    } else {
        concerns.push("no contact channel".to_string());
    }

    Assessment {
        score: score.clamp(0.0, 100.0),
        reasoning: format!("heuristic score ({reason})"),
        strengths,
        concerns,
        source: ScoreSource::Heuristic {
            reason: reason.to_string(),
        },
    }
}

/// Accept an oracle result only if its score is a number in [0, 100]
pub fn accept_oracle(assessment: OracleAssessment) -> Result<Assessment, String> {
    if assessment.score.is_finite() && (0.0..=100.0).contains(&assessment.score) {
        Ok(Assessment::from_oracle(assessment))
    } else {
        Err(format!("oracle score out of range: {}", assessment.score))
    }
}

/// Score descending, then tier priority, then arrival order
fn rank_order(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.score()
        .total_cmp(&a.score())
        .then_with(|| a.tier().cmp(&b.tier()))
        .then_with(|| a.arrival.cmp(&b.arrival))
}

/// Attach assessments and assign 1-based ranks
pub fn rank(scored: Vec<(KeyedCandidate, Assessment)>) -> Vec<ScoredCandidate> {
    let mut ranked: Vec<ScoredCandidate> = scored
        .into_iter()
        .map(|(keyed, assessment)| ScoredCandidate {
            key: keyed.key,
            candidate: keyed.candidate,
            arrival: keyed.arrival,
            assessment,
            rank: 0,
        })
        .collect();
    ranked.sort_by(rank_order);
    for (index, candidate) in ranked.iter_mut().enumerate() {
        candidate.rank = index + 1;
    }
    ranked
}

/// Per-tier count of candidates at or above the score bar
pub fn eligible_supply(ranked: &[ScoredCandidate], min_score: f64) -> BTreeMap<Tier, u32> {
    let mut supply = BTreeMap::new();
    for candidate in ranked.iter().filter(|c| c.score() >= min_score) {
        *supply.entry(candidate.tier()).or_insert(0) += 1;
    }
    supply
}

/// Pick candidates in rank order according to the allocation
pub fn select(
    ranked: &[ScoredCandidate],
    allocation: &Allocation,
    min_score: f64,
    skip: &HashSet<ContractorKey>,
) -> Vec<ScoredCandidate> {
    let eligible = ranked
        .iter()
        .filter(|c| c.score() >= min_score && !skip.contains(&c.key));

    match allocation {
        Allocation::Total(count) => eligible.take(*count as usize).cloned().collect(),
        Allocation::PerTier(counts) => {
            let mut taken: BTreeMap<Tier, u32> = BTreeMap::new();
            eligible
                .filter(|c| {
                    let limit = counts.get(&c.tier()).copied().unwrap_or(0);
                    let used = taken.entry(c.tier()).or_insert(0);
                    if *used < limit {
                        *used += 1;
                        true
                    } else {
                        false
                    }
                })
                .cloned()
                .collect()
        }
    }
}

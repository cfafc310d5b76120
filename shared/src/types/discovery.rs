//! Discovery run audit records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CampaignId, ContractorKey, DiscoveryRunId, JobId, ScoredCandidate, Tier};

/// Why a discovery run happened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiscoveryTrigger {
    Kickoff,
    Escalation { sequence: u32 },
}

/// Outcome of querying one tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TierStatus {
    Queried,
    /// Skipped on purpose, e.g. earlier tiers already covered the need
    NotQueried { reason: String },
    NotConfigured,
    /// Transient failure after retry, counted as zero candidates
    Failed { reason: String },
    /// Permanent failure, tier disabled for the rest of the run
    Unusable { reason: String },
}

impl TierStatus {
    pub fn was_queried(&self) -> bool {
        matches!(
            self,
            TierStatus::Queried | TierStatus::Failed { .. } | TierStatus::Unusable { .. }
        )
    }
}

/// Per-tier audit entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierReport {
    pub tier: Tier,
    pub status: TierStatus,
    /// Raw candidates returned, before dedup
    pub found: u32,
    /// Candidates that survived dedup
    pub unique_added: u32,
    pub radius_miles: f64,
    /// Source calls made, including retries and expansion stages
    pub calls: u32,
}

impl TierReport {
    pub fn skipped(tier: Tier, status: TierStatus, radius_miles: f64) -> Self {
        Self {
            tier,
            status,
            found: 0,
            unique_added: 0,
            radius_miles,
            calls: 0,
        }
    }
}

/// Why radius expansion stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpansionStop {
    TargetMet,
    FloorMet,
    StagesExhausted,
    MaxRadiusReached,
    SourceUnusable,
}

/// One radius stage of an expansion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpansionStage {
    pub stage: u32,
    pub radius_miles: f64,
    pub found: u32,
    pub new_unique: u32,
    pub cumulative: u32,
}

/// Full trace of an adaptive radius expansion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpansionTrace {
    pub tier: Tier,
    pub start_radius_miles: f64,
    pub achieved_radius_miles: f64,
    pub target: u32,
    pub floor: u32,
    pub stages: Vec<ExpansionStage>,
    pub stop: ExpansionStop,
}

impl ExpansionTrace {
    pub fn stage_count(&self) -> u32 {
        self.stages.len() as u32
    }

    pub fn cumulative(&self) -> u32 {
        self.stages.last().map(|s| s.cumulative).unwrap_or(0)
    }

    pub fn meets_target(&self) -> bool {
        self.cumulative() >= self.target
    }

    pub fn meets_floor(&self) -> bool {
        self.cumulative() >= self.floor
    }
}

/// Provenance of a candidate dropped as a duplicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateRecord {
    pub key: ContractorKey,
    pub kept_tier: Tier,
    pub kept_source_id: String,
    pub dropped_tier: Tier,
    pub dropped_source_id: String,
}

/// A malformed candidate removed before scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroppedCandidate {
    pub tier: Tier,
    pub source_id: String,
    pub company_name: String,
    pub reason: String,
}

/// Append-only record of one discovery pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryRun {
    pub id: DiscoveryRunId,
    pub campaign_id: CampaignId,
    pub job_id: JobId,
    pub trigger: DiscoveryTrigger,
    pub contacts_needed: u32,
    pub radius_miles: f64,
    pub tiers: Vec<TierReport>,
    pub expansions: Vec<ExpansionTrace>,
    pub duplicates: Vec<DuplicateRecord>,
    pub dropped: Vec<DroppedCandidate>,
    pub unique_count: u32,
    /// Scored candidates in rank order
    pub ranked: Vec<ScoredCandidate>,
    /// Keys chosen for outreach from `ranked`
    pub selected: Vec<ContractorKey>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl DiscoveryRun {
    pub fn tier_report(&self, tier: Tier) -> Option<&TierReport> {
        self.tiers.iter().find(|report| report.tier == tier)
    }
}

//! Core business logic modules
//!
//! Pure functions and plain data: no I/O, no clocks beyond timestamps,
//! deterministic and easily testable.

pub mod dedup;
pub mod engagement;
pub mod lifecycle;
pub mod scoring;
pub mod sizing;

pub use dedup::{CandidateMerger, KeyedCandidate, MergeOutcome, NameNormalizer};
pub use engagement::{AppliedEngagement, EngagementWeights};
pub use lifecycle::CampaignEvent;
pub use scoring::HeuristicWeights;
pub use sizing::{plan_outreach, Allocation, OutreachPlan, SizingPolicy};

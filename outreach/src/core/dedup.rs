//! Candidate deduplication by normalized company name
//!
//! Candidates arrive in tier order (Tier1, Tier2, Tier3). The first
//! occurrence of a normalized name wins; later occurrences are dropped with
//! their provenance recorded. Malformed candidates are removed before they
//! can claim a key.

use regex::Regex;
use std::collections::{HashMap, HashSet};

use shared::{
    component_warn, Candidate, Component, ContractorKey, DroppedCandidate, DuplicateRecord, Tier,
};

use crate::error::{OutreachError, OutreachResult};

/// Builds dedup keys from company names
#[derive(Debug, Clone)]
pub struct NameNormalizer {
    separators: Regex,
    punctuation: Regex,
    whitespace: Regex,
    legal_suffix: Regex,
}

impl NameNormalizer {
    pub fn new() -> OutreachResult<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| OutreachError::ConfigurationError {
                field: format!("name normalizer pattern {pattern}: {e}"),
            })
        };
        Ok(Self {
            separators: compile(r"[-_/&+]")?,
            punctuation: compile(r"[^\p{L}\p{N}\s]")?,
            whitespace: compile(r"\s+")?,
            legal_suffix: compile(
                r"\s+(llc|l l c|inc|incorporated|co|company|corp|corporation|ltd|limited|llp|pllc|lp)$",
            )?,
        })
    }

    /// Lower-case, strip punctuation, collapse whitespace, drop trailing legal suffixes
    pub fn normalize(&self, company_name: &str) -> Option<ContractorKey> {
        let lowered = company_name.to_lowercase();
        let spaced = self.separators.replace_all(&lowered, " ");
        let stripped = self.punctuation.replace_all(&spaced, "");
        let mut name = self.whitespace.replace_all(stripped.trim(), " ").into_owned();

        // "Smith Co Inc" loses both suffixes; a bare "Co" keeps its name
        while let Some(found) = self.legal_suffix.find(&name) {
            if found.start() == 0 {
                break;
            }
            name.truncate(found.start());
        }

        if name.is_empty() {
            None
        } else {
            Some(ContractorKey::new(name))
        }
    }

    /// Validate a candidate and derive its key
    pub fn key_for(&self, candidate: &Candidate) -> OutreachResult<ContractorKey> {
        let malformed = |reason: &str| OutreachError::DataIntegrity {
            company_name: candidate.company_name.clone(),
            reason: reason.to_string(),
        };

        if let Some(rating) = candidate.rating {
            if !(0.0..=5.0).contains(&rating) {
                return Err(malformed("rating outside 0-5"));
            }
        }
        if let Some(distance) = candidate.distance_miles {
            if !(distance >= 0.0) {
                return Err(malformed("negative or invalid distance"));
            }
        }
        self.normalize(&candidate.company_name)
            .ok_or_else(|| malformed("no usable company name"))
    }
}

/// A unique candidate with its dedup key and merge position
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedCandidate {
    pub key: ContractorKey,
    pub candidate: Candidate,
    pub arrival: usize,
}

/// What happened to a candidate offered to the merger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Added,
    Duplicate,
    Excluded,
    Dropped,
}

/// Order-preserving unique set across tiers and expansion stages
#[derive(Debug, Clone)]
pub struct CandidateMerger {
    normalizer: NameNormalizer,
    excluded: HashSet<ContractorKey>,
    first_seen: HashMap<ContractorKey, (Tier, String)>,
    recorded: HashSet<(ContractorKey, Tier, String)>,
    unique: Vec<KeyedCandidate>,
    duplicates: Vec<DuplicateRecord>,
    dropped: Vec<DroppedCandidate>,
}

impl CandidateMerger {
    pub fn new(normalizer: NameNormalizer, excluded: HashSet<ContractorKey>) -> Self {
        Self {
            normalizer,
            excluded,
            first_seen: HashMap::new(),
            recorded: HashSet::new(),
            unique: Vec::new(),
            duplicates: Vec::new(),
            dropped: Vec::new(),
        }
    }

    pub fn offer(&mut self, candidate: Candidate) -> MergeOutcome {
        let key = match self.normalizer.key_for(&candidate) {
            Ok(key) => key,
            Err(e) => {
                component_warn!(
                    Component::Discovery,
                    tier = %candidate.tier,
                    source_id = %candidate.source_id,
                    "🧹 Dropping candidate: {}",
                    e
                );
                let reason = match e {
                    OutreachError::DataIntegrity { reason, .. } => reason,
                    other => other.to_string(),
                };
                self.dropped.push(DroppedCandidate {
                    tier: candidate.tier,
                    source_id: candidate.source_id,
                    company_name: candidate.company_name,
                    reason,
                });
                return MergeOutcome::Dropped;
            }
        };

        if self.excluded.contains(&key) {
            return MergeOutcome::Excluded;
        }

        if let Some((kept_tier, kept_source_id)) = self.first_seen.get(&key) {
            // Re-queries at a wider radius return the same records again
            let repeat = *kept_tier == candidate.tier && *kept_source_id == candidate.source_id;
            let provenance = (key.clone(), candidate.tier, candidate.source_id.clone());
            if repeat || !self.recorded.insert(provenance) {
                return MergeOutcome::Duplicate;
            }
            self.duplicates.push(DuplicateRecord {
                key,
                kept_tier: *kept_tier,
                kept_source_id: kept_source_id.clone(),
                dropped_tier: candidate.tier,
                dropped_source_id: candidate.source_id,
            });
            return MergeOutcome::Duplicate;
        }

        self.first_seen
            .insert(key.clone(), (candidate.tier, candidate.source_id.clone()));
        let arrival = self.unique.len();
        self.unique.push(KeyedCandidate {
            key,
            candidate,
            arrival,
        });
        MergeOutcome::Added
    }

    /// Offer a batch, returning how many were added
    pub fn extend(&mut self, candidates: impl IntoIterator<Item = Candidate>) -> u32 {
        candidates
            .into_iter()
            .map(|candidate| self.offer(candidate))
            .filter(|outcome| *outcome == MergeOutcome::Added)
            .count() as u32
    }

    pub fn unique_count(&self) -> u32 {
        self.unique.len() as u32
    }

    pub fn into_parts(self) -> (Vec<KeyedCandidate>, Vec<DuplicateRecord>, Vec<DroppedCandidate>) {
        (self.unique, self.duplicates, self.dropped)
    }
}

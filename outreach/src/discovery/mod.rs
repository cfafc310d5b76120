//! Tiered discovery orchestration
//!
//! Tiers are queried in fixed priority order (Tier1, Tier2, Tier3). In the
//! default cascading mode discovery stops as soon as the accumulated unique
//! count covers the contacts needed, recording skipped tiers as
//! `NotQueried`. In parallel mode every requested tier is queried at once and
//! results are merged in tier order, never completion order. Source failures
//! never abort discovery: transient ones count as zero candidates, permanent
//! ones mark the tier unusable for the run.

pub mod expansion;

use futures_util::future::{join_all, BoxFuture, FutureExt};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use shared::{
    component_info, component_warn, Component, ContractorKey, DroppedCandidate,
    DuplicateRecord, ExpansionTrace, Job, Tier, TierReport, TierStatus,
};

use crate::config::{DiscoveryConfig, ExpansionConfig};
use crate::core::{CandidateMerger, KeyedCandidate, NameNormalizer};
use crate::error::SourceError;
use crate::resilience::call_with_retry;
use crate::traits::CandidateSource;

pub use expansion::{expand_radius, ExpansionOutcome, ExpansionPlan};

/// What to discover
#[derive(Debug, Clone)]
pub struct DiscoveryRequest {
    pub job: Job,
    pub radius_miles: f64,
    /// Unique candidates wanted before lower tiers are skipped
    pub contacts_needed: u32,
    /// Tiers to consider; queried in priority order regardless of input order
    pub tiers: Vec<Tier>,
    /// Keys that must not be returned (already contacted)
    pub exclude: HashSet<ContractorKey>,
}

impl DiscoveryRequest {
    pub fn new(job: Job, radius_miles: f64, contacts_needed: u32) -> Self {
        Self {
            job,
            radius_miles,
            contacts_needed,
            tiers: Tier::ALL.to_vec(),
            exclude: HashSet::new(),
        }
    }

    pub fn only_tiers(mut self, tiers: Vec<Tier>) -> Self {
        self.tiers = tiers;
        self
    }

    pub fn excluding(mut self, exclude: HashSet<ContractorKey>) -> Self {
        self.exclude = exclude;
        self
    }
}

/// Merged, deduplicated discovery output with its audit trail
#[derive(Debug, Clone)]
pub struct DiscoveryOutcome {
    pub tiers: Vec<TierReport>,
    pub expansions: Vec<ExpansionTrace>,
    /// Unique candidates in tier-ordered arrival order
    pub unique: Vec<KeyedCandidate>,
    pub duplicates: Vec<DuplicateRecord>,
    pub dropped: Vec<DroppedCandidate>,
}

impl DiscoveryOutcome {
    pub fn unique_count(&self) -> u32 {
        self.unique.len() as u32
    }

    /// Widest radius actually searched
    pub fn max_radius_miles(&self, default: f64) -> f64 {
        self.tiers
            .iter()
            .filter(|report| report.status.was_queried())
            .map(|report| report.radius_miles)
            .fold(default, f64::max)
    }
}

/// One tier's report, expansion trace and private merger
type TierQuery = (TierReport, Option<ExpansionTrace>, CandidateMerger);

/// Queries tier sources and merges their candidates
pub struct Discovery {
    sources: BTreeMap<Tier, Arc<dyn CandidateSource>>,
    normalizer: NameNormalizer,
    config: DiscoveryConfig,
    expansion: ExpansionConfig,
    timeout: Duration,
}

impl Discovery {
    /// Sources are keyed by their own `tier()`; a later source for the same tier replaces an earlier one
    pub fn new(
        sources: Vec<Arc<dyn CandidateSource>>,
        normalizer: NameNormalizer,
        config: DiscoveryConfig,
        expansion: ExpansionConfig,
        timeout: Duration,
    ) -> Self {
        let sources = sources
            .into_iter()
            .map(|source| (source.tier(), source))
            .collect();
        Self {
            sources,
            normalizer,
            config,
            expansion,
            timeout,
        }
    }

    pub async fn discover(&self, request: &DiscoveryRequest) -> DiscoveryOutcome {
        let mut tiers: Vec<Tier> = request.tiers.clone();
        tiers.sort();
        tiers.dedup();

        component_info!(
            Component::Discovery,
            job_id = %request.job.id,
            radius_miles = request.radius_miles,
            contacts_needed = request.contacts_needed,
            parallel = self.config.parallel_tiers,
            "🔍 Starting discovery across {} tiers",
            tiers.len()
        );

        let outcome = if self.config.parallel_tiers {
            self.discover_parallel(request, &tiers).await
        } else {
            self.discover_cascading(request, &tiers).await
        };

        component_info!(
            Component::Discovery,
            job_id = %request.job.id,
            unique = outcome.unique_count(),
            duplicates = outcome.duplicates.len(),
            dropped = outcome.dropped.len(),
            "✅ Discovery complete"
        );
        outcome
    }

    async fn discover_cascading(&self, request: &DiscoveryRequest, tiers: &[Tier]) -> DiscoveryOutcome {
        let mut merger = CandidateMerger::new(self.normalizer.clone(), request.exclude.clone());
        let mut reports = Vec::new();
        let mut expansions = Vec::new();

        for tier in tiers {
            if merger.unique_count() >= request.contacts_needed {
                reports.push(TierReport::skipped(
                    *tier,
                    TierStatus::NotQueried {
                        reason: format!(
                            "{} unique candidates already cover {} needed",
                            merger.unique_count(),
                            request.contacts_needed
                        ),
                    },
                    request.radius_miles,
                ));
                continue;
            }

            let target = request.contacts_needed.saturating_sub(merger.unique_count());
            let (report, trace) = self.query_tier(*tier, request, target, &mut merger).await;
            reports.push(report);
            expansions.extend(trace);
        }

        let (unique, duplicates, dropped) = merger.into_parts();
        DiscoveryOutcome {
            tiers: reports,
            expansions,
            unique,
            duplicates,
            dropped,
        }
    }

    async fn discover_parallel(&self, request: &DiscoveryRequest, tiers: &[Tier]) -> DiscoveryOutcome {
        let queries: Vec<BoxFuture<'_, TierQuery>> = tiers
            .iter()
            .map(|tier| self.query_tier_alone(*tier, request).boxed())
            .collect();
        // join_all preserves input order, which is tier order
        let results = join_all(queries).await;

        let mut merger = CandidateMerger::new(self.normalizer.clone(), request.exclude.clone());
        let mut reports = Vec::new();
        let mut expansions = Vec::new();
        let mut duplicates = Vec::new();
        let mut dropped = Vec::new();

        for (mut report, trace, local) in results {
            let (local_unique, local_duplicates, local_dropped) = local.into_parts();
            report.unique_added =
                merger.extend(local_unique.into_iter().map(|keyed| keyed.candidate));
            reports.push(report);
            expansions.extend(trace);
            duplicates.extend(local_duplicates);
            dropped.extend(local_dropped);
        }

        let (unique, merged_duplicates, _) = merger.into_parts();
        duplicates.extend(merged_duplicates);
        DiscoveryOutcome {
            tiers: reports,
            expansions,
            unique,
            duplicates,
            dropped,
        }
    }

    /// Query one tier into a merger of its own
    async fn query_tier_alone(&self, tier: Tier, request: &DiscoveryRequest) -> TierQuery {
        let mut local = CandidateMerger::new(self.normalizer.clone(), request.exclude.clone());
        let (report, trace) = self
            .query_tier(tier, request, request.contacts_needed, &mut local)
            .await;
        (report, trace, local)
    }

    /// Query one tier into `merger`, with expansion where configured
    async fn query_tier(
        &self,
        tier: Tier,
        request: &DiscoveryRequest,
        target: u32,
        merger: &mut CandidateMerger,
    ) -> (TierReport, Option<ExpansionTrace>) {
        let Some(source) = self.sources.get(&tier) else {
            component_warn!(Component::Discovery, tier = %tier, "⚠️ No source configured");
            return (
                TierReport::skipped(tier, TierStatus::NotConfigured, request.radius_miles),
                None,
            );
        };

        let job = &request.job;
        let timeout = self.timeout;

        if self.config.expand_tiers.contains(&tier) {
            let plan = ExpansionPlan::new(tier, request.radius_miles, target, &self.expansion);
            let fetch = |radius: f64| call_with_retry(timeout, move || source.find(job, radius)).boxed();
            let before = merger.unique_count();
            let outcome = expand_radius(&plan, merger, fetch).await;

            let status = match (&outcome.last_error, outcome.all_failed) {
                (Some(SourceError::Permanent(reason)), _) => TierStatus::Unusable {
                    reason: reason.clone(),
                },
                (Some(e), true) => TierStatus::Failed {
                    reason: e.message().to_string(),
                },
                _ => TierStatus::Queried,
            };
            let report = TierReport {
                tier,
                status,
                found: outcome.found,
                unique_added: merger.unique_count() - before,
                radius_miles: outcome.trace.achieved_radius_miles,
                calls: outcome.calls,
            };
            return (report, Some(outcome.trace));
        }

        let call = call_with_retry(timeout, || source.find(job, request.radius_miles)).await;
        let mut report = TierReport::skipped(tier, TierStatus::Queried, request.radius_miles);
        report.calls = call.calls;

        match call.result {
            Ok(candidates) => {
                report.found = candidates.len() as u32;
                report.unique_added = merger.extend(candidates);
                component_info!(
                    Component::Discovery,
                    tier = %tier,
                    found = report.found,
                    unique_added = report.unique_added,
                    "📥 Tier queried"
                );
            }
            Err(SourceError::Transient(reason)) => {
                component_warn!(
                    Component::Discovery,
                    tier = %tier,
                    "⚠️ Tier failed after retry, treating as empty: {}",
                    reason
                );
                report.status = TierStatus::Failed { reason };
            }
            Err(SourceError::Permanent(reason)) => {
                component_warn!(
                    Component::Discovery,
                    tier = %tier,
                    "🚫 Tier unusable for this run: {}",
                    reason
                );
                report.status = TierStatus::Unusable { reason };
            }
        }
        (report, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockCandidateSource;
    use shared::{Candidate, JobRequest, Location, Urgency};

    fn job() -> Job {
        Job::from_request(
            JobRequest::new("lawn_care", Location::named("Austin, TX")),
            5,
            Urgency::Standard,
        )
    }

    fn names(tier: Tier, names: &[&str]) -> Vec<Candidate> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| Candidate::new(format!("{tier}-{i}"), tier, *name))
            .collect()
    }

    fn source(tier: Tier, result: Result<Vec<Candidate>, SourceError>) -> Arc<dyn CandidateSource> {
        let mut mock = MockCandidateSource::new();
        mock.expect_tier().return_const(tier);
        mock.expect_find().returning(move |_, _| result.clone());
        Arc::new(mock)
    }

    fn unused_source(tier: Tier) -> Arc<dyn CandidateSource> {
        let mut mock = MockCandidateSource::new();
        mock.expect_tier().return_const(tier);
        mock.expect_find().never();
        Arc::new(mock)
    }

    fn discovery(sources: Vec<Arc<dyn CandidateSource>>, parallel: bool) -> Discovery {
        let config = DiscoveryConfig {
            parallel_tiers: parallel,
            ..DiscoveryConfig::default()
        };
        Discovery::new(
            sources,
            NameNormalizer::new().unwrap(),
            config,
            ExpansionConfig::default(),
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn test_cascade_merges_all_tiers_in_order() {
        let discovery = discovery(
            vec![
                source(Tier::Tier3, Ok(names(Tier::Tier3, &["Delta", "ABC Lawn LLC"]))),
                source(Tier::Tier1, Ok(names(Tier::Tier1, &["ABC Lawn", "Beta", "Gamma"]))),
                source(Tier::Tier2, Ok(names(Tier::Tier2, &["Epsilon", "Zeta", "Eta", "Theta"]))),
            ],
            false,
        );
        let outcome = discovery.discover(&DiscoveryRequest::new(job(), 15.0, 25)).await;

        assert_eq!(outcome.unique_count(), 8);
        assert_eq!(outcome.unique[0].candidate.company_name, "ABC Lawn");
        assert_eq!(outcome.unique[0].candidate.tier, Tier::Tier1);
        assert_eq!(outcome.duplicates.len(), 1);
        assert_eq!(outcome.duplicates[0].dropped_tier, Tier::Tier3);

        let order: Vec<Tier> = outcome.tiers.iter().map(|r| r.tier).collect();
        assert_eq!(order, Tier::ALL.to_vec());
        assert_eq!(outcome.expansions.len(), 1);
    }

    #[tokio::test]
    async fn test_early_exit_marks_remaining_not_queried() {
        let discovery = discovery(
            vec![
                source(Tier::Tier1, Ok(names(Tier::Tier1, &["A", "B", "C", "D"]))),
                unused_source(Tier::Tier2),
                unused_source(Tier::Tier3),
            ],
            false,
        );
        let outcome = discovery.discover(&DiscoveryRequest::new(job(), 15.0, 3)).await;

        assert_eq!(outcome.unique_count(), 4);
        assert!(matches!(outcome.tiers[1].status, TierStatus::NotQueried { .. }));
        assert!(matches!(outcome.tiers[2].status, TierStatus::NotQueried { .. }));
        assert!(outcome.expansions.is_empty());
    }

    #[tokio::test]
    async fn test_failed_tier_is_not_fatal() {
        let discovery = discovery(
            vec![
                source(Tier::Tier1, Err(SourceError::Transient("503".to_string()))),
                source(Tier::Tier2, Err(SourceError::Permanent("401".to_string()))),
                source(Tier::Tier3, Ok(names(Tier::Tier3, &["Only One"]))),
            ],
            false,
        );
        let outcome = discovery.discover(&DiscoveryRequest::new(job(), 15.0, 2)).await;

        assert!(matches!(outcome.tiers[0].status, TierStatus::Failed { .. }));
        assert_eq!(outcome.tiers[0].calls, 2);
        assert!(matches!(outcome.tiers[1].status, TierStatus::Unusable { .. }));
        assert_eq!(outcome.tiers[1].calls, 1);
        assert_eq!(outcome.unique_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_source_reported_not_configured() {
        let discovery = discovery(
            vec![source(Tier::Tier1, Ok(names(Tier::Tier1, &["Solo"])))],
            false,
        );
        let request = DiscoveryRequest::new(job(), 15.0, 10).only_tiers(vec![Tier::Tier1, Tier::Tier2]);
        let outcome = discovery.discover(&request).await;

        assert_eq!(outcome.tiers.len(), 2);
        assert_eq!(outcome.tiers[1].status, TierStatus::NotConfigured);
    }

    #[tokio::test]
    async fn test_parallel_merge_is_tier_ordered() {
        let discovery = discovery(
            vec![
                source(Tier::Tier3, Ok(names(Tier::Tier3, &["Shared Name", "Far"]))),
                source(Tier::Tier2, Ok(names(Tier::Tier2, &["Shared Name Inc"]))),
                source(Tier::Tier1, Ok(names(Tier::Tier1, &["Near"]))),
            ],
            true,
        );
        let outcome = discovery.discover(&DiscoveryRequest::new(job(), 15.0, 1)).await;

        let merged: Vec<(&str, Tier)> = outcome
            .unique
            .iter()
            .map(|k| (k.candidate.company_name.as_str(), k.candidate.tier))
            .collect();
        assert_eq!(
            merged,
            vec![("Near", Tier::Tier1), ("Shared Name Inc", Tier::Tier2), ("Far", Tier::Tier3)]
        );
        assert_eq!(outcome.tiers[2].unique_added, 1);
    }

    #[tokio::test]
    async fn test_excluded_keys_are_filtered() {
        let discovery = discovery(
            vec![source(Tier::Tier3, Ok(names(Tier::Tier3, &["Known Co", "Fresh"])))],
            false,
        );
        let request = DiscoveryRequest::new(job(), 30.0, 1)
            .only_tiers(vec![Tier::Tier3])
            .excluding(HashSet::from([ContractorKey::new("known")]));
        let outcome = discovery.discover(&request).await;

        assert_eq!(outcome.unique_count(), 1);
        assert_eq!(outcome.unique[0].key.as_str(), "fresh");
        assert_eq!(outcome.max_radius_miles(15.0), 30.0);
    }
}

//! Adaptive radius expansion
//!
//! Query at the starting radius; while the unique count is short of the
//! target, widen by the multiplier and query again. Stops on the target, on
//! the floor once at least one widening happened, on the stage budget or
//! the radius cap, or when the source reports a permanent failure. The
//! radius never decreases from one stage to the next.

use std::future::Future;

use shared::{
    component_debug, component_info, component_warn, Candidate, Component, ExpansionStage,
    ExpansionStop, ExpansionTrace, Tier,
};

use crate::config::ExpansionConfig;
use crate::core::CandidateMerger;
use crate::error::SourceError;
use crate::resilience::CallReport;

/// Parameters for one expansion
#[derive(Debug, Clone, PartialEq)]
pub struct ExpansionPlan {
    pub tier: Tier,
    pub start_radius_miles: f64,
    pub target: u32,
    pub multiplier: f64,
    pub max_stages: u32,
    pub max_radius_miles: f64,
    pub floor_ratio: f64,
}

impl ExpansionPlan {
    pub fn new(tier: Tier, start_radius_miles: f64, target: u32, config: &ExpansionConfig) -> Self {
        Self {
            tier,
            start_radius_miles,
            target,
            multiplier: config.multiplier,
            max_stages: config.max_stages,
            max_radius_miles: config.max_radius_miles,
            floor_ratio: config.floor_ratio,
        }
    }

    /// ceil(target × floor_ratio), at least 1 for a non-zero target
    pub fn floor(&self) -> u32 {
        if self.target == 0 {
            return 0;
        }
        let floor = (self.target as f64 * self.floor_ratio - 1e-9).ceil() as u32;
        floor.clamp(1, self.target)
    }
}

/// Expansion trace plus call accounting for the tier report
#[derive(Debug, Clone, PartialEq)]
pub struct ExpansionOutcome {
    pub trace: ExpansionTrace,
    /// Raw candidates returned across all stages
    pub found: u32,
    pub calls: u32,
    /// Most recent failure, if any stage failed
    pub last_error: Option<SourceError>,
    /// Every stage failed
    pub all_failed: bool,
}

/// Run the expansion, offering every stage's candidates to `merger`
///
/// `fetch` performs one source call at the given radius, with its own
/// timeout and retry.
pub async fn expand_radius<F, Fut>(
    plan: &ExpansionPlan,
    merger: &mut CandidateMerger,
    mut fetch: F,
) -> ExpansionOutcome
where
    F: FnMut(f64) -> Fut,
    Fut: Future<Output = CallReport<Vec<Candidate>>>,
{
    let floor = plan.floor();
    let mut stages: Vec<ExpansionStage> = Vec::new();
    let mut radius = plan.start_radius_miles.min(plan.max_radius_miles);
    let mut cumulative = 0u32;
    let mut found_total = 0u32;
    let mut calls = 0u32;
    let mut failures = 0u32;
    let mut last_error = None;

    let stop = if plan.target == 0 {
        ExpansionStop::TargetMet
    } else {
        loop {
            let stage = stages.len() as u32 + 1;
            let report = fetch(radius).await;
            calls += report.calls;

            let (found, new_unique, permanent) = match report.result {
                Ok(candidates) => {
                    let found = candidates.len() as u32;
                    (found, merger.extend(candidates), false)
                }
                Err(e) => {
                    component_warn!(
                        Component::Discovery,
                        tier = %plan.tier,
                        radius_miles = radius,
                        stage = stage,
                        "⚠️ Expansion stage failed: {}",
                        e
                    );
                    failures += 1;
                    let permanent = !e.is_transient();
                    last_error = Some(e);
                    (0, 0, permanent)
                }
            };

            cumulative += new_unique;
            found_total += found;
            stages.push(ExpansionStage {
                stage,
                radius_miles: radius,
                found,
                new_unique,
                cumulative,
            });
            component_debug!(
                Component::Discovery,
                tier = %plan.tier,
                radius_miles = radius,
                found = found,
                cumulative = cumulative,
                "🔭 Expansion stage {} complete",
                stage
            );

            if permanent {
                break ExpansionStop::SourceUnusable;
            }
            if cumulative >= plan.target {
                break ExpansionStop::TargetMet;
            }
            if stage > 1 && cumulative >= floor {
                break ExpansionStop::FloorMet;
            }
            if stage >= plan.max_stages {
                break ExpansionStop::StagesExhausted;
            }
            if radius >= plan.max_radius_miles {
                break ExpansionStop::MaxRadiusReached;
            }
            radius = (radius * plan.multiplier).min(plan.max_radius_miles);
        }
    };

    let achieved = stages
        .last()
        .map(|s| s.radius_miles)
        .unwrap_or(plan.start_radius_miles);
    component_info!(
        Component::Discovery,
        tier = %plan.tier,
        target = plan.target,
        floor = floor,
        cumulative = cumulative,
        achieved_radius_miles = achieved,
        "📡 Radius expansion stopped: {:?}",
        stop
    );

    let all_failed = !stages.is_empty() && failures == stages.len() as u32;
    ExpansionOutcome {
        trace: ExpansionTrace {
            tier: plan.tier,
            start_radius_miles: plan.start_radius_miles,
            achieved_radius_miles: achieved,
            target: plan.target,
            floor,
            stages,
            stop,
        },
        found: found_total,
        calls,
        last_error,
        all_failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::NameNormalizer;
    use std::collections::{HashMap, HashSet};

    fn merger() -> CandidateMerger {
        CandidateMerger::new(NameNormalizer::new().unwrap(), HashSet::new())
    }

    fn batch(prefix: &str, count: usize) -> Vec<Candidate> {
        (0..count)
            .map(|i| Candidate::new(format!("{prefix}-{i}"), Tier::Tier3, format!("{prefix} Contractor {i}")))
            .collect()
    }

    fn plan(target: u32) -> ExpansionPlan {
        ExpansionPlan::new(Tier::Tier3, 15.0, target, &ExpansionConfig::default())
    }

    /// Source that returns cumulative results per radius, like a real radius search
    fn by_radius(results: HashMap<u32, Vec<Candidate>>) -> impl FnMut(f64) -> std::future::Ready<CallReport<Vec<Candidate>>> {
        move |radius: f64| {
            let candidates = results.get(&(radius as u32)).cloned().unwrap_or_default();
            std::future::ready(CallReport {
                result: Ok(candidates),
                calls: 1,
            })
        }
    }

    #[tokio::test]
    async fn test_floor_met_after_widening() {
        // 15mi → 3, 30mi → the same 3 plus 6 more (9)
        let first = batch("near", 3);
        let mut second = first.clone();
        second.extend(batch("far", 6));
        let fetch = by_radius(HashMap::from([(15, first), (30, second)]));

        let mut merger = merger();
        let outcome = expand_radius(&plan(10), &mut merger, fetch).await;

        assert_eq!(outcome.trace.floor, 5);
        assert_eq!(outcome.trace.stop, ExpansionStop::FloorMet);
        assert_eq!(outcome.trace.stage_count(), 2);
        assert_eq!(outcome.trace.achieved_radius_miles, 30.0);
        assert_eq!(outcome.trace.cumulative(), 9);
        assert_eq!(merger.unique_count(), 9);
    }

    #[tokio::test]
    async fn test_target_met_on_first_stage() {
        let fetch = by_radius(HashMap::from([(15, batch("near", 12))]));
        let outcome = expand_radius(&plan(10), &mut merger(), fetch).await;
        assert_eq!(outcome.trace.stop, ExpansionStop::TargetMet);
        assert_eq!(outcome.trace.stage_count(), 1);
    }

    #[tokio::test]
    async fn test_floor_alone_does_not_stop_first_stage() {
        let fetch = by_radius(HashMap::from([(15, batch("near", 6)), (30, batch("near", 6))]));
        let outcome = expand_radius(&plan(10), &mut merger(), fetch).await;

        // stage 2 adds nothing new but the floor was already met
        assert_eq!(outcome.trace.stop, ExpansionStop::FloorMet);
        assert_eq!(outcome.trace.stage_count(), 2);
    }

    #[tokio::test]
    async fn test_stages_exhausted_with_monotonic_radius() {
        let fetch = by_radius(HashMap::new());
        let outcome = expand_radius(&plan(10), &mut merger(), fetch).await;

        assert_eq!(outcome.trace.stop, ExpansionStop::StagesExhausted);
        assert_eq!(outcome.trace.stage_count(), 3);
        let radii: Vec<f64> = outcome.trace.stages.iter().map(|s| s.radius_miles).collect();
        assert_eq!(radii, vec![15.0, 30.0, 60.0]);
        assert!(radii.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_radius_cap_stops_expansion() {
        let mut plan = plan(10);
        plan.max_radius_miles = 20.0;
        plan.max_stages = 5;
        let outcome = expand_radius(&plan, &mut merger(), by_radius(HashMap::new())).await;

        assert_eq!(outcome.trace.stop, ExpansionStop::MaxRadiusReached);
        assert_eq!(outcome.trace.achieved_radius_miles, 20.0);
        assert_eq!(outcome.trace.stage_count(), 2);
    }

    #[tokio::test]
    async fn test_permanent_failure_marks_unusable() {
        let fetch = |_radius: f64| {
            std::future::ready(CallReport::<Vec<Candidate>> {
                result: Err(SourceError::Permanent("bad api key".to_string())),
                calls: 1,
            })
        };
        let outcome = expand_radius(&plan(10), &mut merger(), fetch).await;

        assert_eq!(outcome.trace.stop, ExpansionStop::SourceUnusable);
        assert_eq!(outcome.calls, 1);
        assert!(outcome.all_failed);
    }

    #[tokio::test]
    async fn test_transient_stage_counts_as_empty() {
        let mut stage = 0;
        let fetch = move |_radius: f64| {
            stage += 1;
            let result = if stage == 1 {
                Err(SourceError::Transient("timeout".to_string()))
            } else {
                Ok(batch("late", 10))
            };
            std::future::ready(CallReport { result, calls: 2 })
        };
        let outcome = expand_radius(&plan(10), &mut merger(), fetch).await;

        assert_eq!(outcome.trace.stop, ExpansionStop::TargetMet);
        assert_eq!(outcome.trace.stages[0].found, 0);
        assert_eq!(outcome.calls, 4);
        assert!(!outcome.all_failed);
    }

    #[tokio::test]
    async fn test_zero_target_skips_queries() {
        let fetch = |_radius: f64| -> std::future::Ready<CallReport<Vec<Candidate>>> {
            panic!("no query expected")
        };
        let outcome = expand_radius(&plan(0), &mut merger(), fetch).await;
        assert_eq!(outcome.trace.stop, ExpansionStop::TargetMet);
        assert_eq!(outcome.calls, 0);
    }

    #[test]
    fn test_floor_rounding() {
        assert_eq!(plan(10).floor(), 5);
        assert_eq!(plan(7).floor(), 4);
        assert_eq!(plan(1).floor(), 1);
        assert_eq!(plan(0).floor(), 0);
    }
}

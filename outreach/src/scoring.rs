//! Candidate scoring with the oracle and the heuristic fallback
//!
//! Every unique candidate is scored: by the oracle when it answers in time
//! with an in-range score, otherwise by the deterministic heuristic. The
//! fallback reason is kept on the assessment.

use futures_util::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use std::time::Duration;

use shared::{component_debug, component_info, Assessment, Component, Job, ScoredCandidate};

use crate::core::scoring::{accept_oracle, heuristic_assessment, rank};
use crate::core::{HeuristicWeights, KeyedCandidate};
use crate::resilience::call_with_retry;
use crate::traits::ScoringOracle;

pub struct CandidateScorer {
    oracle: Option<Arc<dyn ScoringOracle>>,
    weights: HeuristicWeights,
    concurrency: usize,
    timeout: Duration,
}

impl CandidateScorer {
    pub fn new(
        oracle: Option<Arc<dyn ScoringOracle>>,
        weights: HeuristicWeights,
        concurrency: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            oracle,
            weights,
            concurrency: concurrency.max(1),
            timeout,
        }
    }

    async fn assess(&self, keyed: &KeyedCandidate, job: &Job) -> Assessment {
        let Some(oracle) = &self.oracle else {
            return heuristic_assessment(&keyed.candidate, &self.weights, "no oracle configured");
        };

        let report = call_with_retry(self.timeout, || oracle.score(&keyed.candidate, job)).await;
        let reason = match report.result {
            Ok(assessment) => match accept_oracle(assessment) {
                Ok(accepted) => return accepted,
                Err(reason) => reason,
            },
            Err(e) => e.to_string(),
        };

        component_debug!(
            Component::Scoring,
            candidate = %keyed.key,
            "🧮 Falling back to heuristic: {}",
            reason
        );
        heuristic_assessment(&keyed.candidate, &self.weights, &reason)
    }

    async fn assess_keyed(&self, keyed: KeyedCandidate, job: &Job) -> (KeyedCandidate, Assessment) {
        let assessment = self.assess(&keyed, job).await;
        (keyed, assessment)
    }

    /// Score with bounded concurrency and return candidates in rank order
    pub async fn score_all(&self, job: &Job, unique: Vec<KeyedCandidate>) -> Vec<ScoredCandidate> {
        let total = unique.len();
        let assessed: BoxStream<'_, (KeyedCandidate, Assessment)> = stream::iter(unique)
            .map(|keyed| self.assess_keyed(keyed, job))
            .buffered(self.concurrency)
            .boxed();
        let scored: Vec<(KeyedCandidate, Assessment)> = assessed.collect().await;

        let heuristic = scored.iter().filter(|(_, a)| a.is_heuristic()).count();
        component_info!(
            Component::Scoring,
            job_id = %job.id,
            scored = total,
            heuristic = heuristic,
            "📊 Scored candidates"
        );
        rank(scored)
    }
}

//! Engagement recording and read-side analytics over the store

use std::sync::Arc;

use shared::{
    component_debug, component_info, AnalyticsFilter, AnalyticsReport, AttemptId, Component,
    EngagementEvent, OutreachAttempt,
};

use crate::core::engagement::build_report;
use crate::core::{AppliedEngagement, EngagementWeights};
use crate::error::{OutreachError, OutreachResult};
use crate::traits::PersistenceStore;

/// What happened to one recorded event
#[derive(Debug, Clone)]
pub enum Recorded {
    Applied(AppliedEngagement),
    /// Event id seen before; the attempt as it stands now
    Duplicate(OutreachAttempt),
}

pub struct EngagementTracker {
    store: Arc<dyn PersistenceStore>,
    weights: EngagementWeights,
}

impl EngagementTracker {
    pub fn new(store: Arc<dyn PersistenceStore>, weights: EngagementWeights) -> Self {
        Self { store, weights }
    }

    /// Attempt an event would be recorded against
    pub async fn attempt(&self, attempt_id: AttemptId) -> OutreachResult<OutreachAttempt> {
        self.store
            .get_attempt(attempt_id)
            .await?
            .ok_or(OutreachError::AttemptNotFound { attempt_id })
    }

    /// Apply an event idempotently by event id
    pub async fn record(&self, attempt_id: AttemptId, event: EngagementEvent) -> OutreachResult<Recorded> {
        let event_id = event.event_id.clone();
        let event_type = event.event_type;

        match self
            .store
            .apply_engagement(attempt_id, event, self.weights.clone())
            .await?
        {
            Some(applied) => {
                component_debug!(
                    Component::Engagement,
                    attempt_id = %attempt_id,
                    event_id = %event_id,
                    event_type = %event_type,
                    delta = applied.score_delta,
                    score = applied.attempt.engagement_score,
                    "📈 Engagement recorded"
                );
                Ok(Recorded::Applied(applied))
            }
            None => {
                component_info!(
                    Component::Engagement,
                    attempt_id = %attempt_id,
                    event_id = %event_id,
                    "🔁 Duplicate engagement event ignored"
                );
                Ok(Recorded::Duplicate(self.attempt(attempt_id).await?))
            }
        }
    }

    pub async fn analytics(&self, filter: &AnalyticsFilter) -> OutreachResult<AnalyticsReport> {
        let attempts = self.store.list_attempts(filter.campaign_id).await?;
        let records = self.store.list_engagement(filter.campaign_id).await?;
        Ok(build_report(&attempts, &records, filter))
    }
}

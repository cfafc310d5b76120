//! Trait definitions with mockall annotations for testing
//!
//! Every external collaborator of the engine sits behind one of these ports:
//! candidate sources, the scoring oracle, channel senders, the notification
//! sink, the persistence store and the escalation policy. The engine only
//! ever holds `Arc<dyn Trait>` values, so tests substitute the generated
//! `Mock*` types and the CLI substitutes the simulated services.

use async_trait::async_trait;

use shared::{
    AttemptId, AttemptStatus, Campaign, CampaignId, Candidate, Channel, CheckIn, CheckInId,
    DiscoveryRun, EngagementEvent, EngagementRecord, Job, NewAttempt, NotificationEvent,
    OracleAssessment, OutreachAttempt, OutreachMessage, SendReceipt, Tier,
};

use crate::core::{AppliedEngagement, EngagementWeights};
use crate::error::{OutreachResult, SourceError};
use crate::monitor::escalation::{EscalationAction, EscalationContext};

/// Result of inserting an outreach attempt
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Created(OutreachAttempt),
    /// An open attempt already exists for (campaign, contractor, channel)
    Duplicate(OutreachAttempt),
}

/// One tier's contractor source
#[mockall::automock]
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Tier this source serves
    fn tier(&self) -> Tier;

    /// Find candidates for a job within `radius_miles`
    async fn find(&self, job: &Job, radius_miles: f64) -> Result<Vec<Candidate>, SourceError>;
}

/// External judge of candidate fit
#[mockall::automock]
#[async_trait]
pub trait ScoringOracle: Send + Sync {
    /// Score a candidate for a job; the score should be within [0, 100]
    async fn score(&self, candidate: &Candidate, job: &Job) -> Result<OracleAssessment, SourceError>;
}

/// Delivers outreach on one channel
#[mockall::automock]
#[async_trait]
pub trait ChannelSender: Send + Sync {
    fn channel(&self) -> Channel;

    async fn send(
        &self,
        candidate: &Candidate,
        message: &OutreachMessage,
    ) -> Result<SendReceipt, SourceError>;
}

/// Fire-and-forget notifications (hot leads, campaign outcomes)
#[mockall::automock]
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, event: NotificationEvent) -> Result<(), SourceError>;
}

/// Keyed storage for campaigns, discovery runs, attempts, check-ins and engagement
///
/// Implementations must apply each method atomically: attempt inserts check
/// the open-attempt invariant, check-in claims and engagement updates are
/// applied under the same lock as the read that guards them.
#[mockall::automock]
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    async fn insert_campaign(&self, campaign: Campaign) -> OutreachResult<()>;

    /// Replace an existing campaign
    async fn update_campaign(&self, campaign: Campaign) -> OutreachResult<()>;

    async fn get_campaign(&self, campaign_id: CampaignId) -> OutreachResult<Option<Campaign>>;

    async fn list_campaigns(&self) -> OutreachResult<Vec<Campaign>>;

    async fn append_discovery_run(&self, run: DiscoveryRun) -> OutreachResult<()>;

    async fn list_discovery_runs(&self, campaign_id: CampaignId) -> OutreachResult<Vec<DiscoveryRun>>;

    /// Create an attempt unless an open one exists for the same contractor and channel
    async fn insert_attempt(&self, attempt: NewAttempt) -> OutreachResult<InsertOutcome>;

    /// Set status (and error); stamps `sent_at` on the first successful send
    async fn update_attempt_status(
        &self,
        attempt_id: AttemptId,
        status: AttemptStatus,
        error: Option<String>,
    ) -> OutreachResult<OutreachAttempt>;

    async fn get_attempt(&self, attempt_id: AttemptId) -> OutreachResult<Option<OutreachAttempt>>;

    /// All attempts, or those of one campaign
    async fn list_attempts(&self, campaign_id: Option<CampaignId>) -> OutreachResult<Vec<OutreachAttempt>>;

    async fn insert_checkins(&self, checkins: Vec<CheckIn>) -> OutreachResult<()>;

    /// Check-ins of a campaign ordered by sequence
    async fn list_checkins(&self, campaign_id: CampaignId) -> OutreachResult<Vec<CheckIn>>;

    /// Mark a check-in fired; `None` if it already fired
    async fn claim_checkin(&self, checkin_id: CheckInId) -> OutreachResult<Option<CheckIn>>;

    async fn record_checkin_result(
        &self,
        checkin_id: CheckInId,
        actual_response_count: u32,
        escalated: bool,
    ) -> OutreachResult<()>;

    /// Apply an engagement event; `None` if the event id was already applied
    async fn apply_engagement(
        &self,
        attempt_id: AttemptId,
        event: EngagementEvent,
        weights: EngagementWeights,
    ) -> OutreachResult<Option<AppliedEngagement>>;

    async fn list_engagement(&self, campaign_id: Option<CampaignId>) -> OutreachResult<Vec<EngagementRecord>>;
}

/// Chooses the corrective action for a check-in shortfall
#[mockall::automock]
pub trait EscalationPolicy: Send + Sync {
    fn choose(&self, context: &EscalationContext) -> EscalationAction;
}

//! Campaign engine: the public entry point
//!
//! [`CampaignEngine`] is a thin handle over an [`EngineContext`], which owns
//! every injected collaborator plus the configuration. Each operation is a
//! method over that context and returns plain values; the only long-lived
//! state is in the store and in the per-campaign timers.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use shared::{
    component_debug, component_error, component_info, component_warn, logging, AnalyticsFilter,
    AnalyticsReport, AttemptCounts, AttemptId, Campaign, CampaignId, CampaignState, CampaignStatus,
    Channel, CheckIn, CheckInId, Component, ContractorKey,
    DiscoveryRun, DiscoveryRunId, DiscoveryTrigger, EngagementEvent, EngagementOutcome,
    InterestLevel, Job, JobRequest, NotificationEvent, ScoredCandidate, Tier, Urgency,
};

use crate::config::OutreachConfig;
use crate::core::engagement::responses_as_of;
use crate::core::lifecycle;
use crate::core::scoring::{eligible_supply, select};
use crate::core::sizing::{confidence, discovery_target, expected_responses};
use crate::core::{plan_outreach, CampaignEvent, NameNormalizer};
use crate::discovery::{Discovery, DiscoveryRequest};
use crate::dispatch::{DispatchSummary, Dispatcher};
use crate::engagement::{EngagementTracker, Recorded};
use crate::error::{OutreachError, OutreachResult};
use crate::monitor::{
    CampaignMonitor, CheckInOutcome, CheckInReport, EscalationAction, EscalationContext, LadderPolicy,
};
use crate::resilience::with_timeout;
use crate::scoring::CandidateScorer;
use crate::traits::{
    CandidateSource, ChannelSender, EscalationPolicy, NotificationSink, PersistenceStore, ScoringOracle,
};

/// Everything the engine talks to
pub struct Collaborators {
    pub sources: Vec<Arc<dyn CandidateSource>>,
    /// Without an oracle every candidate gets the heuristic score
    pub oracle: Option<Arc<dyn ScoringOracle>>,
    pub senders: Vec<Arc<dyn ChannelSender>>,
    pub notifier: Arc<dyn NotificationSink>,
    pub store: Arc<dyn PersistenceStore>,
    /// Defaults to [`LadderPolicy`] built from the monitor config
    pub policy: Option<Arc<dyn EscalationPolicy>>,
}

/// Configuration plus injected collaborators
pub struct EngineContext {
    config: OutreachConfig,
    store: Arc<dyn PersistenceStore>,
    discovery: Discovery,
    scorer: CandidateScorer,
    dispatcher: Dispatcher,
    tracker: EngagementTracker,
    notifier: Arc<dyn NotificationSink>,
    policy: Arc<dyn EscalationPolicy>,
    monitor: CampaignMonitor,
}

/// Result of one discover → score → size → dispatch pass
struct Wave {
    run: DiscoveryRun,
    dispatch: DispatchSummary,
}

impl EngineContext {
    pub fn new(config: OutreachConfig, collaborators: Collaborators) -> OutreachResult<Self> {
        config.validate()?;
        let timeouts = config.timeouts.clone();

        let discovery = Discovery::new(
            collaborators.sources,
            NameNormalizer::new()?,
            config.discovery.clone(),
            config.expansion.clone(),
            timeouts.source(),
        );
        let scorer = CandidateScorer::new(
            collaborators.oracle,
            config.scoring.heuristic.clone(),
            config.scoring.concurrency,
            timeouts.oracle(),
        );
        let dispatcher = Dispatcher::new(
            collaborators.senders,
            Arc::clone(&collaborators.store),
            timeouts.sender(),
            config.dispatch.concurrency,
        );
        let tracker = EngagementTracker::new(Arc::clone(&collaborators.store), config.engagement.clone());
        let policy = collaborators.policy.unwrap_or_else(|| {
            Arc::new(LadderPolicy {
                radius_multiplier: config.monitor.radius_multiplier,
                score_relaxation: config.monitor.score_relaxation,
            })
        });

        Ok(Self {
            monitor: CampaignMonitor::new(config.monitor.clone()),
            store: collaborators.store,
            notifier: collaborators.notifier,
            discovery,
            scorer,
            dispatcher,
            tracker,
            policy,
            config,
        })
    }

    pub fn config(&self) -> &OutreachConfig {
        &self.config
    }

    async fn load_campaign(&self, campaign_id: CampaignId) -> OutreachResult<Campaign> {
        self.store
            .get_campaign(campaign_id)
            .await?
            .ok_or(OutreachError::CampaignNotFound { campaign_id })
    }

    /// Fire-and-forget: failures are logged, never returned
    fn notify_detached(&self, event: NotificationEvent) {
        let notifier = Arc::clone(&self.notifier);
        let timeout = self.config.timeouts.notifier();
        tokio::spawn(async move {
            let kind = event.kind();
            let campaign_id = event.campaign_id();
            if let Err(e) = with_timeout(timeout, notifier.notify(event)).await {
                component_warn!(
                    Component::Notifier,
                    campaign_id = %campaign_id,
                    kind = kind,
                    "🔕 Notification not delivered: {}",
                    e
                );
            }
        });
    }

    /// Contractors with at least one successful send, and their tier counts
    async fn contacted(&self, campaign_id: CampaignId) -> OutreachResult<(HashSet<ContractorKey>, BTreeMap<Tier, u32>)> {
        let attempts = self.store.list_attempts(Some(campaign_id)).await?;
        let mut keys = HashSet::new();
        let mut by_tier = BTreeMap::new();
        for attempt in attempts.iter().filter(|a| a.status.is_success()) {
            if keys.insert(attempt.contractor_key.clone()) {
                *by_tier.entry(attempt.tier).or_insert(0) += 1;
            }
        }
        Ok((keys, by_tier))
    }

    /// Contractors with any attempt, successful or not
    async fn attempted(&self, campaign_id: CampaignId) -> OutreachResult<HashSet<ContractorKey>> {
        let attempts = self.store.list_attempts(Some(campaign_id)).await?;
        Ok(attempts.into_iter().map(|a| a.contractor_key).collect())
    }

    /// Recompute contact counts, expected responses and confidence from the store
    async fn refresh_projection(&self, campaign: &mut Campaign) -> OutreachResult<()> {
        let (_, by_tier) = self.contacted(campaign.id).await?;
        campaign.expected_responses = expected_responses(&by_tier, &self.config.sizing);
        campaign.confidence = confidence(campaign.expected_responses, campaign.target_bids);
        campaign.contacted_by_tier = by_tier;
        campaign.updated_at = Utc::now();
        Ok(())
    }

    /// Select from `ranked` for `bids_wanted` and dispatch on `channels`
    async fn size_and_dispatch(
        &self,
        campaign: &Campaign,
        ranked: &[ScoredCandidate],
        bids_wanted: u32,
        channels: &[Channel],
    ) -> OutreachResult<(Vec<ScoredCandidate>, DispatchSummary)> {
        let supply = eligible_supply(ranked, campaign.min_score);
        let plan = plan_outreach(bids_wanted, &supply, &self.config.sizing);
        let selected = select(ranked, &plan.allocation, campaign.min_score, &HashSet::new());

        component_info!(
            Component::Sizing,
            campaign_id = %campaign.id,
            bids_wanted = bids_wanted,
            desired = plan.desired_contacts,
            planned = plan.planned_contacts(),
            expected = plan.expected_responses,
            confidence = plan.confidence,
            best_effort = plan.best_effort,
            "📐 Outreach sized"
        );
        if plan.best_effort {
            component_warn!(
                Component::Sizing,
                campaign_id = %campaign.id,
                "⚠️ Supply short of plan; contacting every eligible candidate"
            );
        }

        let summary = self.dispatcher.dispatch(campaign, &selected, channels).await?;
        Ok((selected, summary))
    }

    /// Discover, score, size and dispatch, recording a discovery run
    async fn run_wave(
        &self,
        campaign: &mut Campaign,
        request: DiscoveryRequest,
        trigger: DiscoveryTrigger,
        bids_wanted: u32,
    ) -> OutreachResult<Wave> {
        let started_at = Utc::now();
        let outcome = self.discovery.discover(&request).await;
        let unique_count = outcome.unique_count();
        let achieved_radius = outcome.max_radius_miles(request.radius_miles);

        let ranked = self.scorer.score_all(&campaign.job, outcome.unique).await;
        let channels = campaign.enabled_channels.clone();
        let (selected, dispatch) = self
            .size_and_dispatch(campaign, &ranked, bids_wanted, &channels)
            .await?;

        campaign.radius_miles = campaign.radius_miles.max(achieved_radius);
        self.refresh_projection(campaign).await?;

        let run = DiscoveryRun {
            id: DiscoveryRunId::new(),
            campaign_id: campaign.id,
            job_id: campaign.job.id,
            trigger,
            contacts_needed: request.contacts_needed,
            radius_miles: achieved_radius,
            tiers: outcome.tiers,
            expansions: outcome.expansions,
            duplicates: outcome.duplicates,
            dropped: outcome.dropped,
            unique_count,
            ranked,
            selected: selected.into_iter().map(|c| c.key).collect(),
            started_at,
            finished_at: Utc::now(),
        };
        self.store.append_discovery_run(run.clone()).await?;
        Ok(Wave { run, dispatch })
    }

    pub async fn start_campaign(
        self: &Arc<Self>,
        request: JobRequest,
        bids_needed: u32,
        urgency: Urgency,
    ) -> OutreachResult<CampaignId> {
        if bids_needed == 0 {
            return Err(OutreachError::InvalidRequest {
                message: "bids_needed must be at least 1".to_string(),
            });
        }
        if request.category.trim().is_empty() {
            return Err(OutreachError::InvalidRequest {
                message: "job category is empty".to_string(),
            });
        }

        let timeline = chrono::Duration::from_std(self.monitor.config().timeline_for(urgency)).map_err(|e| {
            OutreachError::ConfigurationError {
                field: format!("monitor.timeline: {e}"),
            }
        })?;
        let job = Job::from_request(request, bids_needed, urgency);
        let mut campaign = Campaign::forming(
            job,
            self.config.dispatch.channels_for(urgency),
            self.config.discovery.default_radius_miles,
            self.config.scoring.min_score,
            timeline,
        );
        let campaign_id = campaign.id;
        self.store.insert_campaign(campaign.clone()).await?;

        component_info!(
            Component::Engine,
            campaign_id = %campaign_id,
            category = %campaign.job.category,
            location = %campaign.job.location.label,
            bids_needed = bids_needed,
            urgency = %urgency,
            "🚀 Campaign forming"
        );

        let _guard = self.monitor.lock(campaign_id).await;
        let request = DiscoveryRequest::new(
            campaign.job.clone(),
            campaign.radius_miles,
            discovery_target(bids_needed, &self.config.sizing),
        );
        let wave = self
            .run_wave(&mut campaign, request, DiscoveryTrigger::Kickoff, bids_needed)
            .await?;

        // Activates even when nothing could be sent; check-ins and the deadline take over
        lifecycle::apply(&mut campaign, CampaignEvent::FirstDispatch)?;
        self.store.update_campaign(campaign.clone()).await?;

        let checkins = self.monitor.plan_checkins(&campaign);
        self.store.insert_checkins(checkins.clone()).await?;
        if self.monitor.config().schedule_timers {
            self.schedule_timers(&campaign, &checkins).await;
        }

        component_info!(
            Component::Engine,
            campaign_id = %campaign_id,
            unique = wave.run.unique_count,
            contacted = campaign.total_contacted(),
            sent = wave.dispatch.sent,
            expected = campaign.expected_responses,
            confidence = campaign.confidence,
            "✅ Campaign active"
        );
        Ok(campaign_id)
    }

    /// One timer per check-in plus one at the deadline
    ///
    /// Every timer fires whatever is due by then in sequence order, so a late
    /// timer never runs a check-in ahead of an earlier one.
    async fn schedule_timers(self: &Arc<Self>, campaign: &Campaign, checkins: &[CheckIn]) {
        let timers = self.monitor.timers();
        let campaign_id = campaign.id;
        let fire_times = checkins
            .iter()
            .map(|c| c.scheduled_at)
            .chain(std::iter::once(campaign.deadline_at));

        for fire_at in fire_times {
            let ctx = Arc::clone(self);
            timers
                .schedule(campaign_id, CampaignMonitor::delay_until(fire_at), async move {
                    let as_of = Utc::now().max(fire_at);
                    if let Err(e) = ctx.fire_due_checkins(campaign_id, as_of).await {
                        component_error!(
                            Component::Monitor,
                            campaign_id = %campaign_id,
                            "❌ Timed check failed: {}",
                            e
                        );
                    }
                })
                .await;
        }
    }

    /// Stop timers and announce a terminal state
    async fn close(&self, campaign: &Campaign) {
        self.monitor.timers().cancel(campaign.id).await;
        self.monitor.release(campaign.id).await;
        let event = match (&campaign.state, &campaign.expiry_reason) {
            (CampaignState::Completed, _) => NotificationEvent::CampaignCompleted {
                campaign_id: campaign.id,
                bids_received: campaign.bids_received(),
            },
            (CampaignState::Expired, Some(reason)) => NotificationEvent::CampaignExpired {
                campaign_id: campaign.id,
                reason: reason.clone(),
            },
            _ => return,
        };
        component_info!(
            Component::Monitor,
            campaign_id = %campaign.id,
            state = %campaign.state,
            bids = campaign.bids_received(),
            "🏁 Campaign closed"
        );
        self.notify_detached(event);
    }

    /// Fire one check-in as of `as_of`; `None` if it already fired or the campaign is not active
    ///
    /// Callers go through [`Self::fire_due_checkins`], which keeps sequence order.
    async fn evaluate_checkin(
        &self,
        campaign_id: CampaignId,
        checkin_id: CheckInId,
        as_of: DateTime<Utc>,
    ) -> OutreachResult<Option<CheckInReport>> {
        let _guard = self.monitor.lock(campaign_id).await;
        let mut campaign = self.load_campaign(campaign_id).await?;
        if campaign.state != CampaignState::Active {
            component_debug!(
                Component::Monitor,
                campaign_id = %campaign_id,
                state = %campaign.state,
                "⏭️ Check-in skipped"
            );
            if campaign.is_terminal() {
                self.monitor.release(campaign_id).await;
            }
            return Ok(None);
        }
        let Some(checkin) = self.store.claim_checkin(checkin_id).await? else {
            return Ok(None);
        };

        let attempts = self.store.list_attempts(Some(campaign_id)).await?;
        let actual = responses_as_of(&attempts, as_of);
        let expected = checkin.expected_response_count;

        let outcome = if !self.monitor.is_shortfall(expected, actual) {
            self.store.record_checkin_result(checkin_id, actual, false).await?;
            CheckInOutcome::OnTrack
        } else if self.monitor.escalation_budget_spent(&campaign) {
            let escalations = campaign.escalation_count;
            component_warn!(
                Component::Monitor,
                campaign_id = %campaign_id,
                "🛑 {}",
                OutreachError::EscalationLoopGuard { campaign_id, escalations }
            );
            lifecycle::apply(&mut campaign, CampaignEvent::EscalationLimitReached { escalations })?;
            self.store.update_campaign(campaign.clone()).await?;
            self.store.record_checkin_result(checkin_id, actual, false).await?;
            self.close(&campaign).await;
            CheckInOutcome::Expired { escalations }
        } else {
            let action = self.escalate(&mut campaign, &checkin, expected, actual).await?;
            self.store.record_checkin_result(checkin_id, actual, true).await?;
            CheckInOutcome::Escalated { action }
        };

        component_info!(
            Component::Monitor,
            campaign_id = %campaign_id,
            sequence = checkin.sequence,
            expected = expected,
            actual = actual,
            state = %campaign.state,
            "⏱️ Check-in fired"
        );
        Ok(Some(CheckInReport {
            checkin_id,
            campaign_id,
            sequence: checkin.sequence,
            expected_response_count: expected,
            actual_response_count: actual,
            outcome,
        }))
    }

    /// Active → Escalated, run the chosen action once, → Active
    async fn escalate(
        &self,
        campaign: &mut Campaign,
        checkin: &CheckIn,
        expected: u32,
        actual: u32,
    ) -> OutreachResult<EscalationAction> {
        let unused_channels = Channel::ALL
            .into_iter()
            .filter(|c| !campaign.enabled_channels.contains(c) && self.dispatcher.has_sender(*c))
            .collect();
        let context = EscalationContext {
            campaign_id: campaign.id,
            checkin_sequence: checkin.sequence,
            prior_escalations: campaign.escalation_count,
            expected_responses: expected,
            actual_responses: actual,
            radius_miles: campaign.radius_miles,
            max_radius_miles: self.config.expansion.max_radius_miles,
            shortfall_tier: self.config.discovery.expand_tiers.last().copied().unwrap_or(Tier::Tier3),
            enabled_channels: campaign.enabled_channels.clone(),
            unused_channels,
            min_score: campaign.min_score,
        };
        let action = self.policy.choose(&context);

        lifecycle::apply(campaign, CampaignEvent::CheckInShortfall)?;
        self.store.update_campaign(campaign.clone()).await?;
        component_warn!(
            Component::Monitor,
            campaign_id = %campaign.id,
            sequence = checkin.sequence,
            expected = expected,
            actual = actual,
            escalation = campaign.escalation_count,
            "📣 Escalating: {}",
            action
        );

        if let Err(e) = self.execute_escalation(campaign, &action, checkin.sequence).await {
            component_error!(
                Component::Monitor,
                campaign_id = %campaign.id,
                "❌ Escalation action failed: {}",
                e
            );
        }

        lifecycle::apply(campaign, CampaignEvent::EscalationResolved)?;
        self.store.update_campaign(campaign.clone()).await?;
        self.notify_detached(NotificationEvent::CampaignEscalated {
            campaign_id: campaign.id,
            sequence: checkin.sequence,
            action: action.to_string(),
        });
        Ok(action)
    }

    async fn execute_escalation(
        &self,
        campaign: &mut Campaign,
        action: &EscalationAction,
        sequence: u32,
    ) -> OutreachResult<()> {
        let bids_wanted = campaign.target_bids.saturating_sub(campaign.bids_received()).max(1);

        match action {
            EscalationAction::WidenRadius { multiplier, tier } => {
                let radius = (campaign.radius_miles * multiplier).min(self.config.expansion.max_radius_miles);
                campaign.radius_miles = radius;
                let request = DiscoveryRequest::new(
                    campaign.job.clone(),
                    radius,
                    discovery_target(bids_wanted, &self.config.sizing),
                )
                .only_tiers(vec![*tier])
                .excluding(self.attempted(campaign.id).await?);
                self.run_wave(campaign, request, DiscoveryTrigger::Escalation { sequence }, bids_wanted)
                    .await?;
            }
            EscalationAction::AddChannel { channel } => {
                if !campaign.enabled_channels.contains(channel) {
                    campaign.enabled_channels.push(*channel);
                }
                let (contacted, _) = self.contacted(campaign.id).await?;
                let reached: Vec<ScoredCandidate> = self
                    .ranked_pool(campaign.id)
                    .await?
                    .into_iter()
                    .filter(|c| contacted.contains(&c.key))
                    .collect();
                self.dispatcher.dispatch(campaign, &reached, &[*channel]).await?;
                self.refresh_projection(campaign).await?;
            }
            EscalationAction::RelaxScoreBar { by } => {
                campaign.min_score = (campaign.min_score - by).max(0.0);
                let attempted = self.attempted(campaign.id).await?;
                let fresh: Vec<ScoredCandidate> = self
                    .ranked_pool(campaign.id)
                    .await?
                    .into_iter()
                    .filter(|c| !attempted.contains(&c.key))
                    .collect();
                let channels = campaign.enabled_channels.clone();
                self.size_and_dispatch(campaign, &fresh, bids_wanted, &channels).await?;
                self.refresh_projection(campaign).await?;
            }
        }
        Ok(())
    }

    /// Every ranked candidate from the campaign's discovery runs, first run wins, by score
    async fn ranked_pool(&self, campaign_id: CampaignId) -> OutreachResult<Vec<ScoredCandidate>> {
        let mut seen = HashSet::new();
        let mut pool: Vec<ScoredCandidate> = self
            .store
            .list_discovery_runs(campaign_id)
            .await?
            .into_iter()
            .flat_map(|run| run.ranked)
            .filter(|c| seen.insert(c.key.clone()))
            .collect();
        pool.sort_by(|a, b| b.score().total_cmp(&a.score()).then(a.tier().cmp(&b.tier())));
        Ok(pool)
    }

    /// Expire an active campaign whose deadline is at or before `as_of`
    async fn expire_if_due(&self, campaign_id: CampaignId, as_of: DateTime<Utc>) -> OutreachResult<CampaignState> {
        let _guard = self.monitor.lock(campaign_id).await;
        let mut campaign = self.load_campaign(campaign_id).await?;
        if campaign.state == CampaignState::Active && campaign.deadline_at <= as_of {
            lifecycle::apply(&mut campaign, CampaignEvent::DeadlinePassed)?;
            self.store.update_campaign(campaign.clone()).await?;
            self.close(&campaign).await;
        } else if campaign.is_terminal() {
            self.monitor.release(campaign_id).await;
        }
        Ok(campaign.state)
    }

    pub async fn fire_due_checkins(
        &self,
        campaign_id: CampaignId,
        as_of: DateTime<Utc>,
    ) -> OutreachResult<Vec<CheckInReport>> {
        self.load_campaign(campaign_id).await?;
        let due: Vec<CheckInId> = self
            .store
            .list_checkins(campaign_id)
            .await?
            .into_iter()
            .filter(|c| c.is_due(as_of))
            .map(|c| c.id)
            .collect();

        let mut reports = Vec::new();
        for checkin_id in due {
            if let Some(report) = self.evaluate_checkin(campaign_id, checkin_id, as_of).await? {
                reports.push(report);
            }
        }
        self.expire_if_due(campaign_id, as_of).await?;
        Ok(reports)
    }

    pub async fn record_response_event(
        &self,
        attempt_id: AttemptId,
        event: EngagementEvent,
    ) -> OutreachResult<EngagementOutcome> {
        let campaign_id = self.tracker.attempt(attempt_id).await?.campaign_id;
        let _guard = self.monitor.lock(campaign_id).await;
        let mut campaign = self.load_campaign(campaign_id).await?;
        let event_id = event.event_id.clone();

        let applied = match self.tracker.record(attempt_id, event).await? {
            Recorded::Duplicate(attempt) => {
                if campaign.is_terminal() {
                    self.monitor.release(campaign_id).await;
                }
                return Ok(EngagementOutcome {
                    event_id,
                    attempt_id,
                    campaign_id,
                    duplicate: true,
                    score_delta: 0,
                    engagement_score: attempt.engagement_score,
                    interest_level: attempt.interest_level,
                    hot_lead: false,
                    bid_recorded: false,
                    campaign_state: campaign.state,
                })
            }
            Recorded::Applied(applied) => applied,
        };

        let hot_lead = applied.reached_high();
        if hot_lead {
            let attempt = &applied.attempt;
            component_info!(
                Component::Engagement,
                campaign_id = %campaign_id,
                attempt_id = %attempt_id,
                company = %attempt.company_name,
                "🔥 Hot lead"
            );
            self.notify_detached(NotificationEvent::HotLead {
                campaign_id,
                attempt_id,
                company_name: attempt.company_name.clone(),
                channel: attempt.channel,
                tier: attempt.tier,
                response_type: attempt.response_type,
            });
        }

        // Terminal campaigns keep their final tally
        let mut bid_recorded = false;
        if applied.new_bid && !campaign.is_terminal() {
            bid_recorded = campaign.bidders.insert(applied.attempt.contractor_key.clone());
            if bid_recorded {
                campaign.updated_at = Utc::now();
                if campaign.state == CampaignState::Active && campaign.bid_target_met() {
                    lifecycle::apply(&mut campaign, CampaignEvent::BidTargetMet)?;
                }
                self.store.update_campaign(campaign.clone()).await?;
                component_info!(
                    Component::Engagement,
                    campaign_id = %campaign_id,
                    bids = campaign.bids_received(),
                    target = campaign.target_bids,
                    "💰 Bid received"
                );
                if campaign.state == CampaignState::Completed {
                    self.close(&campaign).await;
                }
            }
        } else if campaign.is_terminal() {
            self.monitor.release(campaign_id).await;
        }

        Ok(EngagementOutcome {
            event_id,
            attempt_id,
            campaign_id,
            duplicate: false,
            score_delta: applied.score_delta,
            engagement_score: applied.attempt.engagement_score,
            interest_level: applied.attempt.interest_level,
            hot_lead,
            bid_recorded,
            campaign_state: campaign.state,
        })
    }

    pub async fn get_campaign_status(&self, campaign_id: CampaignId) -> OutreachResult<CampaignStatus> {
        let campaign = self.load_campaign(campaign_id).await?;
        let attempts = self.store.list_attempts(Some(campaign_id)).await?;
        let runs = self.store.list_discovery_runs(campaign_id).await?;
        let next_checkin_at = self
            .store
            .list_checkins(campaign_id)
            .await?
            .iter()
            .filter(|c| !c.has_fired())
            .map(|c| c.scheduled_at)
            .min()
            .filter(|_| !campaign.is_terminal());

        Ok(CampaignStatus {
            campaign_id,
            job_id: campaign.job.id,
            state: campaign.state,
            expiry_reason: campaign.expiry_reason.clone(),
            target_bids: campaign.target_bids,
            bids_received: campaign.bids_received(),
            contacted_by_tier: campaign.contacted_by_tier.clone(),
            attempts: AttemptCounts::tally(&attempts),
            enabled_channels: campaign.enabled_channels.clone(),
            radius_miles: campaign.radius_miles,
            min_score: campaign.min_score,
            expected_responses: campaign.expected_responses,
            confidence: campaign.confidence,
            escalation_count: campaign.escalation_count,
            hot_leads: attempts
                .iter()
                .filter(|a| a.interest_level == InterestLevel::High)
                .count() as u32,
            discovery_runs: runs.len() as u32,
            next_checkin_at,
            deadline_at: campaign.deadline_at,
            updated_at: campaign.updated_at,
        })
    }
}

/// Public handle; cheap to clone
#[derive(Clone)]
pub struct CampaignEngine {
    ctx: Arc<EngineContext>,
}

impl CampaignEngine {
    pub fn new(config: OutreachConfig, collaborators: Collaborators) -> OutreachResult<Self> {
        let ctx = EngineContext::new(config, collaborators)?;
        logging::log_startup(Component::Engine, "campaign engine");
        Ok(Self { ctx: Arc::new(ctx) })
    }

    /// Discover, score, size and dispatch the first wave; returns once the campaign is active
    pub async fn start_campaign(
        &self,
        request: JobRequest,
        bids_needed: u32,
        urgency: Urgency,
    ) -> OutreachResult<CampaignId> {
        self.ctx.start_campaign(request, bids_needed, urgency).await
    }

    pub async fn get_campaign_status(&self, campaign_id: CampaignId) -> OutreachResult<CampaignStatus> {
        self.ctx.get_campaign_status(campaign_id).await
    }

    /// Idempotent by event id
    pub async fn record_response_event(
        &self,
        attempt_id: AttemptId,
        event: EngagementEvent,
    ) -> OutreachResult<EngagementOutcome> {
        self.ctx.record_response_event(attempt_id, event).await
    }

    pub async fn get_analytics(&self, filter: AnalyticsFilter) -> OutreachResult<AnalyticsReport> {
        self.ctx.tracker.analytics(&filter).await
    }

    pub async fn list_campaigns(&self) -> OutreachResult<Vec<Campaign>> {
        self.ctx.store.list_campaigns().await
    }

    pub async fn discovery_runs(&self, campaign_id: CampaignId) -> OutreachResult<Vec<DiscoveryRun>> {
        self.ctx.load_campaign(campaign_id).await?;
        self.ctx.store.list_discovery_runs(campaign_id).await
    }

    pub async fn attempts(&self, campaign_id: CampaignId) -> OutreachResult<Vec<shared::OutreachAttempt>> {
        self.ctx.store.list_attempts(Some(campaign_id)).await
    }

    pub async fn checkins(&self, campaign_id: CampaignId) -> OutreachResult<Vec<CheckIn>> {
        self.ctx.store.list_checkins(campaign_id).await
    }

    /// Fire every check-in due at `as_of`, then apply the deadline
    pub async fn fire_due_checkins(
        &self,
        campaign_id: CampaignId,
        as_of: DateTime<Utc>,
    ) -> OutreachResult<Vec<CheckInReport>> {
        self.ctx.fire_due_checkins(campaign_id, as_of).await
    }

    /// Cancel all timers; stored state is left as is
    pub async fn shutdown(&self) {
        let cancelled = self.ctx.monitor.timers().cancel_all().await;
        logging::log_shutdown(
            Component::Engine,
            &format!("cancelled timers for {cancelled} campaigns"),
        );
    }
}

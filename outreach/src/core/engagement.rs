//! Engagement scoring rules and read-side analytics
//!
//! Score increments are fixed weights and only ever add, so an attempt's
//! engagement score is monotonic. Interest only ratchets upward; the hot-lead
//! signal is the first move to `High`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use shared::{
    AnalyticsFilter, AnalyticsReport, AttemptId, AttemptStatus, EngagementEvent,
    EngagementEventType, EngagementRecord, InterestLevel, OutreachAttempt, ResponseType,
    SegmentMetrics,
};

/// Fixed score increments per event kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngagementWeights {
    pub open: u32,
    pub click: u32,
    /// Reply, form submission or call
    pub response: u32,
    /// Added once, when the attempt first reaches high interest
    pub high_interest: u32,
}

impl Default for EngagementWeights {
    fn default() -> Self {
        Self {
            open: 10,
            click: 25,
            response: 50,
            high_interest: 100,
        }
    }
}

/// Interest implied by a response type
pub fn interest_for_response(response_type: Option<ResponseType>) -> InterestLevel {
    match response_type {
        Some(ResponseType::Interested)
        | Some(ResponseType::BidSubmitted)
        | Some(ResponseType::RequestSiteVisit) => InterestLevel::High,
        Some(ResponseType::NeedMoreInfo) => InterestLevel::Medium,
        Some(ResponseType::Maybe) | None => InterestLevel::Low,
        Some(ResponseType::NotInterested) | Some(ResponseType::Unsubscribe) => InterestLevel::None,
    }
}

/// Interest implied by an event; only responses carry interest
pub fn interest_for_event(event: &EngagementEvent) -> Option<InterestLevel> {
    if !event.event_type.is_response() {
        return None;
    }
    if event.payload.response_type.is_none() && event.payload.bid_amount.is_some() {
        return Some(InterestLevel::High);
    }
    Some(interest_for_response(event.payload.response_type))
}

/// Result of folding one event into an attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedEngagement {
    pub attempt: OutreachAttempt,
    pub record: EngagementRecord,
    pub previous_interest: InterestLevel,
    pub score_delta: u32,
    /// The attempt carried no bid before this event
    pub new_bid: bool,
}

impl AppliedEngagement {
    pub fn reached_high(&self) -> bool {
        self.previous_interest < InterestLevel::High
            && self.attempt.interest_level == InterestLevel::High
    }
}

/// Fold an event into an attempt in place; callers hold the store lock
pub fn apply_event(
    attempt: &mut OutreachAttempt,
    event: &EngagementEvent,
    weights: &EngagementWeights,
) -> AppliedEngagement {
    let previous_interest = attempt.interest_level;
    let had_bid = attempt.bid_submitted;

    let mut delta = match event.event_type {
        EngagementEventType::Open => weights.open,
        EngagementEventType::Click => weights.click,
        EngagementEventType::Reply
        | EngagementEventType::FormSubmission
        | EngagementEventType::Call => weights.response,
        EngagementEventType::Delivered | EngagementEventType::Bounced => 0,
    };

    match event.event_type {
        EngagementEventType::Delivered => {
            if matches!(attempt.status, AttemptStatus::Queued | AttemptStatus::Sent) {
                attempt.status = AttemptStatus::Delivered;
            }
        }
        EngagementEventType::Bounced => {
            if attempt.status != AttemptStatus::Failed {
                attempt.status = AttemptStatus::Bounced;
            }
        }
        _ => {}
    }

    if event.event_type.is_response() {
        if attempt.first_response_at.is_none() {
            attempt.first_response_at = Some(event.occurred_at);
        }
        if let Some(response_type) = event.payload.response_type {
            attempt.response_type = Some(response_type);
        }
    }

    if let Some(interest) = interest_for_event(event) {
        attempt.interest_level = attempt.interest_level.max(interest);
    }
    if previous_interest < InterestLevel::High && attempt.interest_level == InterestLevel::High {
        delta += weights.high_interest;
    }

    if event.carries_bid() {
        attempt.bid_submitted = true;
        if let Some(amount) = event.payload.bid_amount {
            attempt.bid_amount = Some(amount);
        }
    }

    attempt.engagement_score = attempt.engagement_score.saturating_add(delta);

    AppliedEngagement {
        record: EngagementRecord {
            event_id: event.event_id.clone(),
            attempt_id: attempt.id,
            campaign_id: attempt.campaign_id,
            event_type: event.event_type,
            score_delta: delta,
            occurred_at: event.occurred_at,
            recorded_at: Utc::now(),
        },
        attempt: attempt.clone(),
        previous_interest,
        score_delta: delta,
        new_bid: !had_bid && attempt.bid_submitted,
    }
}

fn rate(numerator: u32, denominator: u32) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[derive(Default)]
struct Tally {
    attempts: u32,
    sent: u32,
    opened: u32,
    responded: u32,
}

impl Tally {
    fn add(&mut self, attempt: &OutreachAttempt, opened: bool) {
        self.attempts += 1;
        if attempt.status.is_success() {
            self.sent += 1;
        }
        if opened {
            self.opened += 1;
        }
        if attempt.has_responded() {
            self.responded += 1;
        }
    }

    fn metrics(&self) -> SegmentMetrics {
        SegmentMetrics {
            attempts: self.attempts,
            sent: self.sent,
            opened: self.opened,
            responded: self.responded,
            open_rate: rate(self.opened, self.sent),
            response_rate: rate(self.responded, self.sent),
        }
    }
}

fn median(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    match n {
        0 => None,
        _ if n % 2 == 1 => Some(sorted[n / 2]),
        _ => Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0),
    }
}

/// Build an analytics report over attempts and their engagement log
///
/// An attempt counts as opened when it has any open, click or response
/// event. Rates divide by successful sends.
pub fn build_report(
    attempts: &[OutreachAttempt],
    records: &[EngagementRecord],
    filter: &AnalyticsFilter,
) -> AnalyticsReport {
    let opened_ids: HashSet<AttemptId> = records
        .iter()
        .filter(|r| {
            matches!(r.event_type, EngagementEventType::Open | EngagementEventType::Click)
                || r.event_type.is_response()
        })
        .map(|r| r.attempt_id)
        .collect();

    let mut totals = Tally::default();
    let mut by_channel: BTreeMap<_, Tally> = BTreeMap::new();
    let mut by_tier: BTreeMap<_, Tally> = BTreeMap::new();
    let mut response_times = Vec::new();
    let mut hot_leads = 0;
    let mut bids = 0;

    for attempt in attempts.iter().filter(|a| filter.matches(a)) {
        let opened = opened_ids.contains(&attempt.id) || attempt.has_responded();
        totals.add(attempt, opened);
        by_channel.entry(attempt.channel).or_default().add(attempt, opened);
        by_tier.entry(attempt.tier).or_default().add(attempt, opened);

        if let Some(secs) = attempt.time_to_response_secs() {
            response_times.push(secs);
        }
        if attempt.interest_level == InterestLevel::High {
            hot_leads += 1;
        }
        if attempt.bid_submitted {
            bids += 1;
        }
    }

    response_times.sort_by(|a, b| a.total_cmp(b));
    let avg = if response_times.is_empty() {
        None
    } else {
        Some(response_times.iter().sum::<f64>() / response_times.len() as f64)
    };

    let by_channel: BTreeMap<_, _> = by_channel.into_iter().map(|(k, t)| (k, t.metrics())).collect();
    let best_channel = by_channel
        .iter()
        .filter(|(_, m)| m.sent > 0)
        .fold(None, |best: Option<(_, f64)>, (channel, m)| match best {
            Some((_, best_rate)) if best_rate >= m.response_rate => best,
            _ => Some((*channel, m.response_rate)),
        })
        .map(|(channel, _)| channel);

    AnalyticsReport {
        filter: filter.clone(),
        totals: totals.metrics(),
        avg_time_to_response_secs: avg,
        median_time_to_response_secs: median(&response_times),
        best_channel,
        by_channel,
        by_tier: by_tier.into_iter().map(|(k, t)| (k, t.metrics())).collect(),
        hot_leads,
        bids,
    }
}

/// Responses recorded for attempts created no later than `cutoff`
pub fn responses_as_of(attempts: &[OutreachAttempt], cutoff: DateTime<Utc>) -> u32 {
    let mut responders = HashSet::new();
    for attempt in attempts {
        if attempt.first_response_at.is_some_and(|at| at <= cutoff) {
            responders.insert(&attempt.contractor_key);
        }
    }
    responders.len() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use shared::{CampaignId, Channel, ContractorKey, NewAttempt, Tier};

    fn attempt(channel: Channel, tier: Tier) -> OutreachAttempt {
        let mut attempt = OutreachAttempt::from_new(NewAttempt {
            campaign_id: CampaignId::new(),
            contractor_key: ContractorKey::new(format!("{channel}-{tier}")),
            company_name: "Test".to_string(),
            tier,
            channel,
        });
        attempt.status = AttemptStatus::Sent;
        attempt.sent_at = Some(attempt.created_at);
        attempt
    }

    #[test]
    fn test_interest_mapping() {
        assert_eq!(interest_for_response(Some(ResponseType::Interested)), InterestLevel::High);
        assert_eq!(interest_for_response(Some(ResponseType::RequestSiteVisit)), InterestLevel::High);
        assert_eq!(interest_for_response(Some(ResponseType::NeedMoreInfo)), InterestLevel::Medium);
        assert_eq!(interest_for_response(Some(ResponseType::Maybe)), InterestLevel::Low);
        assert_eq!(interest_for_response(None), InterestLevel::Low);
        assert_eq!(interest_for_response(Some(ResponseType::Unsubscribe)), InterestLevel::None);
    }

    #[test]
    fn test_weights_accumulate_monotonically() {
        let weights = EngagementWeights::default();
        let mut a = attempt(Channel::Email, Tier::Tier1);

        let open = apply_event(&mut a, &EngagementEvent::new("1", EngagementEventType::Open), &weights);
        assert_eq!(open.score_delta, 10);
        let click = apply_event(&mut a, &EngagementEvent::new("2", EngagementEventType::Click), &weights);
        assert_eq!(click.score_delta, 25);

        let reply = EngagementEvent::new("3", EngagementEventType::Reply)
            .with_response(ResponseType::Interested);
        let applied = apply_event(&mut a, &reply, &weights);
        assert_eq!(applied.score_delta, 150);
        assert!(applied.reached_high());
        assert_eq!(a.engagement_score, 185);

        // A second high response adds the response weight only
        let again = EngagementEvent::new("4", EngagementEventType::Call)
            .with_response(ResponseType::RequestSiteVisit);
        let applied = apply_event(&mut a, &again, &weights);
        assert_eq!(applied.score_delta, 50);
        assert!(!applied.reached_high());
    }

    #[test]
    fn test_interest_never_drops() {
        let weights = EngagementWeights::default();
        let mut a = attempt(Channel::Sms, Tier::Tier2);
        apply_event(
            &mut a,
            &EngagementEvent::new("1", EngagementEventType::Reply).with_response(ResponseType::NeedMoreInfo),
            &weights,
        );
        apply_event(
            &mut a,
            &EngagementEvent::new("2", EngagementEventType::Reply).with_response(ResponseType::NotInterested),
            &weights,
        );
        assert_eq!(a.interest_level, InterestLevel::Medium);
        assert_eq!(a.response_type, Some(ResponseType::NotInterested));
    }

    #[test]
    fn test_delivery_receipts_update_status() {
        let weights = EngagementWeights::default();
        let mut a = attempt(Channel::Email, Tier::Tier3);
        let delivered = apply_event(&mut a, &EngagementEvent::new("d", EngagementEventType::Delivered), &weights);
        assert_eq!(delivered.score_delta, 0);
        assert_eq!(a.status, AttemptStatus::Delivered);

        apply_event(&mut a, &EngagementEvent::new("b", EngagementEventType::Bounced), &weights);
        assert_eq!(a.status, AttemptStatus::Bounced);
    }

    #[test]
    fn test_bid_flags_once() {
        let weights = EngagementWeights::default();
        let mut a = attempt(Channel::Form, Tier::Tier1);
        let bid = EngagementEvent::new("1", EngagementEventType::FormSubmission).with_bid(1200.0);
        let first = apply_event(&mut a, &bid, &weights);
        assert!(first.new_bid);
        assert_eq!(a.bid_amount, Some(1200.0));
        assert_eq!(a.interest_level, InterestLevel::High);

        let second = apply_event(
            &mut a,
            &EngagementEvent::new("2", EngagementEventType::Reply).with_response(ResponseType::BidSubmitted),
            &weights,
        );
        assert!(!second.new_bid);
    }

    #[test]
    fn test_report_rates_and_best_channel() {
        let weights = EngagementWeights::default();
        let mut email_a = attempt(Channel::Email, Tier::Tier1);
        let email_b = attempt(Channel::Email, Tier::Tier3);
        let mut sms = attempt(Channel::Sms, Tier::Tier1);
        let mut failed = attempt(Channel::Phone, Tier::Tier1);
        failed.status = AttemptStatus::Failed;

        let mut records = Vec::new();
        records.push(apply_event(&mut email_a, &EngagementEvent::new("1", EngagementEventType::Open), &weights).record);
        let reply_at = sms.created_at + Duration::seconds(120);
        records.push(
            apply_event(
                &mut sms,
                &EngagementEvent::new("2", EngagementEventType::Reply)
                    .with_response(ResponseType::Interested)
                    .at(reply_at),
                &weights,
            )
            .record,
        );

        let attempts = vec![email_a, email_b, sms, failed];
        let report = build_report(&attempts, &records, &AnalyticsFilter::default());

        assert_eq!(report.totals.attempts, 4);
        assert_eq!(report.totals.sent, 3);
        assert_eq!(report.totals.opened, 2);
        assert_eq!(report.totals.responded, 1);
        assert!((report.totals.response_rate - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(report.best_channel, Some(Channel::Sms));
        assert_eq!(report.avg_time_to_response_secs, Some(120.0));
        assert_eq!(report.median_time_to_response_secs, Some(120.0));
        assert_eq!(report.hot_leads, 1);
        assert_eq!(report.by_channel[&Channel::Email].open_rate, 0.5);
        assert_eq!(report.by_tier[&Tier::Tier1].attempts, 3);
    }

    #[test]
    fn test_report_filters_by_channel() {
        let attempts = vec![attempt(Channel::Email, Tier::Tier1), attempt(Channel::Sms, Tier::Tier1)];
        let filter = AnalyticsFilter::default().with_channel(Channel::Sms);
        let report = build_report(&attempts, &[], &filter);
        assert_eq!(report.totals.attempts, 1);
        assert!(report.by_channel.contains_key(&Channel::Sms));
        assert!(!report.by_channel.contains_key(&Channel::Email));
    }

    #[test]
    fn test_median_even_count() {
        assert_eq!(median(&[1.0, 3.0]), Some(2.0));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_responses_as_of_counts_distinct_contractors() {
        let now = Utc::now();
        let mut email = attempt(Channel::Email, Tier::Tier1);
        let mut sms = email.clone();
        sms.channel = Channel::Sms;
        email.first_response_at = Some(now);
        sms.first_response_at = Some(now);
        let mut late = attempt(Channel::Form, Tier::Tier2);
        late.first_response_at = Some(now + Duration::hours(1));

        assert_eq!(responses_as_of(&[email, sms, late], now), 1);
    }
}

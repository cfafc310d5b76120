//! Seeded simulated collaborators for CLI runs and tests
//!
//! Every source owns a fixed pool of contractors generated from the seed,
//! each at some distance from the job; `find` returns the ones inside the
//! radius, so wider searches return supersets. Oracle scores, send outcomes
//! and replayed engagement are derived from the seed and the record being
//! handled, which keeps a run reproducible under concurrency.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use shared::{
    Candidate, Channel, EngagementEvent, EngagementEventType, Job, OracleAssessment,
    OutreachAttempt, OutreachMessage, ResponseType, SendReceipt, Tier,
};

use crate::error::SourceError;
use crate::traits::{CandidateSource, ChannelSender, ScoringOracle};

const PREFIXES: &[&str] = &[
    "Acme", "Summit", "Evergreen", "Blue Ridge", "Pioneer", "Keystone", "Redwood", "Harbor",
    "Northstar", "Cedar", "Silver Oak", "Riverbend", "Granite", "Maple Leaf", "Ironwood",
    "Sunrise", "Lakeside", "Prairie", "Canyon", "Heritage",
];

const SUFFIXES: &[&str] = &["", " LLC", " Inc", " Co", " & Sons", " Pros"];

fn rng_for(seed: u64, salt: impl Hash) -> StdRng {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    salt.hash(&mut hasher);
    StdRng::seed_from_u64(hasher.finish())
}

fn tier_profile(tier: Tier) -> (usize, f64, (f64, f64)) {
    // (pool size, max distance, rating range)
    match tier {
        Tier::Tier1 => (6, 25.0, (4.2, 5.0)),
        Tier::Tier2 => (10, 40.0, (3.5, 4.8)),
        Tier::Tier3 => (30, 110.0, (2.5, 4.9)),
    }
}

/// Candidate source for one tier backed by a seeded pool
pub struct SimulatedSource {
    tier: Tier,
    pool: Vec<Candidate>,
}

impl SimulatedSource {
    pub fn new(tier: Tier, seed: u64) -> Self {
        let mut rng = rng_for(seed, ("pool", tier.label()));
        let (size, max_distance, (min_rating, max_rating)) = tier_profile(tier);

        let pool = (0..size)
            .map(|n| {
                let prefix = PREFIXES[rng.gen_range(0..PREFIXES.len())];
                let suffix = SUFFIXES[rng.gen_range(0..SUFFIXES.len())];
                // Marketplace listings repeat some company names
                let name = if tier == Tier::Tier3 && n % 7 == 0 {
                    format!("{prefix} Home Services{suffix}")
                } else {
                    format!("{prefix} {} {n}{suffix}", tier_trade(tier))
                };
                let rating = (rng.gen_range(min_rating..=max_rating) * 10.0_f64).round() / 10.0;
                let mut candidate = Candidate::new(format!("{}-{n:03}", tier.label()), tier, name)
                    .with_rating(rating, rng.gen_range(0..250))
                    .with_distance((rng.gen_range(1.0..max_distance) * 10.0_f64).round() / 10.0);
                if rng.gen_bool(0.85) {
                    candidate = candidate.with_email(format!("contact{n}@{}.example", tier.label()));
                }
                if rng.gen_bool(0.5) {
                    candidate = candidate.with_phone(format!("+1555{:07}", rng.gen_range(0..10_000_000)));
                }
                if rng.gen_bool(0.4) {
                    candidate = candidate.with_form_url(format!("https://{}.example/quote/{n}", tier.label()));
                }
                candidate
            })
            .collect();

        Self { tier, pool }
    }

    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }
}

fn tier_trade(tier: Tier) -> &'static str {
    match tier {
        Tier::Tier1 => "Contracting",
        Tier::Tier2 => "Builders",
        Tier::Tier3 => "Handyman",
    }
}

#[async_trait]
impl CandidateSource for SimulatedSource {
    fn tier(&self) -> Tier {
        self.tier
    }

    async fn find(&self, _job: &Job, radius_miles: f64) -> Result<Vec<Candidate>, SourceError> {
        Ok(self
            .pool
            .iter()
            .filter(|c| c.distance_miles.map_or(true, |d| d <= radius_miles))
            .cloned()
            .collect())
    }
}

/// Oracle that scores from rating and reviews with seeded jitter
pub struct SimulatedOracle {
    seed: u64,
    failure_rate: f64,
}

impl SimulatedOracle {
    pub fn new(seed: u64, failure_rate: f64) -> Self {
        Self {
            seed,
            failure_rate: failure_rate.clamp(0.0, 1.0),
        }
    }
}

#[async_trait]
impl ScoringOracle for SimulatedOracle {
    async fn score(&self, candidate: &Candidate, job: &Job) -> Result<OracleAssessment, SourceError> {
        let mut rng = rng_for(self.seed, ("oracle", &candidate.source_id, &job.category));
        if rng.gen_bool(self.failure_rate) {
            return Err(SourceError::Transient("oracle overloaded".to_string()));
        }

        let rating = candidate.rating.unwrap_or(3.0);
        let reviews = candidate.review_count.unwrap_or(0);
        let base = rating * 15.0 + (reviews.min(200) as f64) / 10.0;
        let score = (base + rng.gen_range(-8.0..8.0)).clamp(0.0, 100.0);

        let mut strengths = Vec::new();
        let mut concerns = Vec::new();
        if rating >= 4.5 {
            strengths.push("highly rated".to_string());
        }
        if reviews < 5 {
            concerns.push("few reviews".to_string());
        }
        Ok(OracleAssessment {
            score,
            reasoning: format!("{} for {} work", candidate.company_name, job.category),
            strengths,
            concerns,
        })
    }
}

/// Channel sender with a seeded failure rate
pub struct SimulatedSender {
    channel: Channel,
    seed: u64,
    failure_rate: f64,
}

impl SimulatedSender {
    pub fn new(channel: Channel, seed: u64, failure_rate: f64) -> Self {
        Self {
            channel,
            seed,
            failure_rate: failure_rate.clamp(0.0, 1.0),
        }
    }

    /// One sender per channel
    pub fn all(seed: u64, failure_rate: f64) -> Vec<Self> {
        Channel::ALL
            .into_iter()
            .map(|channel| Self::new(channel, seed, failure_rate))
            .collect()
    }
}

#[async_trait]
impl ChannelSender for SimulatedSender {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn send(&self, candidate: &Candidate, message: &OutreachMessage) -> Result<SendReceipt, SourceError> {
        let mut rng = rng_for(self.seed, ("send", &candidate.source_id, self.channel.to_string()));
        if rng.gen_bool(self.failure_rate) {
            return Err(SourceError::Permanent(format!("{} provider rejected recipient", self.channel)));
        }
        Ok(SendReceipt {
            provider_id: Some(format!("sim-{}-{}", self.channel, message.attempt_id)),
            // Email and SMS providers confirm delivery synchronously
            delivered: matches!(self.channel, Channel::Email | Channel::Sms),
        })
    }
}

/// Plausible engagement for sent attempts, in event order
///
/// Event ids derive from the attempt id, so replaying the same attempts
/// yields the same ids.
pub fn simulate_engagement(attempts: &[OutreachAttempt], seed: u64) -> Vec<(OutreachAttempt, EngagementEvent)> {
    let mut events = Vec::new();
    for attempt in attempts.iter().filter(|a| a.status.is_success()) {
        let mut rng = rng_for(seed, ("engage", &attempt.contractor_key, attempt.channel.to_string()));
        let event_id = |suffix: &str| format!("{}-{suffix}", attempt.id);

        if !rng.gen_bool(0.6) {
            continue;
        }
        events.push((attempt.clone(), EngagementEvent::new(event_id("open"), EngagementEventType::Open)));
        if rng.gen_bool(0.5) {
            events.push((attempt.clone(), EngagementEvent::new(event_id("click"), EngagementEventType::Click)));
        }
        if !rng.gen_bool(0.45) {
            continue;
        }

        let response_type = match rng.gen_range(0..10) {
            0..=2 => ResponseType::BidSubmitted,
            3..=4 => ResponseType::Interested,
            5 => ResponseType::RequestSiteVisit,
            6 => ResponseType::NeedMoreInfo,
            7 => ResponseType::Maybe,
            _ => ResponseType::NotInterested,
        };
        let event_type = match attempt.channel {
            Channel::Form => EngagementEventType::FormSubmission,
            Channel::Phone => EngagementEventType::Call,
            Channel::Email | Channel::Sms => EngagementEventType::Reply,
        };
        let mut reply = EngagementEvent::new(event_id("reply"), event_type).with_response(response_type);
        if response_type.is_bid() {
            reply = reply.with_bid((rng.gen_range(400.0..6000.0_f64) / 10.0).round() * 10.0);
        }
        events.push((attempt.clone(), reply));
    }
    events
}

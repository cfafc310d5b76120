//! Engine configuration
//!
//! Defaults cover every field, so an empty JSON object is a valid config.
//! Loading order: optional JSON file, then `OUTREACH_*` environment
//! overrides, then validation.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use shared::{Channel, Tier, Urgency};

use crate::core::{EngagementWeights, HeuristicWeights, SizingPolicy};
use crate::error::{OutreachError, OutreachResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub default_radius_miles: f64,
    /// Query all tiers concurrently instead of cascading with early exit
    pub parallel_tiers: bool,
    /// Tiers wrapped in adaptive radius expansion
    pub expand_tiers: Vec<Tier>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            default_radius_miles: 15.0,
            parallel_tiers: false,
            expand_tiers: vec![Tier::Tier3],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionConfig {
    pub multiplier: f64,
    /// Includes the initial query
    pub max_stages: u32,
    pub max_radius_miles: f64,
    /// Floor = ceil(target × floor_ratio)
    pub floor_ratio: f64,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            multiplier: 2.0,
            max_stages: 3,
            max_radius_miles: 120.0,
            floor_ratio: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub min_score: f64,
    pub concurrency: usize,
    pub heuristic: HeuristicWeights,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            min_score: 30.0,
            concurrency: 8,
            heuristic: HeuristicWeights::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub standard_channels: Vec<Channel>,
    /// Used for urgent and emergency jobs
    pub rush_channels: Vec<Channel>,
    pub concurrency: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            standard_channels: vec![Channel::Email, Channel::Form],
            rush_channels: vec![Channel::Email, Channel::Form, Channel::Sms, Channel::Phone],
            concurrency: 16,
        }
    }
}

impl DispatchConfig {
    pub fn channels_for(&self, urgency: Urgency) -> Vec<Channel> {
        if urgency.is_rush() {
            self.rush_channels.clone()
        } else {
            self.standard_channels.clone()
        }
    }
}

/// Campaign timeline per urgency, in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    pub standard_secs: u64,
    pub urgent_secs: u64,
    pub emergency_secs: u64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            standard_secs: 72 * 3600,
            urgent_secs: 24 * 3600,
            emergency_secs: 6 * 3600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub checkin_fractions: Vec<f64>,
    /// Escalate when actual / expected falls below this
    pub escalation_threshold: f64,
    pub max_escalations: u32,
    pub timeline: TimelineConfig,
    /// Radius multiplier for the widen-radius escalation
    pub radius_multiplier: f64,
    /// Points removed from the score bar by the relax escalation
    pub score_relaxation: f64,
    /// Drive check-in and deadline timers; off for manual `fire_due_checkins`
    pub schedule_timers: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            checkin_fractions: vec![0.25, 0.5, 0.75],
            escalation_threshold: 0.75,
            max_escalations: 3,
            timeline: TimelineConfig::default(),
            radius_multiplier: 2.0,
            score_relaxation: 10.0,
            schedule_timers: true,
        }
    }
}

impl MonitorConfig {
    pub fn timeline_for(&self, urgency: Urgency) -> Duration {
        let secs = match urgency {
            Urgency::Standard => self.timeline.standard_secs,
            Urgency::Urgent => self.timeline.urgent_secs,
            Urgency::Emergency => self.timeline.emergency_secs,
        };
        Duration::from_secs(secs)
    }
}

/// Bounded timeouts for every collaborator call, in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub source_ms: u64,
    pub oracle_ms: u64,
    pub sender_ms: u64,
    pub notifier_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            source_ms: 10_000,
            oracle_ms: 5_000,
            sender_ms: 5_000,
            notifier_ms: 3_000,
        }
    }
}

impl TimeoutConfig {
    pub fn source(&self) -> Duration {
        Duration::from_millis(self.source_ms)
    }

    pub fn oracle(&self) -> Duration {
        Duration::from_millis(self.oracle_ms)
    }

    pub fn sender(&self) -> Duration {
        Duration::from_millis(self.sender_ms)
    }

    pub fn notifier(&self) -> Duration {
        Duration::from_millis(self.notifier_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutreachConfig {
    pub discovery: DiscoveryConfig,
    pub expansion: ExpansionConfig,
    pub sizing: SizingPolicy,
    pub scoring: ScoringConfig,
    pub dispatch: DispatchConfig,
    pub monitor: MonitorConfig,
    pub engagement: EngagementWeights,
    pub timeouts: TimeoutConfig,
}

impl OutreachConfig {
    /// Load from an optional JSON file, apply environment overrides, validate
    pub fn load(path: Option<&Path>) -> OutreachResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> OutreachResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Apply `OUTREACH_*` overrides from a key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> OutreachResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(key: &str, raw: String) -> OutreachResult<T> {
            raw.trim().parse().map_err(|_| OutreachError::ConfigurationError {
                field: format!("{key}={raw}"),
            })
        }

        if let Some(raw) = lookup("OUTREACH_DEFAULT_RADIUS_MILES") {
            self.discovery.default_radius_miles = parse("OUTREACH_DEFAULT_RADIUS_MILES", raw)?;
        }
        if let Some(raw) = lookup("OUTREACH_PARALLEL_TIERS") {
            self.discovery.parallel_tiers = parse("OUTREACH_PARALLEL_TIERS", raw)?;
        }
        if let Some(raw) = lookup("OUTREACH_MAX_RADIUS_MILES") {
            self.expansion.max_radius_miles = parse("OUTREACH_MAX_RADIUS_MILES", raw)?;
        }
        if let Some(raw) = lookup("OUTREACH_MIN_SCORE") {
            self.scoring.min_score = parse("OUTREACH_MIN_SCORE", raw)?;
        }
        if let Some(raw) = lookup("OUTREACH_SCORING_CONCURRENCY") {
            self.scoring.concurrency = parse("OUTREACH_SCORING_CONCURRENCY", raw)?;
        }
        if let Some(raw) = lookup("OUTREACH_RESPONSE_RATE") {
            let rate: f64 = parse("OUTREACH_RESPONSE_RATE", raw)?;
            if let SizingPolicy::Blended { response_rate, .. } = &mut self.sizing {
                *response_rate = rate;
            }
        }
        if let Some(raw) = lookup("OUTREACH_ESCALATION_THRESHOLD") {
            self.monitor.escalation_threshold = parse("OUTREACH_ESCALATION_THRESHOLD", raw)?;
        }
        if let Some(raw) = lookup("OUTREACH_MAX_ESCALATIONS") {
            self.monitor.max_escalations = parse("OUTREACH_MAX_ESCALATIONS", raw)?;
        }
        if let Some(raw) = lookup("OUTREACH_TIMELINE_SECS") {
            let secs: u64 = parse("OUTREACH_TIMELINE_SECS", raw)?;
            self.monitor.timeline = TimelineConfig {
                standard_secs: secs,
                urgent_secs: secs,
                emergency_secs: secs,
            };
        }
        Ok(())
    }

    pub fn validate(&self) -> OutreachResult<()> {
        let fail = |field: &str| {
            Err(OutreachError::ConfigurationError {
                field: field.to_string(),
            })
        };

        if !(self.discovery.default_radius_miles > 0.0) {
            return fail("discovery.default_radius_miles");
        }
        if !(self.expansion.multiplier > 1.0) {
            return fail("expansion.multiplier");
        }
        if self.expansion.max_stages == 0 {
            return fail("expansion.max_stages");
        }
        if self.expansion.max_radius_miles < self.discovery.default_radius_miles {
            return fail("expansion.max_radius_miles");
        }
        if !(self.expansion.floor_ratio > 0.0 && self.expansion.floor_ratio <= 1.0) {
            return fail("expansion.floor_ratio");
        }
        if let Err(field) = self.sizing.validate() {
            return fail(&field);
        }
        if !(0.0..=100.0).contains(&self.scoring.min_score) {
            return fail("scoring.min_score");
        }
        if self.scoring.concurrency == 0 {
            return fail("scoring.concurrency");
        }
        if self.dispatch.standard_channels.is_empty() || self.dispatch.rush_channels.is_empty() {
            return fail("dispatch.channels");
        }
        if self.dispatch.concurrency == 0 {
            return fail("dispatch.concurrency");
        }

        let fractions = &self.monitor.checkin_fractions;
        if fractions.iter().any(|f| !(*f > 0.0 && *f < 1.0))
            || fractions.windows(2).any(|pair| pair[0] >= pair[1])
        {
            return fail("monitor.checkin_fractions");
        }
        if !(self.monitor.escalation_threshold > 0.0 && self.monitor.escalation_threshold <= 1.0) {
            return fail("monitor.escalation_threshold");
        }
        let timeline = &self.monitor.timeline;
        if timeline.standard_secs == 0 || timeline.urgent_secs == 0 || timeline.emergency_secs == 0 {
            return fail("monitor.timeline");
        }
        if !(self.monitor.radius_multiplier > 1.0) {
            return fail("monitor.radius_multiplier");
        }

        let timeouts = &self.timeouts;
        if timeouts.source_ms == 0
            || timeouts.oracle_ms == 0
            || timeouts.sender_ms == 0
            || timeouts.notifier_ms == 0
        {
            return fail("timeouts");
        }
        Ok(())
    }
}

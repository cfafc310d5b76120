//! Candidate contractors, sourcing tiers, contact channels and assessments

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::errors::SharedError;

/// Contractor sourcing tier, ordered by priority (Tier1 first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Internal pool of vetted contractors
    Tier1,
    /// Re-engagement pool of previously contacted contractors
    Tier2,
    /// Cold, adaptive external search
    Tier3,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Tier1, Tier::Tier2, Tier::Tier3];

    /// Priority rank, 1 is highest
    pub fn priority(&self) -> u8 {
        match self {
            Tier::Tier1 => 1,
            Tier::Tier2 => 2,
            Tier::Tier3 => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tier::Tier1 => "internal",
            Tier::Tier2 => "reengagement",
            Tier::Tier3 => "external",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tier{}", self.priority())
    }
}

/// Outreach channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Form,
    Sms,
    Phone,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::Email, Channel::Form, Channel::Sms, Channel::Phone];
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Email => write!(f, "email"),
            Channel::Form => write!(f, "form"),
            Channel::Sms => write!(f, "sms"),
            Channel::Phone => write!(f, "phone"),
        }
    }
}

impl FromStr for Channel {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "email" => Ok(Channel::Email),
            "form" | "web_form" => Ok(Channel::Form),
            "sms" | "text" => Ok(Channel::Sms),
            "phone" | "call" => Ok(Channel::Phone),
            _ => Err(SharedError::UnknownVariant {
                kind: "channel",
                input: s.to_string(),
            }),
        }
    }
}

/// How a contractor can be reached
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub form_url: Option<String>,
}

impl ContactInfo {
    /// Whether the contractor can be reached on this channel
    pub fn supports(&self, channel: Channel) -> bool {
        let value = match channel {
            Channel::Email => &self.email,
            Channel::Sms | Channel::Phone => &self.phone,
            Channel::Form => &self.form_url,
        };
        value.as_deref().is_some_and(|v| !v.trim().is_empty())
    }

    pub fn has_any(&self) -> bool {
        Channel::ALL.iter().any(|channel| self.supports(*channel))
    }
}

/// A raw contractor record as returned by a tier source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Identifier within the originating source
    pub source_id: String,
    pub tier: Tier,
    pub company_name: String,
    pub contact: ContactInfo,
    /// Average rating on a 0-5 scale
    pub rating: Option<f64>,
    pub review_count: Option<u32>,
    pub distance_miles: Option<f64>,
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl Candidate {
    pub fn new(source_id: impl Into<String>, tier: Tier, company_name: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            tier,
            company_name: company_name.into(),
            contact: ContactInfo::default(),
            rating: None,
            review_count: None,
            distance_miles: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.contact.email = Some(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.contact.phone = Some(phone.into());
        self
    }

    pub fn with_form_url(mut self, url: impl Into<String>) -> Self {
        self.contact.form_url = Some(url.into());
        self
    }

    pub fn with_rating(mut self, rating: f64, review_count: u32) -> Self {
        self.rating = Some(rating);
        self.review_count = Some(review_count);
        self
    }

    pub fn with_distance(mut self, miles: f64) -> Self {
        self.distance_miles = Some(miles);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// Normalized company identity used as the dedup key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractorKey(String);

impl ContractorKey {
    pub fn new(normalized: impl Into<String>) -> Self {
        Self(normalized.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContractorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the scoring oracle returns for one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleAssessment {
    pub score: f64,
    pub reasoning: String,
    pub strengths: Vec<String>,
    pub concerns: Vec<String>,
}

/// Where a score came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreSource {
    Oracle,
    /// Deterministic fallback, with the reason the oracle was not used
    Heuristic { reason: String },
}

/// Final assessment attached to a candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub score: f64,
    pub reasoning: String,
    pub strengths: Vec<String>,
    pub concerns: Vec<String>,
    pub source: ScoreSource,
}

impl Assessment {
    pub fn from_oracle(assessment: OracleAssessment) -> Self {
        Self {
            score: assessment.score,
            reasoning: assessment.reasoning,
            strengths: assessment.strengths,
            concerns: assessment.concerns,
            source: ScoreSource::Oracle,
        }
    }

    pub fn is_heuristic(&self) -> bool {
        matches!(self.source, ScoreSource::Heuristic { .. })
    }
}

/// A deduplicated candidate annotated with its score and rank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub key: ContractorKey,
    pub candidate: Candidate,
    /// Position in the tier-ordered merged set
    pub arrival: usize,
    pub assessment: Assessment,
    /// 1-based rank after sorting
    pub rank: usize,
}

impl ScoredCandidate {
    pub fn score(&self) -> f64 {
        self.assessment.score
    }

    pub fn tier(&self) -> Tier {
        self.candidate.tier
    }
}

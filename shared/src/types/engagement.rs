//! Engagement events, response types and interest levels

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{AttemptId, CampaignId};
use crate::errors::SharedError;

/// Caller-supplied idempotency key for an engagement event
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw engagement event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementEventType {
    Delivered,
    Bounced,
    Open,
    Click,
    Reply,
    FormSubmission,
    Call,
}

impl EngagementEventType {
    /// Replies, form submissions and calls count as responses
    pub fn is_response(&self) -> bool {
        matches!(
            self,
            EngagementEventType::Reply | EngagementEventType::FormSubmission | EngagementEventType::Call
        )
    }

    pub fn is_delivery_receipt(&self) -> bool {
        matches!(self, EngagementEventType::Delivered | EngagementEventType::Bounced)
    }
}

impl fmt::Display for EngagementEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngagementEventType::Delivered => "delivered",
            EngagementEventType::Bounced => "bounced",
            EngagementEventType::Open => "open",
            EngagementEventType::Click => "click",
            EngagementEventType::Reply => "reply",
            EngagementEventType::FormSubmission => "form_submission",
            EngagementEventType::Call => "call",
        };
        write!(f, "{name}")
    }
}

impl FromStr for EngagementEventType {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "delivered" => Ok(Self::Delivered),
            "bounced" => Ok(Self::Bounced),
            "open" | "opened" => Ok(Self::Open),
            "click" | "clicked" => Ok(Self::Click),
            "reply" | "replied" => Ok(Self::Reply),
            "form_submission" | "form" => Ok(Self::FormSubmission),
            "call" => Ok(Self::Call),
            _ => Err(SharedError::UnknownVariant {
                kind: "engagement event",
                input: s.to_string(),
            }),
        }
    }
}

/// Classified content of a contractor response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    Interested,
    BidSubmitted,
    RequestSiteVisit,
    NeedMoreInfo,
    Maybe,
    NotInterested,
    Unsubscribe,
}

impl ResponseType {
    pub fn is_bid(&self) -> bool {
        matches!(self, ResponseType::BidSubmitted)
    }
}

/// Contractor interest, ordered from none to high
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum InterestLevel {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl fmt::Display for InterestLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InterestLevel::None => "none",
            InterestLevel::Low => "low",
            InterestLevel::Medium => "medium",
            InterestLevel::High => "high",
        };
        write!(f, "{name}")
    }
}

/// Optional response details
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponsePayload {
    pub response_type: Option<ResponseType>,
    pub bid_amount: Option<f64>,
    pub message: Option<String>,
}

/// Event reported against an outreach attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementEvent {
    pub event_id: EventId,
    pub event_type: EngagementEventType,
    pub occurred_at: DateTime<Utc>,
    #[serde(default)]
    pub payload: ResponsePayload,
}

impl EngagementEvent {
    pub fn new(event_id: impl Into<String>, event_type: EngagementEventType) -> Self {
        Self {
            event_id: EventId::new(event_id),
            event_type,
            occurred_at: Utc::now(),
            payload: ResponsePayload::default(),
        }
    }

    pub fn with_response(mut self, response_type: ResponseType) -> Self {
        self.payload.response_type = Some(response_type);
        self
    }

    pub fn with_bid(mut self, amount: f64) -> Self {
        self.payload.bid_amount = Some(amount);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.payload.message = Some(message.into());
        self
    }

    pub fn at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = occurred_at;
        self
    }

    /// A bid response or an explicit bid amount
    pub fn carries_bid(&self) -> bool {
        self.payload.bid_amount.is_some()
            || self.payload.response_type.is_some_and(|response| response.is_bid())
    }
}

/// Append-only log entry for an applied event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementRecord {
    pub event_id: EventId,
    pub attempt_id: AttemptId,
    pub campaign_id: CampaignId,
    pub event_type: EngagementEventType,
    pub score_delta: u32,
    pub occurred_at: DateTime<Utc>,
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interest_levels_are_ordered() {
        assert!(InterestLevel::High > InterestLevel::Medium);
        assert!(InterestLevel::Medium > InterestLevel::Low);
        assert!(InterestLevel::Low > InterestLevel::None);
        assert_eq!(InterestLevel::default(), InterestLevel::None);
    }

    #[test]
    fn test_response_event_classification() {
        assert!(EngagementEventType::Reply.is_response());
        assert!(EngagementEventType::Call.is_response());
        assert!(!EngagementEventType::Open.is_response());
        assert!(EngagementEventType::Bounced.is_delivery_receipt());
    }

    #[test]
    fn test_bid_detection() {
        let plain = EngagementEvent::new("e1", EngagementEventType::Reply)
            .with_response(ResponseType::Interested);
        assert!(!plain.carries_bid());

        let typed = EngagementEvent::new("e2", EngagementEventType::Reply)
            .with_response(ResponseType::BidSubmitted);
        assert!(typed.carries_bid());

        let amount = EngagementEvent::new("e3", EngagementEventType::FormSubmission).with_bid(850.0);
        assert!(amount.carries_bid());
    }

    #[test]
    fn test_event_type_parsing() {
        assert_eq!("opened".parse::<EngagementEventType>().unwrap(), EngagementEventType::Open);
        assert!("teleport".parse::<EngagementEventType>().is_err());
    }
}

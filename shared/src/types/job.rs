//! Job definitions: what the homeowner needs and how urgently

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::JobId;
use crate::errors::SharedError;

/// How quickly the homeowner needs bids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Standard,
    Urgent,
    Emergency,
}

impl Urgency {
    /// Urgent and emergency jobs get the faster channels
    pub fn is_rush(&self) -> bool {
        !matches!(self, Urgency::Standard)
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Urgency::Standard => write!(f, "standard"),
            Urgency::Urgent => write!(f, "urgent"),
            Urgency::Emergency => write!(f, "emergency"),
        }
    }
}

impl FromStr for Urgency {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standard" | "normal" => Ok(Urgency::Standard),
            "urgent" => Ok(Urgency::Urgent),
            "emergency" => Ok(Urgency::Emergency),
            _ => Err(SharedError::UnknownVariant {
                kind: "urgency",
                input: s.to_string(),
            }),
        }
    }
}

/// Where the work happens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub label: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Location {
    pub fn named(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            latitude: None,
            longitude: None,
        }
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }
}

/// Caller-supplied job details for a new campaign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    pub category: String,
    pub location: Location,
    pub description: Option<String>,
}

impl JobRequest {
    pub fn new(category: impl Into<String>, location: Location) -> Self {
        Self {
            category: category.into(),
            location,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A job as frozen at campaign kickoff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub category: String,
    pub location: Location,
    pub urgency: Urgency,
    pub bids_needed: u32,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn from_request(request: JobRequest, bids_needed: u32, urgency: Urgency) -> Self {
        Self {
            id: JobId::new(),
            category: request.category,
            location: request.location,
            urgency,
            bids_needed,
            description: request.description,
            created_at: Utc::now(),
        }
    }
}

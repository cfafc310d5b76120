//! Outreach engine error types

use thiserror::Error;

use shared::{AttemptId, CampaignId, CampaignState, SharedError};

/// Failure reported by an external collaborator (source, oracle, sender, sink)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Timeout, 5xx or dropped connection; worth one retry
    #[error("Transient failure: {0}")]
    Transient(String),

    /// Auth/config problem or 4xx; retrying will not help
    #[error("Permanent failure: {0}")]
    Permanent(String),
}

impl SourceError {
    pub fn is_transient(&self) -> bool {
        matches!(self, SourceError::Transient(_))
    }

    pub fn message(&self) -> &str {
        match self {
            SourceError::Transient(message) | SourceError::Permanent(message) => message,
        }
    }
}

#[derive(Error, Debug)]
pub enum OutreachError {
    #[error("Malformed candidate {company_name:?}: {reason}")]
    DataIntegrity { company_name: String, reason: String },

    #[error("Escalation limit reached for campaign {campaign_id} after {escalations} escalations")]
    EscalationLoopGuard {
        campaign_id: CampaignId,
        escalations: u32,
    },

    #[error("Persistence failure: {message}")]
    Persistence { message: String },

    #[error("Campaign not found: {campaign_id}")]
    CampaignNotFound { campaign_id: CampaignId },

    #[error("Attempt not found: {attempt_id}")]
    AttemptNotFound { attempt_id: AttemptId },

    #[error("Invalid campaign transition from {from} on {event}")]
    InvalidTransition { from: CampaignState, event: String },

    #[error("Configuration error: {field}")]
    ConfigurationError { field: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Shared component error")]
    SharedError(#[from] SharedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type OutreachResult<T> = Result<T, OutreachError>;

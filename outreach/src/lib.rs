//! Contractor outreach campaign engine
//!
//! Turns a homeowner job into a bid-gathering campaign: tiered contractor
//! discovery with adaptive radius expansion, deduplication and scoring,
//! outreach sizing, multi-channel dispatch, check-in driven escalation and
//! engagement tracking. Every collaborator is injected through the ports in
//! [`traits`]; [`services`] ships in-memory, file-backed, webhook and
//! simulated implementations.

pub mod config;
pub mod core;
pub mod discovery;
pub mod dispatch;
pub mod engagement;
pub mod engine;
pub mod error;
pub mod monitor;
pub mod resilience;
pub mod scoring;
pub mod services;
pub mod traits;

// Re-export commonly used types
pub use config::OutreachConfig;
pub use engine::{CampaignEngine, Collaborators, EngineContext};
pub use error::{OutreachError, OutreachResult, SourceError};
pub use monitor::{CheckInOutcome, CheckInReport, EscalationAction, EscalationContext, LadderPolicy};
pub use traits::{
    CandidateSource, ChannelSender, EscalationPolicy, NotificationSink, PersistenceStore, ScoringOracle,
};

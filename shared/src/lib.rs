//! Shared types for the contractor outreach engine
//!
//! Contains the domain entities (jobs, candidates, campaigns, attempts,
//! check-ins, engagement records), the request/response messages exposed by
//! the engine, shared errors and the component-aware logging macros.

pub mod errors;
pub mod logging;
pub mod messages;
pub mod types;

pub use errors::*;
pub use types::*;

pub use messages::{
    // Campaign status reporting
    AttemptCounts, CampaignStatus,

    // Engagement recording
    EngagementOutcome,

    // Read-side analytics
    AnalyticsFilter, AnalyticsReport, ChannelMetrics, SegmentMetrics, TierMetrics,

    // Fire-and-forget notifications
    NotificationEvent,
};

//! Request and response messages exposed by the outreach engine
//!
//! - `status`: campaign status snapshots
//! - `engagement`: results of recording an engagement event
//! - `analytics`: read-side engagement analytics
//! - `notification`: fire-and-forget notifications to the outside world

pub mod analytics;
pub mod engagement;
pub mod notification;
pub mod status;

pub use analytics::{AnalyticsFilter, AnalyticsReport, ChannelMetrics, SegmentMetrics, TierMetrics};

pub use engagement::EngagementOutcome;

pub use notification::NotificationEvent;

pub use status::{AttemptCounts, CampaignStatus};

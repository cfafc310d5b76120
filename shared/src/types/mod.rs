//! Core types used throughout the outreach engine

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::errors::SharedError;

pub mod attempt;
pub mod campaign;
pub mod candidate;
pub mod discovery;
pub mod engagement;
pub mod job;

pub use attempt::*;
pub use campaign::*;
pub use candidate::*;
pub use discovery::*;
pub use engagement::*;
pub use job::*;

/// Declares a UUID-backed identifier newtype
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_string(s: &str) -> Result<Self, SharedError> {
                Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|_| SharedError::InvalidId { input: s.to_string() })
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Identifier of a homeowner job
    JobId
);
uuid_id!(
    /// Identifier of an outreach campaign
    CampaignId
);
uuid_id!(
    /// Identifier of a single outreach attempt (contractor × channel)
    AttemptId
);
uuid_id!(
    /// Identifier of a scheduled campaign check-in
    CheckInId
);
uuid_id!(
    /// Identifier of a discovery run
    DiscoveryRunId
);

/// Engine component tag attached to every log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Component {
    Engine,
    Discovery,
    Scoring,
    Sizing,
    Dispatch,
    Monitor,
    Engagement,
    Store,
    Notifier,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Component::Engine => "engine",
            Component::Discovery => "discovery",
            Component::Scoring => "scoring",
            Component::Sizing => "sizing",
            Component::Dispatch => "dispatch",
            Component::Monitor => "monitor",
            Component::Engagement => "engagement",
            Component::Store => "store",
            Component::Notifier => "notifier",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_round_trip_through_string() {
        let id = CampaignId::new();
        let parsed = CampaignId::from_string(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_invalid_id_rejected() {
        let result = AttemptId::from_string("not-a-uuid");
        assert!(matches!(result, Err(SharedError::InvalidId { .. })));
    }

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let id = JobId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }
}

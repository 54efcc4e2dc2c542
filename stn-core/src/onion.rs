//! Onion-service availability

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tri-state outcome of onion detection
///
/// Persisted as a nullable boolean: `true`, `false` or `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum OnionAvailability {
    /// An onion service is announced
    Available,
    /// Confirmed that no onion service is announced
    Absent,
    /// Could not be determined (fetch or parse failure)
    Unknown,
}

impl OnionAvailability {
    pub fn is_available(self) -> bool {
        self == Self::Available
    }
}

impl From<Option<bool>> for OnionAvailability {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => Self::Available,
            Some(false) => Self::Absent,
            None => Self::Unknown,
        }
    }
}

impl From<OnionAvailability> for Option<bool> {
    fn from(value: OnionAvailability) -> Self {
        match value {
            OnionAvailability::Available => Some(true),
            OnionAvailability::Absent => Some(false),
            OnionAvailability::Unknown => None,
        }
    }
}

impl fmt::Display for OnionAvailability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Available => "yes",
            Self::Absent => "no",
            Self::Unknown => "unknown",
        })
    }
}

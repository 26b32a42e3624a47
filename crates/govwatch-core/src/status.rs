//! Ordered severity levels and keyword tiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Assessment status, totally ordered `Stable < Warning < Drift < Capture`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Status {
    #[serde(alias = "stable", alias = "STABLE")]
    Stable,
    #[serde(alias = "warning", alias = "WARNING")]
    Warning,
    #[serde(alias = "drift", alias = "DRIFT")]
    Drift,
    #[serde(alias = "capture", alias = "CAPTURE")]
    Capture,
}

impl Status {
    pub const ALL: [Status; 4] = [Status::Stable, Status::Warning, Status::Drift, Status::Capture];

    /// Position in the ordered set, 0 (Stable) through 3 (Capture).
    pub fn ordinal(self) -> u8 {
        match self {
            Self::Stable => 0,
            Self::Warning => 1,
            Self::Drift => 2,
            Self::Capture => 3,
        }
    }

    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        Self::ALL.get(ordinal as usize).copied()
    }

    /// Ordinal distance between two statuses (0-3).
    pub fn distance(self, other: Status) -> u8 {
        self.ordinal().abs_diff(other.ordinal())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stable => "Stable",
            Self::Warning => "Warning",
            Self::Drift => "Drift",
            Self::Capture => "Capture",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stable" => Ok(Self::Stable),
            "warning" => Ok(Self::Warning),
            "drift" => Ok(Self::Drift),
            "capture" => Ok(Self::Capture),
            other => Err(format!("unknown status '{other}'")),
        }
    }
}

/// Keyword dictionary tier, ordered `Warning < Drift < Capture`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Warning,
    Drift,
    Capture,
}

impl Tier {
    /// Tiers from most to least severe, the order dictionaries are scanned in.
    pub const DESCENDING: [Tier; 3] = [Tier::Capture, Tier::Drift, Tier::Warning];

    /// One tier lower, or `None` when demoting the lowest tier.
    pub fn demote(self) -> Option<Tier> {
        match self {
            Self::Capture => Some(Self::Drift),
            Self::Drift => Some(Self::Warning),
            Self::Warning => None,
        }
    }

    /// The status a tier maps to when it is the only evidence.
    pub fn status(self) -> Status {
        match self {
            Self::Warning => Status::Warning,
            Self::Drift => Status::Drift,
            Self::Capture => Status::Capture,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Drift => "drift",
            Self::Capture => "capture",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_order_is_total() {
        assert!(Status::Stable < Status::Warning);
        assert!(Status::Warning < Status::Drift);
        assert!(Status::Drift < Status::Capture);
        for s in Status::ALL {
            assert_eq!(Status::from_ordinal(s.ordinal()), Some(s));
        }
        assert_eq!(Status::from_ordinal(4), None);
    }

    #[test]
    fn distance_is_symmetric() {
        assert_eq!(Status::Capture.distance(Status::Stable), 3);
        assert_eq!(Status::Stable.distance(Status::Capture), 3);
        assert_eq!(Status::Drift.distance(Status::Drift), 0);
    }

    #[test]
    fn status_accepts_lowercase_json() {
        let s: Status = serde_json::from_str("\"drift\"").unwrap();
        assert_eq!(s, Status::Drift);
        let s: Status = serde_json::from_str("\"Capture\"").unwrap();
        assert_eq!(s, Status::Capture);
        assert_eq!(serde_json::to_string(&Status::Warning).unwrap(), "\"Warning\"");
    }

    #[test]
    fn status_from_str() {
        assert_eq!(" Warning ".parse::<Status>(), Ok(Status::Warning));
        assert!("severe".parse::<Status>().is_err());
    }

    #[test]
    fn tier_demotion() {
        assert_eq!(Tier::Capture.demote(), Some(Tier::Drift));
        assert_eq!(Tier::Drift.demote(), Some(Tier::Warning));
        assert_eq!(Tier::Warning.demote(), None);
        assert!(Tier::Capture > Tier::Drift && Tier::Drift > Tier::Warning);
    }
}

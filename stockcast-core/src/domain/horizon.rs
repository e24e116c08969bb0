//! Prediction horizons: the six fixed forecast windows.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One of the six fixed prediction windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Horizon {
    #[serde(rename = "7d")]
    D7,
    #[serde(rename = "28d")]
    D28,
    #[serde(rename = "60d")]
    D60,
    #[serde(rename = "90d")]
    D90,
    #[serde(rename = "180d")]
    D180,
    #[serde(rename = "365d")]
    D365,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown horizon '{0}' (valid: 7d, 28d, 60d, 90d, 180d, 365d)")]
pub struct ParseHorizonError(pub String);

impl Horizon {
    pub const ALL: [Horizon; 6] = [
        Horizon::D7,
        Horizon::D28,
        Horizon::D60,
        Horizon::D90,
        Horizon::D180,
        Horizon::D365,
    ];

    pub fn days(self) -> i64 {
        match self {
            Horizon::D7 => 7,
            Horizon::D28 => 28,
            Horizon::D60 => 60,
            Horizon::D90 => 90,
            Horizon::D180 => 180,
            Horizon::D365 => 365,
        }
    }

    /// Short tag used in config, CLI flags and JSON ("7d", "28d", ...).
    pub fn tag(self) -> &'static str {
        match self {
            Horizon::D7 => "7d",
            Horizon::D28 => "28d",
            Horizon::D60 => "60d",
            Horizon::D90 => "90d",
            Horizon::D180 => "180d",
            Horizon::D365 => "365d",
        }
    }

    pub fn from_days(days: i64) -> Option<Horizon> {
        Self::ALL.into_iter().find(|h| h.days() == days)
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Horizon {
    type Err = ParseHorizonError;

    /// Accepts "7d" or a bare day count ("7").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_suffix('d')
            .or_else(|| trimmed.strip_suffix('D'))
            .unwrap_or(trimmed);
        digits
            .parse::<i64>()
            .ok()
            .and_then(Horizon::from_days)
            .ok_or_else(|| ParseHorizonError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tags_and_bare_days() {
        assert_eq!("7d".parse::<Horizon>().unwrap(), Horizon::D7);
        assert_eq!("365".parse::<Horizon>().unwrap(), Horizon::D365);
        assert_eq!(" 90D ".parse::<Horizon>().unwrap(), Horizon::D90);
    }

    #[test]
    fn rejects_unknown_horizon() {
        assert!("14d".parse::<Horizon>().is_err());
        assert!("week".parse::<Horizon>().is_err());
    }

    #[test]
    fn tag_matches_days() {
        for h in Horizon::ALL {
            assert_eq!(h.tag(), format!("{}d", h.days()));
            assert_eq!(Horizon::from_days(h.days()), Some(h));
        }
    }

    #[test]
    fn serde_uses_tag() {
        assert_eq!(serde_json::to_string(&Horizon::D28).unwrap(), "\"28d\"");
        let h: Horizon = serde_json::from_str("\"180d\"").unwrap();
        assert_eq!(h, Horizon::D180);
    }
}

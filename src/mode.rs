//! Run mode selection

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What the reconciler does with a detected change. Chosen once per
/// invocation and never re-derived per file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Record new files; observe drift without acting on it
    #[serde(rename = "scan", alias = "baseline")]
    Baseline,
    /// Alert on new and changed files; never touch existing records
    Check,
    /// Accept drift into the baseline silently
    Renew,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Baseline => "scan",
            RunMode::Check => "check",
            RunMode::Renew => "renew",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scan" | "baseline" => Ok(RunMode::Baseline),
            "check" => Ok(RunMode::Check),
            "renew" => Ok(RunMode::Renew),
            other => Err(format!("unknown run mode '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_str() {
        for mode in [RunMode::Baseline, RunMode::Check, RunMode::Renew] {
            assert_eq!(mode.as_str().parse::<RunMode>(), Ok(mode));
        }
        assert!("watch".parse::<RunMode>().is_err());
    }

    #[test]
    fn test_serialized_name_matches_display() {
        for mode in [RunMode::Baseline, RunMode::Check, RunMode::Renew] {
            let json = serde_json::to_string(&mode).unwrap();
            assert_eq!(json, format!("\"{}\"", mode));
            assert_eq!(serde_json::from_str::<RunMode>(&json).unwrap(), mode);
        }
        assert_eq!(serde_json::from_str::<RunMode>("\"baseline\"").unwrap(), RunMode::Baseline);
    }
}

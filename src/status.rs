//! Deployment status values.
//!
//! The status is the durable record of what happened to a deployment.
//! It is persisted as a string so records stay readable by other tools.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every status a deployment record can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeployStatus {
    /// Record created, nothing attempted yet.
    #[serde(rename = "deploy->init")]
    DeployInit,
    #[serde(rename = "deploy->started")]
    DeployStarted,
    #[serde(rename = "deploy->finished")]
    DeployFinished,
    #[serde(rename = "deploy->failed")]
    DeployFailed,
    /// A failure escaped a guarded scope; the real state is unknown.
    #[serde(rename = "deploy->inconsistent")]
    DeployInconsistent,
    #[serde(rename = "cleanup->started")]
    CleanupStarted,
    #[serde(rename = "cleanup->finished")]
    CleanupFinished,
    #[serde(rename = "cleanup->failed")]
    CleanupFailed,
}

impl DeployStatus {
    pub const ALL: [DeployStatus; 8] = [
        DeployStatus::DeployInit,
        DeployStatus::DeployStarted,
        DeployStatus::DeployFinished,
        DeployStatus::DeployFailed,
        DeployStatus::DeployInconsistent,
        DeployStatus::CleanupStarted,
        DeployStatus::CleanupFinished,
        DeployStatus::CleanupFailed,
    ];

    /// Persisted string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeployStatus::DeployInit => "deploy->init",
            DeployStatus::DeployStarted => "deploy->started",
            DeployStatus::DeployFinished => "deploy->finished",
            DeployStatus::DeployFailed => "deploy->failed",
            DeployStatus::DeployInconsistent => "deploy->inconsistent",
            DeployStatus::CleanupStarted => "cleanup->started",
            DeployStatus::CleanupFinished => "cleanup->finished",
            DeployStatus::CleanupFailed => "cleanup->failed",
        }
    }

    /// Is this status the end of a lifecycle pass?
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeployStatus::DeployFinished
                | DeployStatus::DeployFailed
                | DeployStatus::DeployInconsistent
                | DeployStatus::CleanupFinished
                | DeployStatus::CleanupFailed
        )
    }

    /// Is this status a failure terminal?
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            DeployStatus::DeployFailed
                | DeployStatus::CleanupFailed
                | DeployStatus::DeployInconsistent
        )
    }

    /// Must an operator inspect the deployment by hand?
    ///
    /// Inconsistent deployments are never candidates for automatic retry.
    pub fn requires_operator(&self) -> bool {
        matches!(self, DeployStatus::DeployInconsistent)
    }
}

impl fmt::Display for DeployStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised persisted status string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown deployment status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for DeployStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeployStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_serde() {
        for status in DeployStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status));
        }
    }

    #[test]
    fn test_from_str() {
        assert_eq!(
            "deploy->inconsistent".parse::<DeployStatus>().unwrap(),
            DeployStatus::DeployInconsistent
        );
        assert_eq!(
            "cleanup->failed".parse::<DeployStatus>().unwrap(),
            DeployStatus::CleanupFailed
        );
        assert!("deploy->exploded".parse::<DeployStatus>().is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!DeployStatus::DeployInit.is_terminal());
        assert!(!DeployStatus::DeployStarted.is_terminal());
        assert!(!DeployStatus::CleanupStarted.is_terminal());

        assert!(DeployStatus::DeployFinished.is_terminal());
        assert!(DeployStatus::DeployFailed.is_terminal());
        assert!(DeployStatus::CleanupFinished.is_terminal());
        assert!(DeployStatus::CleanupFailed.is_terminal());
        assert!(DeployStatus::DeployInconsistent.is_terminal());
    }

    #[test]
    fn test_only_inconsistent_requires_operator() {
        let flagged: Vec<_> = DeployStatus::ALL
            .into_iter()
            .filter(|s| s.requires_operator())
            .collect();
        assert_eq!(flagged, vec![DeployStatus::DeployInconsistent]);
        assert!(DeployStatus::DeployInconsistent.is_failure());
        assert!(!DeployStatus::DeployFinished.is_failure());
    }
}

use std::fmt::{Display, Formatter, Result};

use serde::{Deserialize, Serialize};

/// Lifecycle stage of an export. A run without any recorded stage has never been started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    Started,
    Enumerating,
    Processing,
    Finalizing,
    Completed,
    Interrupted,
    Failed,
}

impl Display for SyncState {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let label = match self {
            Self::Started => "started",
            Self::Enumerating => "enumerating",
            Self::Processing => "processing",
            Self::Finalizing => "finalizing",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Mutable section of an account file, rewritten after every change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<SyncState>,
    /// Messages the source reported when the folders were enumerated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    /// Percentage of processed messages, one decimal.
    #[serde(default)]
    pub progress: f64,
    /// Last estimate of the remaining time as `HH:MM:SS`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining: Option<String>,
    /// Unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    /// Unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_labels_match_serialized_form() {
        let run = RunState {
            state: Some(SyncState::Interrupted),
            ..RunState::default()
        };

        let serialized = toml::to_string(&run).unwrap();

        assert!(serialized.contains(&format!("state = \"{}\"", SyncState::Interrupted)));
    }
}

//! Per-node lifecycle of a migration.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::Serialize;

/// Stage a node has reached.
///
/// The normal path is `Discovered -> Fetching -> VerifiedLocal -> Uploading
/// -> VerifiedRemote -> Recorded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    Discovered,
    Fetching,
    VerifiedLocal,
    Uploading,
    VerifiedRemote,
    Recorded,
}

impl NodeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeState::Discovered => "discovered",
            NodeState::Fetching => "fetching",
            NodeState::VerifiedLocal => "verified_local",
            NodeState::Uploading => "uploading",
            NodeState::VerifiedRemote => "verified_remote",
            NodeState::Recorded => "recorded",
        }
    }
}

impl Display for NodeState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// How a node's migration ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NodeOutcome {
    /// Copied, verified and recorded at the location
    Recorded,
    /// Already carried the target location
    Skipped,
    /// Dry run: would have been migrated
    Pending,
    /// Copied and verified, but the location could not be recorded
    RecordFailed { error: String },
    /// Stopped while in `stage`
    Failed { stage: NodeState, error: String },
}

impl NodeOutcome {
    pub fn failed(stage: NodeState, error: impl ToString) -> Self {
        NodeOutcome::Failed {
            stage,
            error: error.to_string(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            NodeOutcome::Failed { .. } | NodeOutcome::RecordFailed { .. }
        )
    }
}

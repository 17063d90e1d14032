//! Summary of a migration run.

use serde::Serialize;

use crate::state::NodeOutcome;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeReport {
    pub node_id: String,
    #[serde(flatten)]
    pub outcome: NodeOutcome,
}

/// Per-node outcomes of one batch, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub location: String,
    pub nodes: Vec<NodeReport>,
}

impl MigrationReport {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            nodes: Vec::new(),
        }
    }

    pub fn push(&mut self, node_id: impl Into<String>, outcome: NodeOutcome) {
        self.nodes.push(NodeReport {
            node_id: node_id.into(),
            outcome,
        });
    }

    fn count(&self, predicate: impl Fn(&NodeOutcome) -> bool) -> usize {
        self.nodes.iter().filter(|n| predicate(&n.outcome)).count()
    }

    pub fn recorded(&self) -> usize {
        self.count(|o| matches!(o, NodeOutcome::Recorded))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, NodeOutcome::Skipped))
    }

    pub fn pending(&self) -> usize {
        self.count(|o| matches!(o, NodeOutcome::Pending))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, NodeOutcome::Failed { .. }))
    }

    pub fn record_failed(&self) -> usize {
        self.count(|o| matches!(o, NodeOutcome::RecordFailed { .. }))
    }

    pub fn has_failures(&self) -> bool {
        self.nodes.iter().any(|n| n.outcome.is_failure())
    }

    pub fn outcome(&self, node_id: &str) -> Option<&NodeOutcome> {
        self.nodes
            .iter()
            .find(|n| n.node_id == node_id)
            .map(|n| &n.outcome)
    }

    pub fn log_summary(&self) {
        tracing::info!(
            location = %self.location,
            total = self.nodes.len(),
            recorded = self.recorded(),
            skipped = self.skipped(),
            pending = self.pending(),
            failed = self.failed(),
            record_failed = self.record_failed(),
            "Migration finished"
        );
    }
}

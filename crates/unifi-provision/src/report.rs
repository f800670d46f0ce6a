//! Provisioning outcome.

use serde::Serialize;

use unifi_graph::NodeId;

use crate::error::ProvisioningError;
use crate::state::{NodeRecord, NodeState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Every node reached Ready.
    Succeeded,
    /// At least one node failed; independent branches ran to completion.
    Failed,
    /// The caller cancelled; in-flight nodes were left as submitted.
    Cancelled,
}

/// Final state of every node plus the overall outcome.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisioningReport {
    pub outcome: Outcome,
    pub nodes: Vec<NodeRecord>,
}

impl ProvisioningReport {
    pub fn new(nodes: Vec<NodeRecord>, outcome: Outcome) -> Self {
        Self { outcome, nodes }
    }

    pub fn succeeded(&self) -> bool {
        self.outcome == Outcome::Succeeded
    }

    pub fn node(&self, id: &NodeId) -> Option<&NodeRecord> {
        self.nodes.iter().find(|r| &r.id == id)
    }

    pub fn state_of(&self, id: &NodeId) -> Option<NodeState> {
        self.node(id).map(|r| r.state)
    }

    /// Nodes that reached Failed (not those skipped because of them).
    pub fn failed_nodes(&self) -> impl Iterator<Item = &NodeRecord> {
        self.nodes.iter().filter(|r| r.state == NodeState::Failed)
    }

    /// Nodes that were never submitted because a dependency failed.
    pub fn skipped_nodes(&self) -> impl Iterator<Item = &NodeRecord> {
        self.nodes
            .iter()
            .filter(|r| r.state == NodeState::Pending && r.error.is_some())
    }

    /// Convert into a `Result`, surfacing the first failed node's cause.
    pub fn into_result(self) -> Result<Self, ProvisioningError> {
        match self.outcome {
            Outcome::Succeeded => Ok(self),
            Outcome::Cancelled => Err(ProvisioningError::Cancelled),
            Outcome::Failed => {
                let first = self
                    .failed_nodes()
                    .chain(self.skipped_nodes())
                    .find_map(|r| r.error.clone());
                Err(first.unwrap_or(ProvisioningError::Cancelled))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unifi_graph::ResourceKind;

    fn record(id: &str, state: NodeState, error: Option<ProvisioningError>) -> NodeRecord {
        NodeRecord {
            id: NodeId::from(id),
            kind: ResourceKind::InitJob,
            state,
            submitted_seq: None,
            ready_seq: None,
            error,
        }
    }

    #[test]
    fn into_result_surfaces_failed_node() {
        let failure = ProvisioningError::Failed {
            node: NodeId::from("job"),
            kind: ResourceKind::InitJob,
            reason: "BackoffLimitExceeded".to_string(),
        };
        let report = ProvisioningReport::new(
            vec![
                record("ns", NodeState::Ready, None),
                record("job", NodeState::Failed, Some(failure.clone())),
            ],
            Outcome::Failed,
        );

        assert_eq!(report.failed_nodes().count(), 1);
        assert_eq!(report.into_result().unwrap_err(), failure);
    }

    #[test]
    fn report_serializes_errors_as_text() {
        let report = ProvisioningReport::new(
            vec![record(
                "app",
                NodeState::Pending,
                Some(ProvisioningError::DependencyFailed {
                    node: NodeId::from("app"),
                    kind: ResourceKind::Workload,
                    dependency: NodeId::from("job"),
                }),
            )],
            Outcome::Failed,
        );

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"], "failed");
        assert_eq!(json["nodes"][0]["state"], "pending");
        assert_eq!(
            json["nodes"][0]["error"],
            "workload `app` not submitted: dependency `job` failed"
        );
    }
}

//! Per-node provisioning state.

use std::sync::Arc;

use serde::{Serialize, Serializer};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use unifi_graph::{Graph, NodeId, ResourceKind};

use crate::error::ProvisioningError;

/// Lifecycle of a single node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    Pending,
    Submitted,
    Ready,
    Failed,
}

impl NodeState {
    /// Whether `self → to` is a legal transition.
    pub fn can_become(self, to: NodeState) -> bool {
        matches!(
            (self, to),
            (NodeState::Pending, NodeState::Submitted)
                | (NodeState::Submitted, NodeState::Ready)
                | (NodeState::Submitted, NodeState::Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, NodeState::Ready | NodeState::Failed)
    }
}

/// What is known about one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub kind: ResourceKind,
    pub state: NodeState,
    /// Position in the table-wide transition sequence when submitted.
    pub submitted_seq: Option<u64>,
    /// Position in the table-wide transition sequence when it became Ready.
    pub ready_seq: Option<u64>,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<ProvisioningError>,
}

#[derive(Debug)]
struct TableInner {
    records: Vec<NodeRecord>,
    seq: u64,
}

impl TableInner {
    fn apply(&mut self, idx: usize, to: NodeState) -> bool {
        let record = &mut self.records[idx];
        if !record.state.can_become(to) {
            warn!(node = %record.id, from = ?record.state, to = ?to, "refusing illegal state transition");
            return false;
        }

        self.seq += 1;
        let seq = self.seq;

        debug!(node = %record.id, from = ?record.state, to = ?to, seq, "state transition");
        record.state = to;
        match to {
            NodeState::Submitted => record.submitted_seq = Some(seq),
            NodeState::Ready => record.ready_seq = Some(seq),
            NodeState::Pending | NodeState::Failed => {}
        }
        true
    }
}

/// Shared, concurrently-updatable state for every node in a graph.
///
/// A single transition is the unit of synchronization. Cloning the table
/// shares it, so callers can snapshot progress while the executor runs.
#[derive(Debug, Clone)]
pub struct StateTable {
    inner: Arc<RwLock<TableInner>>,
}

impl StateTable {
    /// Every node starts Pending.
    pub fn new(graph: &Graph) -> Self {
        let records = graph
            .nodes()
            .iter()
            .map(|n| NodeRecord {
                id: n.id().clone(),
                kind: n.kind(),
                state: NodeState::Pending,
                submitted_seq: None,
                ready_seq: None,
                error: None,
            })
            .collect();

        Self {
            inner: Arc::new(RwLock::new(TableInner { records, seq: 0 })),
        }
    }

    pub async fn state(&self, idx: usize) -> NodeState {
        self.inner.read().await.records[idx].state
    }

    /// Apply a transition. Illegal transitions are refused and logged.
    pub async fn transition(&self, idx: usize, to: NodeState) -> bool {
        self.inner.write().await.apply(idx, to)
    }

    /// Move a submitted node to Failed and keep the cause.
    pub async fn fail(&self, idx: usize, error: ProvisioningError) {
        let mut inner = self.inner.write().await;
        if inner.apply(idx, NodeState::Failed) {
            inner.records[idx].error = Some(error);
        }
    }

    /// Attach an error to a node that will never be submitted. Its state
    /// stays Pending.
    pub async fn skip(&self, idx: usize, error: ProvisioningError) {
        let mut inner = self.inner.write().await;
        let record = &mut inner.records[idx];
        if record.state == NodeState::Pending {
            record.error = Some(error);
        }
    }

    pub async fn snapshot(&self) -> Vec<NodeRecord> {
        self.inner.read().await.records.clone()
    }
}

fn serialize_error<S: Serializer>(error: &Option<ProvisioningError>, s: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => s.serialize_some(&e.to_string()),
        None => s.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unifi_graph::{GraphBuilder, NamespaceSpec, ResourceSpec};

    fn one_node() -> Graph {
        let mut b = GraphBuilder::new();
        b.node(
            "ns",
            ResourceSpec::Namespace(NamespaceSpec {
                name: "unifi".to_string(),
            }),
            [],
        );
        b.build().unwrap()
    }

    #[test]
    fn legal_transitions() {
        assert!(NodeState::Pending.can_become(NodeState::Submitted));
        assert!(NodeState::Submitted.can_become(NodeState::Ready));
        assert!(NodeState::Submitted.can_become(NodeState::Failed));
        assert!(!NodeState::Pending.can_become(NodeState::Ready));
        assert!(!NodeState::Ready.can_become(NodeState::Failed));
        assert!(!NodeState::Failed.can_become(NodeState::Submitted));
    }

    #[tokio::test]
    async fn transitions_are_sequenced() {
        let table = StateTable::new(&one_node());
        assert_eq!(table.state(0).await, NodeState::Pending);

        assert!(table.transition(0, NodeState::Submitted).await);
        assert!(table.transition(0, NodeState::Ready).await);

        let snapshot = table.snapshot().await;
        let record = &snapshot[0];
        assert_eq!(record.state, NodeState::Ready);
        assert!(record.submitted_seq.unwrap() < record.ready_seq.unwrap());
    }

    #[tokio::test]
    async fn illegal_transition_is_refused() {
        let table = StateTable::new(&one_node());
        assert!(!table.transition(0, NodeState::Ready).await);
        assert_eq!(table.state(0).await, NodeState::Pending);
    }

    #[tokio::test]
    async fn skipped_node_stays_pending() {
        let table = StateTable::new(&one_node());
        table.skip(0, ProvisioningError::Cancelled).await;

        let snapshot = table.snapshot().await;
        let record = &snapshot[0];
        assert_eq!(record.state, NodeState::Pending);
        assert_eq!(record.error, Some(ProvisioningError::Cancelled));
    }
}

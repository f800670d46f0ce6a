//! Graph construction errors.

use thiserror::Error;

use crate::graph::NodeId;
use crate::kind::ResourceKind;

pub type GraphResult<T> = Result<T, GraphError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("node `{0}` declared more than once")]
    DuplicateNode(NodeId),

    #[error("node `{node}` depends on unknown node `{missing}`")]
    DanglingDependency { node: NodeId, missing: NodeId },

    #[error("dependency cycle among nodes: {}", format_ids(.0))]
    Cycle(Vec<NodeId>),

    #[error("graph has no {0} node")]
    MissingKind(ResourceKind),

    #[error("config error: {0}")]
    Config(#[from] unifi_config::ConfigError),

    #[error("secret error: {0}")]
    Secret(#[from] unifi_secrets::SecretError),
}

fn format_ids(ids: &[NodeId]) -> String {
    ids.iter()
        .map(NodeId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

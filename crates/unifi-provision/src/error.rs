//! Provisioning error types.

use std::time::Duration;

use thiserror::Error;

use unifi_graph::{NodeId, ResourceKind};

pub type ProvisioningResult<T> = Result<T, ProvisioningError>;

/// Errors reported by a control plane implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlPlaneError {
    /// The specification was refused (malformed, quota exceeded, ...).
    #[error("rejected: {0}")]
    Rejected(String),

    /// The control plane could not be reached.
    #[error("control plane unavailable: {0}")]
    Unavailable(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Why a node did not reach Ready.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProvisioningError {
    #[error("{kind} `{node}` was rejected by the control plane: {source}")]
    Rejected {
        node: NodeId,
        kind: ResourceKind,
        source: ControlPlaneError,
    },

    #[error("{kind} `{node}` could not be observed: {source}")]
    Observe {
        node: NodeId,
        kind: ResourceKind,
        source: ControlPlaneError,
    },

    #[error("{kind} `{node}` failed: {reason}")]
    Failed {
        node: NodeId,
        kind: ResourceKind,
        reason: String,
    },

    #[error("{kind} `{node}` not ready after {after:?}")]
    Timeout {
        node: NodeId,
        kind: ResourceKind,
        after: Duration,
    },

    #[error("{kind} `{node}` not submitted: dependency `{dependency}` failed")]
    DependencyFailed {
        node: NodeId,
        kind: ResourceKind,
        dependency: NodeId,
    },

    #[error("provisioning cancelled")]
    Cancelled,
}

impl ProvisioningError {
    /// The node this error is about, if any.
    pub fn node(&self) -> Option<&NodeId> {
        match self {
            ProvisioningError::Rejected { node, .. }
            | ProvisioningError::Observe { node, .. }
            | ProvisioningError::Failed { node, .. }
            | ProvisioningError::Timeout { node, .. }
            | ProvisioningError::DependencyFailed { node, .. } => Some(node),
            ProvisioningError::Cancelled => None,
        }
    }
}

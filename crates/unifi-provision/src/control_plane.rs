//! The control-plane seam.

use std::future::Future;
use std::sync::Arc;

use unifi_graph::{ObservedStatus, ResourceNode};

use crate::error::ControlPlaneError;

/// Accepts resource specifications and reports their status.
///
/// `submit` returning `Ok` means the control plane accepted the spec, not
/// that the resource is ready; readiness is decided per kind from
/// `observe`.
pub trait ControlPlane: Send + Sync {
    fn submit(&self, node: &ResourceNode) -> impl Future<Output = Result<(), ControlPlaneError>> + Send;

    fn observe(
        &self,
        node: &ResourceNode,
    ) -> impl Future<Output = Result<ObservedStatus, ControlPlaneError>> + Send;
}

impl<C: ControlPlane> ControlPlane for Arc<C> {
    fn submit(&self, node: &ResourceNode) -> impl Future<Output = Result<(), ControlPlaneError>> + Send {
        self.as_ref().submit(node)
    }

    fn observe(
        &self,
        node: &ResourceNode,
    ) -> impl Future<Output = Result<ObservedStatus, ControlPlaneError>> + Send {
        self.as_ref().observe(node)
    }
}

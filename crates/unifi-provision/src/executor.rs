//! Provisioning executor: drives a graph to Ready.
//!
//! One coordinating task owns the walk. Every node whose dependencies are
//! all Ready is launched into a `FuturesUnordered`; each launched future
//! submits its node and polls until the kind's readiness predicate is
//! satisfied. When a node fails, its unsubmitted descendants are skipped
//! while unrelated branches keep going.

use std::future::pending;
use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use unifi_graph::{Graph, ResourceKind, ResourceNode, Verdict};

use crate::control_plane::ControlPlane;
use crate::error::ProvisioningError;
use crate::report::{Outcome, ProvisioningReport};
use crate::state::{NodeState, StateTable};

/// Executor timing knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorSettings {
    /// Delay between observations of a submitted node.
    pub poll_interval: Duration,
    /// Upper bound on waiting for the init job. `None` defers entirely to
    /// the control plane's restart policy.
    pub job_timeout: Option<Duration>,
    /// Upper bound on waiting for any other kind to exist.
    pub resource_timeout: Duration,
    /// Consecutive observation errors tolerated before a node fails.
    pub max_observe_errors: u32,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            job_timeout: Some(Duration::from_secs(15 * 60)),
            resource_timeout: Duration::from_secs(120),
            max_observe_errors: 5,
        }
    }
}

impl ExecutorSettings {
    pub fn timeout_for(&self, kind: ResourceKind) -> Option<Duration> {
        match kind {
            ResourceKind::InitJob => self.job_timeout,
            _ => Some(self.resource_timeout),
        }
    }
}

/// Applies resource graphs to a control plane.
pub struct Executor<C> {
    control_plane: C,
    settings: ExecutorSettings,
}

impl<C: ControlPlane> Executor<C> {
    pub fn new(control_plane: C, settings: ExecutorSettings) -> Self {
        Self {
            control_plane,
            settings,
        }
    }

    pub fn control_plane(&self) -> &C {
        &self.control_plane
    }

    pub fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    /// Provision every node of `graph`, without external cancellation.
    pub async fn provision(&self, graph: &Graph) -> ProvisioningReport {
        let (_keep_open, shutdown) = watch::channel(false);
        self.provision_until(graph, shutdown).await
    }

    /// Provision until done or until `shutdown` flips to `true`.
    pub async fn provision_until(
        &self,
        graph: &Graph,
        shutdown: watch::Receiver<bool>,
    ) -> ProvisioningReport {
        let table = StateTable::new(graph);
        self.provision_with(graph, &table, shutdown).await
    }

    /// Provision recording into a caller-supplied [`StateTable`], so the
    /// caller can snapshot progress concurrently.
    pub async fn provision_with(
        &self,
        graph: &Graph,
        table: &StateTable,
        mut shutdown: watch::Receiver<bool>,
    ) -> ProvisioningReport {
        let n = graph.len();
        let mut launched = vec![false; n];
        let mut ready = vec![false; n];
        let mut skipped = vec![false; n];
        let mut failed = false;
        let mut cancelled = false;
        let mut in_flight = FuturesUnordered::new();

        info!(nodes = n, "provisioning started");

        loop {
            for &idx in graph.topological_order() {
                if launched[idx] || skipped[idx] {
                    continue;
                }
                if graph.dependencies(idx).iter().all(|&d| ready[d]) {
                    launched[idx] = true;
                    in_flight.push(self.drive(graph.node(idx), idx, table));
                }
            }

            if in_flight.is_empty() {
                break;
            }

            tokio::select! {
                biased;

                _ = cancellation(&mut shutdown) => {
                    warn!(in_flight = in_flight.len(), "provisioning cancelled");
                    cancelled = true;
                    break;
                }

                Some((idx, result)) = in_flight.next() => match result {
                    Ok(()) => ready[idx] = true,
                    Err(_) => {
                        failed = true;
                        let failed_id = graph.node(idx).id();
                        for d in graph.descendants(idx) {
                            if launched[d] || skipped[d] {
                                continue;
                            }
                            skipped[d] = true;
                            let node = graph.node(d);
                            warn!(node = %node.id(), dependency = %failed_id, "skipping, dependency failed");
                            table
                                .skip(
                                    d,
                                    ProvisioningError::DependencyFailed {
                                        node: node.id().clone(),
                                        kind: node.kind(),
                                        dependency: failed_id.clone(),
                                    },
                                )
                                .await;
                        }
                    }
                },
            }
        }

        // In-flight waits are interrupted here. Their nodes stay Submitted.
        drop(in_flight);

        let outcome = if cancelled {
            Outcome::Cancelled
        } else if failed {
            Outcome::Failed
        } else {
            Outcome::Succeeded
        };

        info!(?outcome, "provisioning finished");
        ProvisioningReport::new(table.snapshot().await, outcome)
    }

    /// Submit one node and wait for it, recording the result.
    async fn drive(
        &self,
        node: &ResourceNode,
        idx: usize,
        table: &StateTable,
    ) -> (usize, Result<(), ProvisioningError>) {
        table.transition(idx, NodeState::Submitted).await;

        let result = self.submit_and_wait(node).await;
        match &result {
            Ok(()) => {
                table.transition(idx, NodeState::Ready).await;
                info!(node = %node.id(), kind = %node.kind(), "ready");
            }
            Err(e) => {
                error!(node = %node.id(), kind = %node.kind(), error = %e, "failed");
                table.fail(idx, e.clone()).await;
            }
        }
        (idx, result)
    }

    /// Submit and wait under the kind's timeout. The bound covers the submit
    /// call as well as the wait.
    async fn submit_and_wait(&self, node: &ResourceNode) -> Result<(), ProvisioningError> {
        match self.settings.timeout_for(node.kind()) {
            Some(limit) => tokio::time::timeout(limit, self.submit_then_wait(node))
                .await
                .map_err(|_| ProvisioningError::Timeout {
                    node: node.id().clone(),
                    kind: node.kind(),
                    after: limit,
                })?,
            None => self.submit_then_wait(node).await,
        }
    }

    async fn submit_then_wait(&self, node: &ResourceNode) -> Result<(), ProvisioningError> {
        info!(node = %node.id(), kind = %node.kind(), "submitting");

        self.control_plane
            .submit(node)
            .await
            .map_err(|source| ProvisioningError::Rejected {
                node: node.id().clone(),
                kind: node.kind(),
                source,
            })?;

        self.wait_ready(node).await
    }

    /// Poll `observe` until the kind's readiness predicate settles.
    async fn wait_ready(&self, node: &ResourceNode) -> Result<(), ProvisioningError> {
        let readiness = node.kind().readiness();
        let mut observe_errors = 0;

        loop {
            match self.control_plane.observe(node).await {
                Ok(status) => {
                    observe_errors = 0;
                    match readiness.evaluate(&status) {
                        Verdict::Ready => return Ok(()),
                        Verdict::Failed(reason) => {
                            return Err(ProvisioningError::Failed {
                                node: node.id().clone(),
                                kind: node.kind(),
                                reason,
                            });
                        }
                        Verdict::Waiting => {
                            debug!(node = %node.id(), ?status, "waiting");
                        }
                    }
                }
                Err(source) => {
                    observe_errors += 1;
                    warn!(node = %node.id(), error = %source, attempt = observe_errors, "observe failed");
                    if observe_errors >= self.settings.max_observe_errors {
                        return Err(ProvisioningError::Observe {
                            node: node.id().clone(),
                            kind: node.kind(),
                            source,
                        });
                    }
                }
            }

            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }
}

/// Resolves once `shutdown` reads `true`. A dropped sender never cancels.
async fn cancellation(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            pending::<()>().await;
        }
    }
}

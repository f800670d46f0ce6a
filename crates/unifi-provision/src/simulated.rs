//! In-memory control plane with scripted job outcomes.
//!
//! Used by `apply --dry-run` and by tests. Every submission and
//! observation is appended to an event log with a global sequence number
//! and a timestamp, so ordering properties can be checked after the fact.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::debug;

use unifi_graph::{NodeId, ObservedStatus, ResourceKind, ResourceNode};

use crate::control_plane::ControlPlane;
use crate::error::ControlPlaneError;

/// How a simulated job behaves once submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Runs for `polls` observations, then exits 0.
    SucceedsAfter { polls: u32 },
    /// Exits non-zero on every attempt; after `restarts` restarts the
    /// control plane gives up and reports the job permanently failed.
    FailsEveryAttempt { restarts: u32 },
    /// Never finishes.
    Hangs,
}

impl Default for JobOutcome {
    fn default() -> Self {
        Self::SucceedsAfter { polls: 1 }
    }
}

impl JobOutcome {
    fn script(&self) -> VecDeque<ObservedStatus> {
        match self {
            JobOutcome::SucceedsAfter { polls } => {
                let mut s: VecDeque<_> = (0..*polls).map(|_| ObservedStatus::Running).collect();
                s.push_back(ObservedStatus::Succeeded);
                s
            }
            JobOutcome::FailsEveryAttempt { restarts } => {
                let mut s: VecDeque<_> = (0..*restarts).map(|_| ObservedStatus::Running).collect();
                s.push_back(ObservedStatus::Failed {
                    reason: format!("BackoffLimitExceeded: exit code 1 after {restarts} restarts"),
                });
                s
            }
            JobOutcome::Hangs => VecDeque::from([ObservedStatus::Running]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimEventKind {
    Submitted,
    Rejected(String),
    Observed(ObservedStatus),
}

/// One entry in the simulated control plane's log.
#[derive(Debug, Clone)]
pub struct SimEvent {
    pub seq: u64,
    pub at: Instant,
    pub node: NodeId,
    pub kind: ResourceKind,
    pub event: SimEventKind,
}

#[derive(Debug, Default)]
struct SimState {
    seq: u64,
    log: Vec<SimEvent>,
    accepted: HashSet<NodeId>,
    jobs: HashMap<NodeId, VecDeque<ObservedStatus>>,
    job_outcomes: HashMap<NodeId, JobOutcome>,
    rejections: HashMap<NodeId, String>,
}

impl SimState {
    fn record(&mut self, node: &ResourceNode, event: SimEventKind) {
        self.seq += 1;
        self.log.push(SimEvent {
            seq: self.seq,
            at: Instant::now(),
            node: node.id().clone(),
            kind: node.kind(),
            event,
        });
    }
}

/// A control plane that lives entirely in memory. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct SimulatedControlPlane {
    inner: Arc<Mutex<SimState>>,
    latency: Duration,
}

impl SimulatedControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay applied to every submit and observe call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Script how the job with identity `id` behaves.
    pub async fn set_job_outcome(&self, id: impl Into<NodeId>, outcome: JobOutcome) {
        self.inner.lock().await.job_outcomes.insert(id.into(), outcome);
    }

    /// Refuse any submission of `id` with `reason`.
    pub async fn reject(&self, id: impl Into<NodeId>, reason: &str) {
        self.inner
            .lock()
            .await
            .rejections
            .insert(id.into(), reason.to_string());
    }

    /// Full event log, in sequence order.
    pub async fn events(&self) -> Vec<SimEvent> {
        self.inner.lock().await.log.clone()
    }

    /// Accepted submissions, in sequence order.
    pub async fn submissions(&self) -> Vec<SimEvent> {
        self.events()
            .await
            .into_iter()
            .filter(|e| e.event == SimEventKind::Submitted)
            .collect()
    }

    /// Sequence number of the first accepted submission of `id`.
    pub async fn submitted_seq(&self, id: &NodeId) -> Option<u64> {
        self.submissions()
            .await
            .iter()
            .find(|e| &e.node == id)
            .map(|e| e.seq)
    }

    /// Sequence number of the first observation of `id` matching `status`.
    pub async fn observed_seq(&self, id: &NodeId, status: &ObservedStatus) -> Option<u64> {
        self.inner
            .lock()
            .await
            .log
            .iter()
            .find(|e| &e.node == id && e.event == SimEventKind::Observed(status.clone()))
            .map(|e| e.seq)
    }
}

impl ControlPlane for SimulatedControlPlane {
    async fn submit(&self, node: &ResourceNode) -> Result<(), ControlPlaneError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let mut state = self.inner.lock().await;

        if let Some(reason) = state.rejections.get(node.id()).cloned() {
            state.record(node, SimEventKind::Rejected(reason.clone()));
            return Err(ControlPlaneError::Rejected(reason));
        }

        if node.kind() == ResourceKind::InitJob {
            let script = state
                .job_outcomes
                .get(node.id())
                .cloned()
                .unwrap_or_default()
                .script();
            state.jobs.insert(node.id().clone(), script);
        }

        state.accepted.insert(node.id().clone());
        state.record(node, SimEventKind::Submitted);
        debug!(node = %node.id(), "simulated submit accepted");
        Ok(())
    }

    async fn observe(&self, node: &ResourceNode) -> Result<ObservedStatus, ControlPlaneError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let mut state = self.inner.lock().await;

        let status = if !state.accepted.contains(node.id()) {
            ObservedStatus::Absent
        } else if let Some(script) = state.jobs.get_mut(node.id()) {
            // The last scripted status is sticky.
            if script.len() > 1 {
                script.pop_front().unwrap_or(ObservedStatus::Running)
            } else {
                script.front().cloned().unwrap_or(ObservedStatus::Running)
            }
        } else {
            ObservedStatus::Present
        };

        state.record(node, SimEventKind::Observed(status.clone()));
        Ok(status)
    }
}

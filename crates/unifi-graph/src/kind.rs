//! Resource kinds and their completion criteria.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The six resource kinds the stack provisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    Namespace,
    Secret,
    ConfigBundle,
    InitJob,
    VolumeClaim,
    Workload,
}

impl ResourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Namespace => "namespace",
            ResourceKind::Secret => "secret",
            ResourceKind::ConfigBundle => "config-bundle",
            ResourceKind::InitJob => "init-job",
            ResourceKind::VolumeClaim => "volume-claim",
            ResourceKind::Workload => "workload",
        }
    }

    /// What "done" means for this kind.
    pub fn readiness(&self) -> Readiness {
        match self {
            ResourceKind::InitJob => Readiness::JobSucceeded,
            ResourceKind::Namespace
            | ResourceKind::Secret
            | ResourceKind::ConfigBundle
            | ResourceKind::VolumeClaim
            | ResourceKind::Workload => Readiness::Exists,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Status of a submitted resource as reported by the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ObservedStatus {
    /// The control plane has no record of the object.
    Absent,
    /// The object exists. Terminal for non-job kinds.
    Present,
    /// A job whose pods have not yet exited successfully. Restarts under
    /// the job's own restart policy are reported as `Running`.
    Running,
    /// A job whose pod exited with status code 0.
    Succeeded,
    /// Permanently failed, e.g. a job whose restart budget is exhausted.
    Failed { reason: String },
}

/// Per-kind completion predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Ready as soon as the control plane confirms the object exists.
    Exists,
    /// Ready only on observed terminal success.
    JobSucceeded,
}

/// Outcome of evaluating an observation against a [`Readiness`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Ready,
    Waiting,
    Failed(String),
}

impl Readiness {
    pub fn evaluate(&self, status: &ObservedStatus) -> Verdict {
        match (self, status) {
            (_, ObservedStatus::Failed { reason }) => Verdict::Failed(reason.clone()),
            (_, ObservedStatus::Absent) => Verdict::Waiting,

            (Readiness::Exists, _) => Verdict::Ready,

            (Readiness::JobSucceeded, ObservedStatus::Succeeded) => Verdict::Ready,
            (Readiness::JobSucceeded, ObservedStatus::Present | ObservedStatus::Running) => {
                Verdict::Waiting
            }
        }
    }
}

//! unifi-provision — applies a resource graph to a control plane.
//!
//! The executor walks the graph in topological order, submitting a node
//! only once every dependency is Ready. Independent branches are driven
//! concurrently from a single task; waiting on a node (most notably the
//! database init job) only holds back its dependents.
//!
//! # Architecture
//!
//! ```text
//! Executor
//!   ├── ControlPlane (submit, observe)
//!   │   ├── KubectlControlPlane (kubectl apply / get)
//!   │   └── SimulatedControlPlane (scripted, in-memory)
//!   ├── StateTable (Pending → Submitted → Ready | Failed)
//!   └── ProvisioningReport (per-node outcome)
//! ```
//!
//! A failed node aborts its unsubmitted descendants. Nothing is rolled
//! back; submission errors are never retried here.

pub mod control_plane;
pub mod error;
pub mod executor;
pub mod kubectl;
pub mod report;
pub mod simulated;
pub mod state;

pub use control_plane::ControlPlane;
pub use error::{ControlPlaneError, ProvisioningError, ProvisioningResult};
pub use executor::{Executor, ExecutorSettings};
pub use kubectl::KubectlControlPlane;
pub use report::{Outcome, ProvisioningReport};
pub use simulated::{JobOutcome, SimEvent, SimEventKind, SimulatedControlPlane};
pub use state::{NodeRecord, NodeState, StateTable};

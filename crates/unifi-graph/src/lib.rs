//! unifi-graph — the UniFi stack as a resource graph.
//!
//! Resources are typed nodes in a small arena; dependency edges are
//! index sets. The graph is validated (no dangling references, no
//! duplicates, no cycles) before anything is handed to the executor.
//!
//! # Shape
//!
//! ```text
//!                    Namespace
//!        ┌──────────┬────┴─────┬─────────────┐
//!      Secret   ConfigBundle  VolumeClaim    │
//!        │           │           │           │
//!        │        InitJob ───────┼───────────┤
//!        └───────────┴───────────┴──── Workload
//! ```
//!
//! The workload waits on the init job's terminal success, not merely its
//! creation; see [`Readiness`].

pub mod error;
pub mod graph;
pub mod kind;
pub mod manifest;
pub mod spec;
pub mod stack;

pub use error::{GraphError, GraphResult};
pub use graph::{Graph, GraphBuilder, NodeId, ResourceNode};
pub use kind::{ObservedStatus, Readiness, ResourceKind, Verdict};
pub use manifest::ObjectRef;
pub use spec::*;
pub use stack::{InitScript, StackOutputs, build, node_ids, outputs};

//! Node arena, dependency edges and ordering.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::Serialize;

use crate::error::{GraphError, GraphResult};
use crate::kind::ResourceKind;
use crate::spec::ResourceSpec;

/// Logical identity of a node within the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A typed unit of desired state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceNode {
    id: NodeId,
    spec: ResourceSpec,
    depends_on: Vec<NodeId>,
}

impl ResourceNode {
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn kind(&self) -> ResourceKind {
        self.spec.kind()
    }

    pub fn spec(&self) -> &ResourceSpec {
        &self.spec
    }

    /// Identities this node depends on, in declaration order.
    pub fn depends_on(&self) -> &[NodeId] {
        &self.depends_on
    }
}

/// Collects node declarations and validates them into a [`Graph`].
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<ResourceNode>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a node. Dependencies are checked in [`GraphBuilder::build`].
    pub fn node<I>(&mut self, id: impl Into<NodeId>, spec: ResourceSpec, depends_on: I) -> NodeId
    where
        I: IntoIterator<Item = NodeId>,
    {
        let id = id.into();
        let mut deps: Vec<NodeId> = Vec::new();
        for dep in depends_on {
            if !deps.contains(&dep) {
                deps.push(dep);
            }
        }
        self.nodes.push(ResourceNode {
            id: id.clone(),
            spec,
            depends_on: deps,
        });
        id
    }

    /// Validate every edge and compute the submission order.
    pub fn build(self) -> GraphResult<Graph> {
        let mut index = HashMap::with_capacity(self.nodes.len());
        for (i, node) in self.nodes.iter().enumerate() {
            if index.insert(node.id.clone(), i).is_some() {
                return Err(GraphError::DuplicateNode(node.id.clone()));
            }
        }

        let mut dependencies = vec![Vec::new(); self.nodes.len()];
        let mut dependents = vec![Vec::new(); self.nodes.len()];
        for (i, node) in self.nodes.iter().enumerate() {
            for dep in &node.depends_on {
                let &d = index.get(dep).ok_or_else(|| GraphError::DanglingDependency {
                    node: node.id.clone(),
                    missing: dep.clone(),
                })?;
                dependencies[i].push(d);
                dependents[d].push(i);
            }
        }

        let order = topological_order(&dependencies, &dependents).map_err(|stuck| {
            GraphError::Cycle(stuck.into_iter().map(|i| self.nodes[i].id.clone()).collect())
        })?;

        Ok(Graph {
            nodes: self.nodes,
            index,
            dependencies,
            dependents,
            order,
        })
    }
}

/// A validated, acyclic resource graph.
#[derive(Debug, Clone)]
pub struct Graph {
    nodes: Vec<ResourceNode>,
    index: HashMap<NodeId, usize>,
    dependencies: Vec<Vec<usize>>,
    dependents: Vec<Vec<usize>>,
    order: Vec<usize>,
}

impl Graph {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in declaration order.
    pub fn nodes(&self) -> &[ResourceNode] {
        &self.nodes
    }

    pub fn node(&self, idx: usize) -> &ResourceNode {
        &self.nodes[idx]
    }

    pub fn index_of(&self, id: &NodeId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn get(&self, id: &NodeId) -> Option<&ResourceNode> {
        self.index_of(id).map(|i| &self.nodes[i])
    }

    /// First node of the given kind, in declaration order.
    pub fn find_kind(&self, kind: ResourceKind) -> Option<&ResourceNode> {
        self.nodes.iter().find(|n| n.kind() == kind)
    }

    pub fn dependencies(&self, idx: usize) -> &[usize] {
        &self.dependencies[idx]
    }

    pub fn dependents(&self, idx: usize) -> &[usize] {
        &self.dependents[idx]
    }

    /// Topological order by dependency layer; ties within a layer broken by
    /// declaration order.
    pub fn topological_order(&self) -> &[usize] {
        &self.order
    }

    /// Every node reachable through dependent edges from `idx`.
    pub fn descendants(&self, idx: usize) -> BTreeSet<usize> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<usize> = self.dependents[idx].clone();
        while let Some(next) = stack.pop() {
            if seen.insert(next) {
                stack.extend(self.dependents[next].iter().copied());
            }
        }
        seen
    }
}

/// Layered Kahn's algorithm. Each round emits the whole ready frontier in
/// declaration order, so a node never precedes anything from an earlier
/// layer. Returns the nodes left unordered on a cycle.
fn topological_order(
    dependencies: &[Vec<usize>],
    dependents: &[Vec<usize>],
) -> Result<Vec<usize>, Vec<usize>> {
    let mut remaining: Vec<usize> = dependencies.iter().map(Vec::len).collect();
    let mut frontier: BTreeSet<usize> = remaining
        .iter()
        .enumerate()
        .filter(|(_, n)| **n == 0)
        .map(|(i, _)| i)
        .collect();
    let mut order = Vec::with_capacity(dependencies.len());

    while !frontier.is_empty() {
        let mut next = BTreeSet::new();
        for i in frontier {
            order.push(i);
            for &d in &dependents[i] {
                remaining[d] -= 1;
                if remaining[d] == 0 {
                    next.insert(d);
                }
            }
        }
        frontier = next;
    }

    if order.len() == dependencies.len() {
        Ok(order)
    } else {
        Err((0..dependencies.len()).filter(|i| remaining[*i] > 0).collect())
    }
}

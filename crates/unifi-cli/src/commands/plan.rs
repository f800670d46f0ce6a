use serde::Serialize;

use unifi_config::{Source, keys};
use unifi_graph::{Graph, NodeId, ResourceKind, ResourceNode, StackOutputs};

use super::stack::{self, LoadedStack};
use crate::StackArgs;

const REDACTED_KEYS: &[&str] = &[keys::MONGO_ROOT_PASSWORD, keys::MONGO_PASSWORD];

#[derive(Debug, Serialize)]
pub struct Plan<'a> {
    /// Nodes in submission order.
    pub steps: Vec<PlanStep<'a>>,
    pub outputs: StackOutputs,
}

#[derive(Debug, Serialize)]
pub struct PlanStep<'a> {
    pub id: &'a NodeId,
    pub kind: ResourceKind,
    pub depends_on: &'a [NodeId],
    pub node: &'a ResourceNode,
}

pub fn build_plan(graph: &Graph) -> anyhow::Result<Plan<'_>> {
    let steps = graph
        .topological_order()
        .iter()
        .map(|&idx| {
            let node = graph.node(idx);
            PlanStep {
                id: node.id(),
                kind: node.kind(),
                depends_on: node.depends_on(),
                node,
            }
        })
        .collect();

    Ok(Plan {
        steps,
        outputs: unifi_graph::outputs(graph)?,
    })
}

pub fn plan(args: &StackArgs, json: bool, manifests: bool) -> anyhow::Result<()> {
    let loaded = stack::load(args)?;

    if manifests {
        for &idx in loaded.graph.topological_order() {
            for manifest in loaded.graph.node(idx).spec().manifests() {
                println!("{}", serde_json::to_string_pretty(&manifest)?);
            }
        }
        return Ok(());
    }

    let plan = build_plan(&loaded.graph)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_text(&loaded, &plan);
    }
    Ok(())
}

fn print_text(loaded: &LoadedStack, plan: &Plan<'_>) {
    println!("Parameters:");
    for (key, value) in loaded.config.iter() {
        let value = if REDACTED_KEYS.contains(&key) { "********" } else { value };
        let source = match loaded.config.source(key) {
            Some(Source::Explicit) => "explicit",
            Some(Source::Environment) => "environment",
            Some(Source::Default) | None => "default",
        };
        println!("  {key:<20} {value:<50} ({source})");
    }

    println!();
    println!("Secret fields: {}", loaded.secrets.names().collect::<Vec<_>>().join(", "));

    println!();
    println!("Submission order:");
    for (i, step) in plan.steps.iter().enumerate() {
        let deps: Vec<&str> = step.depends_on.iter().map(NodeId::as_str).collect();
        if deps.is_empty() {
            println!("  {}. {} ({})", i + 1, step.id, step.kind);
        } else {
            println!("  {}. {} ({}) after {}", i + 1, step.id, step.kind, deps.join(", "));
        }
    }

    println!();
    println!("Outputs:");
    println!("  namespace: {}", plan.outputs.namespace);
    println!("  service:   {}", plan.outputs.service);
}

use tokio::sync::watch;
use tracing::{info, warn};

use unifi_provision::{
    ControlPlane, Executor, KubectlControlPlane, NodeState, ProvisioningReport, SimulatedControlPlane,
};

use super::stack;
use crate::StackArgs;

pub async fn apply(
    args: &StackArgs,
    dry_run: bool,
    kubectl: String,
    context: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let loaded = stack::load(args)?;
    let outputs = unifi_graph::outputs(&loaded.graph)?;

    let report = if dry_run {
        info!("dry run: using the in-memory control plane");
        run(SimulatedControlPlane::new(), &loaded).await
    } else {
        let mut control_plane = KubectlControlPlane::new(kubectl);
        if let Some(ctx) = context {
            control_plane = control_plane.with_context(ctx);
        }
        run(control_plane, &loaded).await
    };

    if json {
        let body = serde_json::json!({ "report": report, "outputs": outputs });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        print_report(&report);
        if report.succeeded() {
            println!();
            println!("namespace: {}", outputs.namespace);
            println!("service:   {}", outputs.service);
        }
    }

    report.into_result()?;
    Ok(())
}

async fn run<C: ControlPlane>(control_plane: C, loaded: &stack::LoadedStack) -> ProvisioningReport {
    let executor = Executor::new(control_plane, loaded.settings.clone());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping");
            let _ = shutdown_tx.send(true);
        }
    });

    executor.provision_until(&loaded.graph, shutdown_rx).await
}

fn print_report(report: &ProvisioningReport) {
    for record in &report.nodes {
        let mark = match record.state {
            NodeState::Ready => "✓",
            NodeState::Failed => "✗",
            NodeState::Submitted => "…",
            NodeState::Pending => "-",
        };
        match &record.error {
            Some(e) => println!("{mark} {:<20} {:<12} {e}", record.id.as_str(), record.kind.label()),
            None => println!("{mark} {:<20} {}", record.id.as_str(), record.kind),
        }
    }
}

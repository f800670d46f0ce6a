//! Provisioning the full UniFi graph against the simulated control plane.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::watch;

use unifi_config::{PARAMETERS, keys, resolve};
use unifi_graph::{
    Graph, GraphBuilder, GraphError, InitScript, NamespaceSpec, NodeId, ObservedStatus, ResourceSpec,
    node_ids,
};
use unifi_provision::{
    Executor, ExecutorSettings, JobOutcome, NodeState, Outcome, ProvisioningError, ProvisioningReport,
    SimulatedControlPlane,
};

fn stack(pairs: &[(&str, &str)]) -> Graph {
    let explicit = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let cfg = resolve(PARAMETERS, &explicit, &HashMap::new()).unwrap();
    let secrets = unifi_secrets::materialize(&cfg).unwrap();
    unifi_graph::build(&cfg, &secrets, &InitScript::new("#!/bin/bash\nexit 0\n")).unwrap()
}

fn fast() -> ExecutorSettings {
    ExecutorSettings {
        poll_interval: Duration::from_millis(5),
        job_timeout: Some(Duration::from_secs(5)),
        resource_timeout: Duration::from_secs(5),
        max_observe_errors: 3,
    }
}

fn id(s: &str) -> NodeId {
    NodeId::from(s)
}

#[tokio::test]
async fn test_full_stack_provisions_in_dependency_order() {
    let graph = stack(&[(keys::NAMESPACE, "unifi-test")]);
    let cp = SimulatedControlPlane::new();
    cp.set_job_outcome(node_ids::DB_INIT_JOB, JobOutcome::SucceedsAfter { polls: 3 })
        .await;

    let executor = Executor::new(cp.clone(), fast());
    let report = executor.provision(&graph).await;

    assert_eq!(report.outcome, Outcome::Succeeded);
    assert!(report.nodes.iter().all(|r| r.state == NodeState::Ready));

    let ns = cp.submitted_seq(&id(node_ids::NAMESPACE)).await.unwrap();
    let secret = cp.submitted_seq(&id(node_ids::SECRET)).await.unwrap();
    let script = cp.submitted_seq(&id(node_ids::DB_INIT_SCRIPT)).await.unwrap();
    let claim = cp.submitted_seq(&id(node_ids::DATA)).await.unwrap();
    let job = cp.submitted_seq(&id(node_ids::DB_INIT_JOB)).await.unwrap();
    let app = cp.submitted_seq(&id(node_ids::APP)).await.unwrap();

    assert!(ns < secret && ns < script && ns < claim);
    assert!(secret < job && script < job && claim < job);
    assert!(secret < app && claim < app && job < app);

    // Every object was created in the requested namespace.
    for node in graph.nodes() {
        match node.spec() {
            ResourceSpec::Namespace(s) => assert_eq!(s.name, "unifi-test"),
            other => assert_eq!(other.namespace(), Some("unifi-test")),
        }
    }

    let ResourceSpec::VolumeClaim(claim) = graph.get(&id(node_ids::DATA)).unwrap().spec() else {
        panic!("expected volume claim");
    };
    assert_eq!(claim.storage_class, "truenas-hdd-mirror-nfs");
    assert_eq!(claim.size, "10Gi");

    let outputs = unifi_graph::outputs(&graph).unwrap();
    assert_eq!(outputs.namespace, "unifi-test");
    assert_eq!(outputs.service, "unifi");
}

#[tokio::test]
async fn test_workload_waits_for_job_success() {
    let graph = stack(&[]);
    let cp = SimulatedControlPlane::new();
    cp.set_job_outcome(node_ids::DB_INIT_JOB, JobOutcome::SucceedsAfter { polls: 5 })
        .await;

    let report = Executor::new(cp.clone(), fast()).provision(&graph).await;
    assert!(report.succeeded());

    let job_succeeded = cp
        .observed_seq(&id(node_ids::DB_INIT_JOB), &ObservedStatus::Succeeded)
        .await
        .unwrap();
    let app_submitted = cp.submitted_seq(&id(node_ids::APP)).await.unwrap();
    assert!(job_succeeded < app_submitted);

    let job = report.node(&id(node_ids::DB_INIT_JOB)).unwrap();
    let app = report.node(&id(node_ids::APP)).unwrap();
    assert!(job.ready_seq.unwrap() < app.submitted_seq.unwrap());
}

#[tokio::test]
async fn test_job_failure_leaves_workload_unsubmitted() {
    let graph = stack(&[]);
    let cp = SimulatedControlPlane::new();
    cp.set_job_outcome(
        node_ids::DB_INIT_JOB,
        JobOutcome::FailsEveryAttempt { restarts: 2 },
    )
    .await;

    let report = Executor::new(cp.clone(), fast()).provision(&graph).await;

    assert_eq!(report.outcome, Outcome::Failed);
    assert_eq!(report.state_of(&id(node_ids::DB_INIT_JOB)), Some(NodeState::Failed));
    assert_eq!(report.state_of(&id(node_ids::APP)), Some(NodeState::Pending));
    assert_eq!(cp.submitted_seq(&id(node_ids::APP)).await, None);

    // Independent branches still finished.
    for ready in [node_ids::NAMESPACE, node_ids::SECRET, node_ids::DATA] {
        assert_eq!(report.state_of(&id(ready)), Some(NodeState::Ready), "{ready}");
    }

    let skipped: Vec<_> = report.skipped_nodes().map(|r| r.id.to_string()).collect();
    assert_eq!(skipped, [node_ids::APP]);

    match report.into_result().unwrap_err() {
        ProvisioningError::Failed { node, reason, .. } => {
            assert_eq!(node, id(node_ids::DB_INIT_JOB));
            assert!(reason.starts_with("BackoffLimitExceeded"), "{reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_rejection_skips_descendants_only() {
    let graph = stack(&[]);
    let cp = SimulatedControlPlane::new();
    cp.reject(node_ids::DATA, "storage class not found").await;

    let report = Executor::new(cp.clone(), fast()).provision(&graph).await;

    assert_eq!(report.outcome, Outcome::Failed);
    assert_eq!(report.state_of(&id(node_ids::DATA)), Some(NodeState::Failed));
    assert_eq!(report.state_of(&id(node_ids::DB_INIT_JOB)), Some(NodeState::Ready));
    assert_eq!(report.state_of(&id(node_ids::APP)), Some(NodeState::Pending));
    assert_eq!(cp.submitted_seq(&id(node_ids::APP)).await, None);

    let data = report.node(&id(node_ids::DATA)).unwrap();
    assert!(matches!(data.error, Some(ProvisioningError::Rejected { .. })));

    let app = report.node(&id(node_ids::APP)).unwrap();
    assert_eq!(
        app.error,
        Some(ProvisioningError::DependencyFailed {
            node: id(node_ids::APP),
            kind: app.kind,
            dependency: id(node_ids::DATA),
        })
    );
}

#[tokio::test]
async fn test_hung_job_times_out() {
    let graph = stack(&[]);
    let cp = SimulatedControlPlane::new();
    cp.set_job_outcome(node_ids::DB_INIT_JOB, JobOutcome::Hangs).await;

    let settings = ExecutorSettings {
        job_timeout: Some(Duration::from_millis(50)),
        ..fast()
    };
    let report = Executor::new(cp.clone(), settings).provision(&graph).await;

    assert_eq!(report.outcome, Outcome::Failed);
    let job = report.node(&id(node_ids::DB_INIT_JOB)).unwrap();
    assert_eq!(job.state, NodeState::Failed);
    assert!(matches!(job.error, Some(ProvisioningError::Timeout { .. })));
    assert_eq!(cp.submitted_seq(&id(node_ids::APP)).await, None);
}

#[tokio::test]
async fn test_cancellation_stops_before_workload() {
    let graph = stack(&[]);
    let cp = SimulatedControlPlane::new();
    cp.set_job_outcome(node_ids::DB_INIT_JOB, JobOutcome::Hangs).await;

    let settings = ExecutorSettings {
        job_timeout: None,
        ..fast()
    };
    let executor = Executor::new(cp.clone(), settings);
    let (tx, rx) = watch::channel(false);

    let cancel = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(true).unwrap();
    };
    let (report, ()) = tokio::join!(executor.provision_until(&graph, rx), cancel);

    assert_eq!(report.outcome, Outcome::Cancelled);
    assert_eq!(report.state_of(&id(node_ids::DB_INIT_JOB)), Some(NodeState::Submitted));
    assert_eq!(report.state_of(&id(node_ids::APP)), Some(NodeState::Pending));
    assert_eq!(cp.submitted_seq(&id(node_ids::APP)).await, None);
    assert_eq!(report.into_result().unwrap_err(), ProvisioningError::Cancelled);
}

/// Build, then provision only if the graph is valid.
async fn build_and_provision(
    builder: GraphBuilder,
    cp: &SimulatedControlPlane,
) -> Result<ProvisioningReport, GraphError> {
    let graph = builder.build()?;
    Ok(Executor::new(cp.clone(), fast()).provision(&graph).await)
}

#[tokio::test]
async fn test_dangling_graph_never_reaches_control_plane() {
    let mut b = GraphBuilder::new();
    b.node(
        "ns",
        ResourceSpec::Namespace(NamespaceSpec {
            name: "unifi".to_string(),
        }),
        [],
    );
    b.node(
        "app",
        ResourceSpec::Namespace(NamespaceSpec {
            name: "other".to_string(),
        }),
        [id("missing")],
    );

    let cp = SimulatedControlPlane::new();
    let err = build_and_provision(b, &cp).await.unwrap_err();

    assert!(matches!(err, GraphError::DanglingDependency { .. }));
    assert!(cp.events().await.is_empty());
}

#[tokio::test]
async fn test_valid_graph_reaches_control_plane() {
    let mut b = GraphBuilder::new();
    b.node(
        "ns",
        ResourceSpec::Namespace(NamespaceSpec {
            name: "unifi".to_string(),
        }),
        [],
    );

    let cp = SimulatedControlPlane::new();
    let report = build_and_provision(b, &cp).await.unwrap();

    assert!(report.succeeded());
    assert_eq!(cp.submissions().await.len(), 1);
}

#[tokio::test]
async fn test_hung_submit_times_out() {
    let graph = stack(&[]);
    let cp = SimulatedControlPlane::new().with_latency(Duration::from_secs(5));

    let settings = ExecutorSettings {
        resource_timeout: Duration::from_millis(50),
        ..fast()
    };
    let report = tokio::time::timeout(
        Duration::from_secs(2),
        Executor::new(cp.clone(), settings).provision(&graph),
    )
    .await
    .expect("submit must be bounded by the resource timeout");

    assert_eq!(report.outcome, Outcome::Failed);
    let ns = report.node(&id(node_ids::NAMESPACE)).unwrap();
    assert_eq!(ns.state, NodeState::Failed);
    assert!(matches!(ns.error, Some(ProvisioningError::Timeout { .. })));
    assert!(cp.submissions().await.is_empty());
    assert_eq!(report.skipped_nodes().count(), graph.len() - 1);
}

#[tokio::test]
async fn test_slow_control_plane_still_orders_submissions() {
    let graph = stack(&[]);
    let cp = SimulatedControlPlane::new().with_latency(Duration::from_millis(2));

    let report = Executor::new(cp.clone(), fast()).provision(&graph).await;
    assert!(report.succeeded());

    let submissions = cp.submissions().await;
    assert_eq!(submissions.len(), graph.len());
    assert_eq!(submissions[0].node, id(node_ids::NAMESPACE));
    assert_eq!(submissions.last().unwrap().node, id(node_ids::APP));
}

//! The UniFi stack: six nodes, five dependency edges.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use unifi_config::{ResolvedConfig, keys};
use unifi_secrets::SecretBundle;

use crate::error::{GraphError, GraphResult};
use crate::graph::{Graph, GraphBuilder, NodeId};
use crate::kind::ResourceKind;
use crate::spec::*;

/// Logical node identities.
pub mod node_ids {
    pub const NAMESPACE: &str = "namespace";
    pub const SECRET: &str = "unifi-secret";
    pub const DB_INIT_SCRIPT: &str = "unifi-db-init";
    pub const DB_INIT_JOB: &str = "unifi-db-init-job";
    pub const DATA: &str = "unifi-data";
    pub const APP: &str = "unifi";
}

const SECRET_NAME: &str = "unifi-secret-v3";
const SCRIPT_BUNDLE_NAME: &str = "unifi-db-init";
const JOB_NAME: &str = "unifi-db-init-job-v3";
const CLAIM_NAME: &str = "unifi-data";
const APP_NAME: &str = "unifi";
const SCRIPT_MOUNT: &str = "/scripts";
const DATA_MOUNT: &str = "/config";

/// The opaque database initialization script, shipped as configuration
/// data and executed by the init job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitScript {
    pub file_name: String,
    pub contents: String,
}

impl InitScript {
    pub const DEFAULT_FILE_NAME: &'static str = "init-unifi-db.sh";

    pub fn new(contents: impl Into<String>) -> Self {
        Self {
            file_name: Self::DEFAULT_FILE_NAME.to_string(),
            contents: contents.into(),
        }
    }
}

/// Values exported after a successful apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackOutputs {
    pub namespace: String,
    pub service: String,
}

/// Build the UniFi resource graph from resolved configuration and the
/// materialized credentials.
pub fn build(cfg: &ResolvedConfig, secrets: &SecretBundle, script: &InitScript) -> GraphResult<Graph> {
    let ns = cfg.require(keys::NAMESPACE)?;
    let mut b = GraphBuilder::new();

    let namespace = b.node(
        node_ids::NAMESPACE,
        ResourceSpec::Namespace(NamespaceSpec {
            name: ns.to_string(),
        }),
        [],
    );

    let secret = b.node(
        node_ids::SECRET,
        ResourceSpec::Secret(SecretSpec {
            name: SECRET_NAME.to_string(),
            namespace: ns.to_string(),
            string_data: secrets.to_string_data(),
        }),
        [namespace.clone()],
    );

    let script_bundle = b.node(
        node_ids::DB_INIT_SCRIPT,
        ResourceSpec::ConfigBundle(ConfigBundleSpec {
            name: SCRIPT_BUNDLE_NAME.to_string(),
            namespace: ns.to_string(),
            files: BTreeMap::from([(script.file_name.clone(), script.contents.clone())]),
        }),
        [namespace.clone()],
    );

    let init_job = b.node(
        node_ids::DB_INIT_JOB,
        ResourceSpec::InitJob(init_job_spec(cfg, ns, script)?),
        [namespace.clone(), script_bundle],
    );

    let claim = b.node(
        node_ids::DATA,
        ResourceSpec::VolumeClaim(VolumeClaimSpec {
            name: CLAIM_NAME.to_string(),
            namespace: ns.to_string(),
            storage_class: cfg.require(keys::STORAGE_CLASS)?.to_string(),
            size: cfg.require(keys::DATA_SIZE)?.to_string(),
            access_modes: vec!["ReadWriteOnce".to_string()],
        }),
        [namespace.clone()],
    );

    b.node(
        node_ids::APP,
        ResourceSpec::Workload(workload_spec(cfg, ns)?),
        [namespace, secret, claim, init_job],
    );

    let graph = b.build()?;
    debug!(nodes = graph.len(), namespace = %ns, "resource graph built");
    Ok(graph)
}

fn init_job_spec(cfg: &ResolvedConfig, ns: &str, script: &InitScript) -> GraphResult<InitJobSpec> {
    Ok(InitJobSpec {
        name: JOB_NAME.to_string(),
        namespace: ns.to_string(),
        container: "mongo-init".to_string(),
        image: cfg.require(keys::MONGO_IMAGE)?.to_string(),
        command: vec!["/bin/bash".to_string()],
        args: vec![format!("{SCRIPT_MOUNT}/{}", script.file_name)],
        env: vec![
            EnvVar::new("MONGODB_ROOT_USERNAME", cfg.require(keys::MONGO_ROOT_USERNAME)?),
            EnvVar::new("MONGODB_ROOT_PASSWORD", cfg.require(keys::MONGO_ROOT_PASSWORD)?),
        ],
        env_from_secret: SECRET_NAME.to_string(),
        script_bundle: SCRIPT_BUNDLE_NAME.to_string(),
        mount_path: SCRIPT_MOUNT.to_string(),
        restart_policy: RestartPolicy::OnFailure,
    })
}

fn workload_spec(cfg: &ResolvedConfig, ns: &str) -> GraphResult<WorkloadSpec> {
    let port = |name: &str, number: u16| PortSpec {
        name: name.to_string(),
        container_port: number,
        service_port: number,
    };

    Ok(WorkloadSpec {
        name: APP_NAME.to_string(),
        namespace: ns.to_string(),
        image: cfg.require(keys::IMAGE)?.to_string(),
        ports: vec![
            port("https", 8443),
            port("http", 8080),
            port("stun", 3478),
            port("discovery", 10001),
        ],
        env: vec![
            EnvVar::new("PUID", cfg.require(keys::PUID)?),
            EnvVar::new("PGID", cfg.require(keys::PGID)?),
            EnvVar::new("TZ", cfg.require(keys::TIMEZONE)?),
            EnvVar::new("MEM_LIMIT", cfg.require(keys::MEM_LIMIT)?),
            EnvVar::new("MEM_STARTUP", cfg.require(keys::MEM_STARTUP)?),
        ],
        env_from_secret: SECRET_NAME.to_string(),
        volume_claim: CLAIM_NAME.to_string(),
        mount_path: DATA_MOUNT.to_string(),
        resources: ResourceRequirements {
            requests: Compute {
                cpu: cfg.require(keys::CPU)?.to_string(),
                memory: cfg.require(keys::MEMORY)?.to_string(),
            },
            limits: Compute {
                cpu: cfg.require(keys::CPU_LIMIT)?.to_string(),
                memory: cfg.require(keys::MEMORY_LIMIT)?.to_string(),
            },
        },
        service_type: cfg.require(keys::SERVICE_TYPE)?.to_string(),
        service_annotations: BTreeMap::new(),
    })
}

/// The resolved namespace and the workload's service name.
pub fn outputs(graph: &Graph) -> GraphResult<StackOutputs> {
    let namespace = graph
        .find_kind(ResourceKind::Namespace)
        .ok_or(GraphError::MissingKind(ResourceKind::Namespace))?;
    let workload = graph
        .find_kind(ResourceKind::Workload)
        .ok_or(GraphError::MissingKind(ResourceKind::Workload))?;

    Ok(StackOutputs {
        namespace: namespace.spec().name().to_string(),
        service: workload.spec().name().to_string(),
    })
}

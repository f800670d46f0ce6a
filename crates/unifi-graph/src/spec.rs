//! Resource payloads. Immutable once the graph is built.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::kind::ResourceKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

/// A port exposed by the workload and its service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortSpec {
    pub name: String,
    pub container_port: u16,
    pub service_port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Compute {
    pub cpu: String,
    pub memory: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceRequirements {
    pub requests: Compute,
    pub limits: Compute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RestartPolicy {
    OnFailure,
    Never,
}

impl RestartPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestartPolicy::OnFailure => "OnFailure",
            RestartPolicy::Never => "Never",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamespaceSpec {
    pub name: String,
}

#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct SecretSpec {
    pub name: String,
    pub namespace: String,
    #[serde(skip_serializing)]
    pub string_data: BTreeMap<String, String>,
}

impl fmt::Debug for SecretSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretSpec")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("keys", &self.string_data.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Files shipped to the cluster as configuration data (a ConfigMap).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigBundleSpec {
    pub name: String,
    pub namespace: String,
    pub files: BTreeMap<String, String>,
}

/// The one-shot database initialization job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitJobSpec {
    pub name: String,
    pub namespace: String,
    pub container: String,
    pub image: String,
    pub command: Vec<String>,
    pub args: Vec<String>,
    pub env: Vec<EnvVar>,
    /// Secret whose keys are injected as environment variables.
    pub env_from_secret: String,
    /// Config bundle mounted at `mount_path`.
    pub script_bundle: String,
    pub mount_path: String,
    pub restart_policy: RestartPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeClaimSpec {
    pub name: String,
    pub namespace: String,
    pub storage_class: String,
    pub size: String,
    pub access_modes: Vec<String>,
}

/// The long-running application and the service that exposes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkloadSpec {
    pub name: String,
    pub namespace: String,
    pub image: String,
    pub ports: Vec<PortSpec>,
    pub env: Vec<EnvVar>,
    pub env_from_secret: String,
    pub volume_claim: String,
    pub mount_path: String,
    pub resources: ResourceRequirements,
    pub service_type: String,
    pub service_annotations: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "spec")]
pub enum ResourceSpec {
    Namespace(NamespaceSpec),
    Secret(SecretSpec),
    ConfigBundle(ConfigBundleSpec),
    InitJob(InitJobSpec),
    VolumeClaim(VolumeClaimSpec),
    Workload(WorkloadSpec),
}

impl ResourceSpec {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceSpec::Namespace(_) => ResourceKind::Namespace,
            ResourceSpec::Secret(_) => ResourceKind::Secret,
            ResourceSpec::ConfigBundle(_) => ResourceKind::ConfigBundle,
            ResourceSpec::InitJob(_) => ResourceKind::InitJob,
            ResourceSpec::VolumeClaim(_) => ResourceKind::VolumeClaim,
            ResourceSpec::Workload(_) => ResourceKind::Workload,
        }
    }

    /// Object name in the control plane.
    pub fn name(&self) -> &str {
        match self {
            ResourceSpec::Namespace(s) => &s.name,
            ResourceSpec::Secret(s) => &s.name,
            ResourceSpec::ConfigBundle(s) => &s.name,
            ResourceSpec::InitJob(s) => &s.name,
            ResourceSpec::VolumeClaim(s) => &s.name,
            ResourceSpec::Workload(s) => &s.name,
        }
    }

    /// Namespace the object lives in. `None` for the namespace itself.
    pub fn namespace(&self) -> Option<&str> {
        match self {
            ResourceSpec::Namespace(_) => None,
            ResourceSpec::Secret(s) => Some(&s.namespace),
            ResourceSpec::ConfigBundle(s) => Some(&s.namespace),
            ResourceSpec::InitJob(s) => Some(&s.namespace),
            ResourceSpec::VolumeClaim(s) => Some(&s.namespace),
            ResourceSpec::Workload(s) => Some(&s.namespace),
        }
    }
}

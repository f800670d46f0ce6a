//! Rendering resource payloads as control-plane manifests.

use serde_json::{Value, json};

use crate::spec::*;

const APP_LABEL: &str = "app.kubernetes.io/name";

/// The object a control plane should be asked about when observing a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    /// API kind, e.g. `Job`.
    pub kind: &'static str,
    pub name: String,
    pub namespace: Option<String>,
}

impl ResourceSpec {
    /// Manifests to apply for this resource, in apply order.
    pub fn manifests(&self) -> Vec<Value> {
        match self {
            ResourceSpec::Namespace(s) => vec![namespace_manifest(s)],
            ResourceSpec::Secret(s) => vec![secret_manifest(s)],
            ResourceSpec::ConfigBundle(s) => vec![config_map_manifest(s)],
            ResourceSpec::InitJob(s) => vec![job_manifest(s)],
            ResourceSpec::VolumeClaim(s) => vec![pvc_manifest(s)],
            ResourceSpec::Workload(s) => vec![deployment_manifest(s), service_manifest(s)],
        }
    }

    /// The object whose status decides this node's readiness.
    pub fn primary_object(&self) -> ObjectRef {
        let kind = match self {
            ResourceSpec::Namespace(_) => "Namespace",
            ResourceSpec::Secret(_) => "Secret",
            ResourceSpec::ConfigBundle(_) => "ConfigMap",
            ResourceSpec::InitJob(_) => "Job",
            ResourceSpec::VolumeClaim(_) => "PersistentVolumeClaim",
            ResourceSpec::Workload(_) => "Deployment",
        };
        ObjectRef {
            kind,
            name: self.name().to_string(),
            namespace: self.namespace().map(str::to_string),
        }
    }
}

fn metadata(name: &str, namespace: &str) -> Value {
    json!({ "name": name, "namespace": namespace })
}

fn env_list(env: &[EnvVar]) -> Vec<Value> {
    env.iter()
        .map(|e| json!({ "name": e.name, "value": e.value }))
        .collect()
}

fn namespace_manifest(s: &NamespaceSpec) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": { "name": s.name },
    })
}

fn secret_manifest(s: &SecretSpec) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "metadata": metadata(&s.name, &s.namespace),
        "type": "Opaque",
        "stringData": s.string_data,
    })
}

fn config_map_manifest(s: &ConfigBundleSpec) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": metadata(&s.name, &s.namespace),
        "data": s.files,
    })
}

fn job_manifest(s: &InitJobSpec) -> Value {
    json!({
        "apiVersion": "batch/v1",
        "kind": "Job",
        "metadata": metadata(&s.name, &s.namespace),
        "spec": {
            "template": {
                "spec": {
                    "restartPolicy": s.restart_policy.as_str(),
                    "containers": [{
                        "name": s.container,
                        "image": s.image,
                        "command": s.command,
                        "args": s.args,
                        "env": env_list(&s.env),
                        "envFrom": [{ "secretRef": { "name": s.env_from_secret } }],
                        "volumeMounts": [{ "name": "init-script", "mountPath": s.mount_path }],
                    }],
                    "volumes": [{
                        "name": "init-script",
                        "configMap": { "name": s.script_bundle },
                    }],
                },
            },
        },
    })
}

fn pvc_manifest(s: &VolumeClaimSpec) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "PersistentVolumeClaim",
        "metadata": metadata(&s.name, &s.namespace),
        "spec": {
            "accessModes": s.access_modes,
            "storageClassName": s.storage_class,
            "resources": { "requests": { "storage": s.size } },
        },
    })
}

fn deployment_manifest(s: &WorkloadSpec) -> Value {
    let ports: Vec<Value> = s
        .ports
        .iter()
        .map(|p| json!({ "name": p.name, "containerPort": p.container_port }))
        .collect();

    json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": metadata(&s.name, &s.namespace),
        "spec": {
            "replicas": 1,
            "selector": { "matchLabels": { APP_LABEL: s.name } },
            "template": {
                "metadata": { "labels": { APP_LABEL: s.name } },
                "spec": {
                    "containers": [{
                        "name": s.name,
                        "image": s.image,
                        "ports": ports,
                        "env": env_list(&s.env),
                        "envFrom": [{ "secretRef": { "name": s.env_from_secret } }],
                        "volumeMounts": [{ "name": "data", "mountPath": s.mount_path }],
                        "resources": {
                            "requests": {
                                "cpu": s.resources.requests.cpu,
                                "memory": s.resources.requests.memory,
                            },
                            "limits": {
                                "cpu": s.resources.limits.cpu,
                                "memory": s.resources.limits.memory,
                            },
                        },
                    }],
                    "volumes": [{
                        "name": "data",
                        "persistentVolumeClaim": { "claimName": s.volume_claim },
                    }],
                },
            },
        },
    })
}

fn service_manifest(s: &WorkloadSpec) -> Value {
    let ports: Vec<Value> = s
        .ports
        .iter()
        .map(|p| json!({ "name": p.name, "port": p.service_port, "targetPort": p.container_port }))
        .collect();

    json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": {
            "name": s.name,
            "namespace": s.namespace,
            "annotations": s.service_annotations,
        },
        "spec": {
            "type": s.service_type,
            "selector": { APP_LABEL: s.name },
            "ports": ports,
        },
    })
}

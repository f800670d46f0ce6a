//! Control plane backed by the `kubectl` binary.
//!
//! Manifests are piped to `kubectl apply -f -` as JSON; status is read
//! back with `kubectl get -o json`.

use std::process::Stdio;

use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use unifi_graph::{ObjectRef, ObservedStatus, ResourceKind, ResourceNode};

use crate::control_plane::ControlPlane;
use crate::error::ControlPlaneError;

#[derive(Debug, Clone)]
pub struct KubectlControlPlane {
    program: String,
    context: Option<String>,
}

impl Default for KubectlControlPlane {
    fn default() -> Self {
        Self::new("kubectl")
    }
}

impl KubectlControlPlane {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            context: None,
        }
    }

    /// Target a specific kubeconfig context instead of the current one.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        if let Some(ctx) = &self.context {
            cmd.arg("--context").arg(ctx);
        }
        cmd.kill_on_drop(true);
        cmd
    }

    async fn apply(&self, manifest: &Value) -> Result<(), ControlPlaneError> {
        let body = serde_json::to_vec(manifest)
            .map_err(|e| ControlPlaneError::InvalidResponse(e.to_string()))?;

        let mut child = self
            .command()
            .args(["apply", "-f", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ControlPlaneError::Unavailable(format!("{}: {e}", self.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&body)
                .await
                .map_err(|e| ControlPlaneError::Unavailable(e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ControlPlaneError::Unavailable(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ControlPlaneError::Rejected(stderr));
        }

        debug!(stdout = %String::from_utf8_lossy(&output.stdout).trim(), "kubectl apply");
        Ok(())
    }

    async fn get(&self, object: &ObjectRef) -> Result<Option<Value>, ControlPlaneError> {
        let mut cmd = self.command();
        cmd.arg("get")
            .arg(object.kind.to_lowercase())
            .arg(&object.name)
            .args(["-o", "json"]);
        if let Some(ns) = &object.namespace {
            cmd.arg("-n").arg(ns);
        }

        let output = cmd
            .output()
            .await
            .map_err(|e| ControlPlaneError::Unavailable(format!("{}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("NotFound") {
                return Ok(None);
            }
            return Err(ControlPlaneError::Unavailable(stderr.trim().to_string()));
        }

        serde_json::from_slice(&output.stdout)
            .map(Some)
            .map_err(|e| ControlPlaneError::InvalidResponse(e.to_string()))
    }
}

impl ControlPlane for KubectlControlPlane {
    async fn submit(&self, node: &ResourceNode) -> Result<(), ControlPlaneError> {
        for manifest in node.spec().manifests() {
            self.apply(&manifest).await?;
        }
        Ok(())
    }

    async fn observe(&self, node: &ResourceNode) -> Result<ObservedStatus, ControlPlaneError> {
        let object = node.spec().primary_object();
        let Some(value) = self.get(&object).await? else {
            return Ok(ObservedStatus::Absent);
        };

        Ok(match node.kind() {
            ResourceKind::InitJob => job_status(&value),
            _ => ObservedStatus::Present,
        })
    }
}

/// Interpret a `batch/v1` Job object's status.
///
/// Succeeded once any pod completed or the `Complete` condition is true;
/// failed when the `Failed` condition is true (the backoff limit was
/// exhausted); running otherwise.
pub fn job_status(job: &Value) -> ObservedStatus {
    let status = &job["status"];

    if status["succeeded"].as_u64().unwrap_or(0) >= 1 || condition(status, "Complete").is_some() {
        return ObservedStatus::Succeeded;
    }

    if let Some(failed) = condition(status, "Failed") {
        let reason = failed["reason"].as_str().unwrap_or("Failed");
        let reason = match failed["message"].as_str() {
            Some(msg) => format!("{reason}: {msg}"),
            None => reason.to_string(),
        };
        return ObservedStatus::Failed { reason };
    }

    ObservedStatus::Running
}

fn condition<'a>(status: &'a Value, kind: &str) -> Option<&'a Value> {
    status["conditions"]
        .as_array()?
        .iter()
        .find(|c| c["type"] == kind && c["status"] == "True")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fresh_job_is_running() {
        assert_eq!(job_status(&json!({ "status": {} })), ObservedStatus::Running);
        assert_eq!(job_status(&json!({})), ObservedStatus::Running);
    }

    #[test]
    fn job_with_failed_pods_but_no_condition_is_running() {
        let job = json!({ "status": { "active": 1, "failed": 3 } });
        assert_eq!(job_status(&job), ObservedStatus::Running);
    }

    #[test]
    fn succeeded_count_wins() {
        let job = json!({ "status": { "succeeded": 1, "failed": 2 } });
        assert_eq!(job_status(&job), ObservedStatus::Succeeded);
    }

    #[test]
    fn complete_condition() {
        let job = json!({
            "status": { "conditions": [{ "type": "Complete", "status": "True" }] }
        });
        assert_eq!(job_status(&job), ObservedStatus::Succeeded);
    }

    #[test]
    fn failed_condition_carries_reason() {
        let job = json!({
            "status": {
                "failed": 6,
                "conditions": [{
                    "type": "Failed",
                    "status": "True",
                    "reason": "BackoffLimitExceeded",
                    "message": "Job has reached the specified backoff limit",
                }],
            }
        });
        assert_eq!(
            job_status(&job),
            ObservedStatus::Failed {
                reason: "BackoffLimitExceeded: Job has reached the specified backoff limit"
                    .to_string()
            }
        );
    }

    #[test]
    fn false_conditions_are_ignored() {
        let job = json!({
            "status": { "conditions": [{ "type": "Failed", "status": "False" }] }
        });
        assert_eq!(job_status(&job), ObservedStatus::Running);
    }

    #[test]
    fn context_is_passed_first() {
        let cp = KubectlControlPlane::default().with_context("homelab");
        let cmd = cp.command();
        let args: Vec<_> = cmd.as_std().get_args().collect();
        assert_eq!(args, ["--context", "homelab"]);
    }
}

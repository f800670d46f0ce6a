//! Stack file parser.
//!
//! ```toml
//! [config]
//! namespace = "unifi-test"
//! dataSize = "20Gi"
//!
//! [provision]
//! poll_interval = "2s"
//! job_timeout = "10m"
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::duration::parse_duration;
use crate::error::{ConfigError, ConfigResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StackFile {
    /// Explicit parameter values, keyed by parameter key.
    #[serde(default)]
    pub config: BTreeMap<String, toml::Value>,
    pub provision: Option<ProvisionSection>,
}

/// Executor tuning knobs. All values are duration strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvisionSection {
    pub poll_interval: Option<String>,
    /// Upper bound on waiting for the init job. "0" defers entirely to the
    /// control plane's restart policy.
    pub job_timeout: Option<String>,
    pub resource_timeout: Option<String>,
}

impl StackFile {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let stack: StackFile = toml::from_str(&content)?;
        Ok(stack)
    }

    /// Explicit parameters from the file with `key=value` overrides applied
    /// on top.
    pub fn explicit_parameters(&self, overrides: &[String]) -> ConfigResult<BTreeMap<String, String>> {
        let mut explicit: BTreeMap<String, String> = self
            .config
            .iter()
            .map(|(k, v)| (k.clone(), scalar_to_string(v)))
            .collect();

        for raw in overrides {
            let (key, value) = parse_override(raw)?;
            explicit.insert(key, value);
        }

        Ok(explicit)
    }
}

impl ProvisionSection {
    pub fn poll_interval(&self) -> ConfigResult<Option<Duration>> {
        parse_field("poll_interval", self.poll_interval.as_deref())
    }

    pub fn job_timeout(&self) -> ConfigResult<Option<Duration>> {
        parse_field("job_timeout", self.job_timeout.as_deref())
    }

    pub fn resource_timeout(&self) -> ConfigResult<Option<Duration>> {
        parse_field("resource_timeout", self.resource_timeout.as_deref())
    }
}

/// Split a `key=value` override. The value may itself contain `=`.
pub fn parse_override(raw: &str) -> ConfigResult<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(ConfigError::InvalidOverride(raw.to_string())),
    }
}

fn parse_field(field: &str, value: Option<&str>) -> ConfigResult<Option<Duration>> {
    value
        .map(|v| {
            parse_duration(v).ok_or_else(|| ConfigError::InvalidDuration {
                field: field.to_string(),
                value: v.to_string(),
            })
        })
        .transpose()
}

fn scalar_to_string(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_minimal() {
        let stack: StackFile = toml::from_str("").unwrap();
        assert!(stack.config.is_empty());
        assert!(stack.provision.is_none());
    }

    #[test]
    fn parse_full_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[config]
namespace = "unifi-test"
memLimit = 2048

[provision]
poll_interval = "500ms"
job_timeout = "10m"
"#
        )
        .unwrap();

        let stack = StackFile::from_file(file.path()).unwrap();
        let explicit = stack.explicit_parameters(&[]).unwrap();
        assert_eq!(explicit["namespace"], "unifi-test");
        assert_eq!(explicit["memLimit"], "2048");

        let provision = stack.provision.unwrap();
        assert_eq!(
            provision.poll_interval().unwrap(),
            Some(Duration::from_millis(500))
        );
        assert_eq!(provision.job_timeout().unwrap(), Some(Duration::from_secs(600)));
        assert_eq!(provision.resource_timeout().unwrap(), None);
    }

    #[test]
    fn overrides_win_over_file() {
        let stack: StackFile = toml::from_str(
            r#"
[config]
namespace = "from-file"
"#,
        )
        .unwrap();

        let explicit = stack
            .explicit_parameters(&["namespace=from-cli".to_string(), "timezone=UTC".to_string()])
            .unwrap();
        assert_eq!(explicit["namespace"], "from-cli");
        assert_eq!(explicit["timezone"], "UTC");
    }

    #[test]
    fn override_value_may_contain_equals() {
        assert_eq!(
            parse_override("mongoPassword=a=b").unwrap(),
            ("mongoPassword".to_string(), "a=b".to_string())
        );
        assert!(parse_override("novalue").is_err());
        assert!(parse_override("=x").is_err());
    }

    #[test]
    fn invalid_duration_is_reported() {
        let section = ProvisionSection {
            job_timeout: Some("forever".to_string()),
            ..Default::default()
        };
        assert_eq!(
            section.job_timeout().unwrap_err(),
            ConfigError::InvalidDuration {
                field: "job_timeout".to_string(),
                value: "forever".to_string(),
            }
        );
    }

    #[test]
    fn overflowing_duration_is_reported() {
        let section = ProvisionSection {
            poll_interval: Some("307445734561825862m".to_string()),
            ..Default::default()
        };
        assert_eq!(
            section.poll_interval().unwrap_err(),
            ConfigError::InvalidDuration {
                field: "poll_interval".to_string(),
                value: "307445734561825862m".to_string(),
            }
        );
    }
}

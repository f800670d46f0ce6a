//! Layered parameter resolution.
//!
//! For each recognized parameter the first non-empty value wins:
//! explicit, then environment, then the built-in default.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::params::Parameter;

/// Which layer supplied a resolved value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Explicit,
    Environment,
    Default,
}

/// A single resolved value and where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedValue {
    pub value: String,
    pub source: Source,
}

/// The immutable, fully-resolved parameter set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedConfig {
    values: BTreeMap<String, ResolvedValue>,
}

impl ResolvedConfig {
    /// Get a resolved value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|v| v.value.as_str())
    }

    /// Get a resolved value, failing if the key was never resolved.
    pub fn require(&self, key: &str) -> ConfigResult<&str> {
        self.get(key)
            .ok_or_else(|| ConfigError::Unresolved(key.to_string()))
    }

    /// Where the value for `key` came from.
    pub fn source(&self, key: &str) -> Option<Source> {
        self.values.get(key).map(|v| v.source)
    }

    /// Iterate over `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(k, v)| (k.as_str(), v.value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Resolve every parameter in `parameters` against the explicit and
/// environment layers.
///
/// `explicit` is keyed by parameter key; `environment` is keyed by
/// environment variable name. Empty strings count as absent.
pub fn resolve(
    parameters: &[Parameter],
    explicit: &BTreeMap<String, String>,
    environment: &HashMap<String, String>,
) -> ConfigResult<ResolvedConfig> {
    for key in explicit.keys() {
        if !parameters.iter().any(|p| p.key == key) {
            warn!(%key, "ignoring unrecognized parameter");
        }
    }

    let mut values = BTreeMap::new();

    for param in parameters {
        let layered = non_empty(explicit.get(param.key))
            .map(|v| (v, Source::Explicit))
            .or_else(|| non_empty(environment.get(param.env)).map(|v| (v, Source::Environment)))
            .or_else(|| {
                param
                    .default
                    .filter(|d| !d.is_empty())
                    .map(|d| (d.to_string(), Source::Default))
            });

        let Some((value, source)) = layered else {
            return Err(ConfigError::MissingRequired {
                key: param.key.to_string(),
                env: param.env.to_string(),
            });
        };

        debug!(key = param.key, ?source, "parameter resolved");
        values.insert(param.key.to_string(), ResolvedValue { value, source });
    }

    Ok(ResolvedConfig { values })
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.is_empty()).cloned()
}

//! The materialized credentials bundle.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{SecretError, SecretResult};
use crate::materialize::fields;

/// Credential field name → derived value.
///
/// Values are stored exactly as they will be written to the Secret, so
/// encoded fields stay encoded.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretBundle {
    fields: BTreeMap<String, String>,
}

impl SecretBundle {
    pub(crate) fn from_fields(fields: BTreeMap<String, String>) -> Self {
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn require(&self, name: &str) -> SecretResult<&str> {
        self.get(name)
            .ok_or_else(|| SecretError::MissingField(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Field names, in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Copy of the bundle as Secret `stringData`.
    pub fn to_string_data(&self) -> BTreeMap<String, String> {
        self.fields.clone()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The MongoDB connection string the workload composes from the bundle.
    pub fn connection_uri(&self) -> SecretResult<String> {
        Ok(format!(
            "mongodb://{}:{}@{}:{}/{}?authSource={}",
            self.require(fields::MONGO_USER)?,
            self.require(fields::MONGO_PASS)?,
            self.require(fields::MONGO_HOST)?,
            self.require(fields::MONGO_PORT)?,
            self.require(fields::MONGO_DBNAME)?,
            self.require(fields::MONGO_AUTHSOURCE)?,
        ))
    }
}

// Credentials must never reach logs through `{:?}`.
impl fmt::Debug for SecretBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for name in self.fields.keys() {
            if name == fields::MONGO_USER || name == fields::MONGO_PASS {
                map.entry(name, &"<redacted>");
            } else {
                map.entry(name, &self.fields[name]);
            }
        }
        map.finish()
    }
}

//! Field derivation.

use std::collections::BTreeMap;

use unifi_config::{ResolvedConfig, keys};

use crate::bundle::SecretBundle;
use crate::error::SecretResult;

/// Names of the fields in the application credentials Secret.
pub mod fields {
    pub const MONGO_USER: &str = "MONGO_USER";
    pub const MONGO_PASS: &str = "MONGO_PASS";
    pub const MONGO_HOST: &str = "MONGO_HOST";
    pub const MONGO_PORT: &str = "MONGO_PORT";
    pub const MONGO_DBNAME: &str = "MONGO_DBNAME";
    pub const MONGO_AUTHSOURCE: &str = "MONGO_AUTHSOURCE";
}

/// How a field's value is transformed before storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Stored as resolved.
    Verbatim,
    /// Percent-encoded for use inside the connection string's userinfo.
    Percent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecretField {
    pub name: &'static str,
    /// Parameter key the value is resolved from.
    pub parameter: &'static str,
    pub encoding: Encoding,
}

/// Fields of the application credentials bundle.
pub const APP_CREDENTIALS: &[SecretField] = &[
    SecretField {
        name: fields::MONGO_USER,
        parameter: keys::MONGO_USER,
        encoding: Encoding::Percent,
    },
    SecretField {
        name: fields::MONGO_PASS,
        parameter: keys::MONGO_PASSWORD,
        encoding: Encoding::Percent,
    },
    SecretField {
        name: fields::MONGO_HOST,
        parameter: keys::MONGO_HOST,
        encoding: Encoding::Verbatim,
    },
    SecretField {
        name: fields::MONGO_PORT,
        parameter: keys::MONGO_PORT,
        encoding: Encoding::Verbatim,
    },
    SecretField {
        name: fields::MONGO_DBNAME,
        parameter: keys::MONGO_DBNAME,
        encoding: Encoding::Verbatim,
    },
    SecretField {
        name: fields::MONGO_AUTHSOURCE,
        parameter: keys::MONGO_AUTHSOURCE,
        encoding: Encoding::Verbatim,
    },
];

/// Derive the credentials bundle from a resolved configuration.
pub fn materialize(cfg: &ResolvedConfig) -> SecretResult<SecretBundle> {
    let mut values = BTreeMap::new();

    for field in APP_CREDENTIALS {
        let raw = cfg.require(field.parameter)?;
        let value = match field.encoding {
            Encoding::Verbatim => raw.to_string(),
            Encoding::Percent => percent_encode(raw),
        };
        values.insert(field.name.to_string(), value);
    }

    Ok(SecretBundle::from_fields(values))
}

/// Escape every byte outside the RFC 3986 unreserved set
/// (`A-Z a-z 0-9 - . _ ~`). Not idempotent: `%` itself is escaped.
pub fn percent_encode(raw: &str) -> String {
    urlencoding::encode(raw).into_owned()
}

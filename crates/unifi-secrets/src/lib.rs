//! unifi-secrets — derives the application credentials bundle.
//!
//! The bundle feeds two consumers: the `unifi-secret-v3` Secret (mounted
//! into both the init job and the workload via `envFrom`) and the MongoDB
//! connection string the application composes from it. Fields that end up
//! inside that connection string are percent-encoded here, once.

pub mod bundle;
pub mod error;
pub mod materialize;

pub use bundle::SecretBundle;
pub use error::{SecretError, SecretResult};
pub use materialize::{APP_CREDENTIALS, Encoding, SecretField, fields, materialize, percent_encode};

//! unifi-config — parameter resolution for the UniFi stack.
//!
//! Every value the stack consumes is declared once in the parameter table
//! and resolved from three layers:
//!
//! ```text
//! explicit (stack file + --set)  >  environment (captured once)  >  default
//! ```
//!
//! The result is an immutable [`ResolvedConfig`] that is passed explicitly
//! to the secret materializer and the graph builder. Nothing downstream
//! reads the process environment.

pub mod duration;
pub mod error;
pub mod params;
pub mod resolver;
pub mod stack;

pub use duration::parse_duration;
pub use error::{ConfigError, ConfigResult};
pub use params::{Parameter, PARAMETERS, keys};
pub use resolver::{ResolvedConfig, ResolvedValue, Source, resolve};
pub use stack::{ProvisionSection, StackFile};

use thiserror::Error;

pub type SecretResult<T> = Result<T, SecretError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecretError {
    #[error("config error: {0}")]
    Config(#[from] unifi_config::ConfigError),

    #[error("secret field `{0}` is not present in the bundle")]
    MissingField(String),
}

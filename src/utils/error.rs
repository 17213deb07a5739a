use thiserror::Error;

/// Crate-wide error taxonomy.
///
/// Point-level read errors are recorded in the fleet error table, never
/// propagated upward; device-level `Connection`/`Unexpected` errors abort
/// only the affected device for the current cycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Slave {0} does not exist")]
    NoSuchSlave(u8),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Unexpected failure: {0}")]
    Unexpected(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<toml::de::Error> for PollError {
    fn from(err: toml::de::Error) -> Self {
        PollError::Config(format!("TOML parse error: {}", err))
    }
}

impl From<toml::ser::Error> for PollError {
    fn from(err: toml::ser::Error) -> Self {
        PollError::Config(format!("TOML serialize error: {}", err))
    }
}

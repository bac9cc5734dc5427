//! Error types for RekhaNav

use thiserror::Error;

/// RekhaNav error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A control loop was asked to stop while blocked on a wait.
    #[error("Shutdown requested")]
    Shutdown,

    /// The receiving end of a command channel has gone away.
    #[error("Command channel closed: {0}")]
    ChannelClosed(&'static str),

    #[error("{0}")]
    Other(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

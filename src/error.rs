// ABOUTME: Application-wide error types for hangar.
// ABOUTME: Config, I/O, runtime connection and failed-operation errors surfaced by the binary.

use std::path::PathBuf;
use thiserror::Error;

use crate::runtime::RuntimeError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("no container matches '{0}'")]
    UnknownContainer(String),

    /// The operation already reported its cause through the activity log.
    #[error("{0} failed")]
    OperationFailed(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;

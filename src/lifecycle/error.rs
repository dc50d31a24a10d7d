// ABOUTME: Error types for lifecycle operations.
// ABOUTME: Gateway failures, missing snapshots or containers, start timeouts and bad requests.

use std::time::Duration;

use crate::runtime::{ContainerError, ExecError, ImageError};
use crate::terminal::TerminalError;
use crate::types::ContainerId;

/// What kind of thing was looked up and not found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingKind {
    Container,
    Snapshot,
}

impl std::fmt::Display for MissingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissingKind::Container => f.write_str("container"),
            MissingKind::Snapshot => f.write_str("snapshot"),
        }
    }
}

/// Errors from resolving requests and driving containers through their lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// A gateway call (pull, build, create, start, stop, remove, commit, list) failed.
    #[error("{operation} failed: {cause}")]
    RuntimeOperationFailed {
        operation: &'static str,
        cause: String,
    },

    #[error("{kind} not found: {id}")]
    NotFound { kind: MissingKind, id: String },

    /// The start confirmation poll ran out of time.
    #[error("container {container} did not reach running within {waited:?}")]
    StartTimeout {
        container: ContainerId,
        waited: Duration,
    },

    /// Zero or several sources, or an otherwise malformed creation request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("workspace error: {0}")]
    Workspace(#[from] std::io::Error),

    #[error(transparent)]
    Terminal(#[from] TerminalError),
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleErrorKind {
    RuntimeOperationFailed,
    NotFound,
    StartTimeout,
    InvalidRequest,
    Workspace,
    Terminal,
}

impl LifecycleError {
    pub fn kind(&self) -> LifecycleErrorKind {
        match self {
            LifecycleError::RuntimeOperationFailed { .. } => {
                LifecycleErrorKind::RuntimeOperationFailed
            }
            LifecycleError::NotFound { .. } => LifecycleErrorKind::NotFound,
            LifecycleError::StartTimeout { .. } => LifecycleErrorKind::StartTimeout,
            LifecycleError::InvalidRequest(_) => LifecycleErrorKind::InvalidRequest,
            LifecycleError::Workspace(_) => LifecycleErrorKind::Workspace,
            LifecycleError::Terminal(_) => LifecycleErrorKind::Terminal,
        }
    }

    pub(crate) fn failed(operation: &'static str, cause: impl std::fmt::Display) -> Self {
        LifecycleError::RuntimeOperationFailed {
            operation,
            cause: cause.to_string(),
        }
    }
}

/// Tag a gateway error with the operation that produced it.
pub trait GatewayResultExt<T> {
    fn during(self, operation: &'static str) -> Result<T, LifecycleError>;
}

impl<T> GatewayResultExt<T> for Result<T, ContainerError> {
    fn during(self, operation: &'static str) -> Result<T, LifecycleError> {
        self.map_err(|e| match e {
            ContainerError::NotFound(id) => LifecycleError::NotFound {
                kind: MissingKind::Container,
                id,
            },
            other => LifecycleError::failed(operation, other),
        })
    }
}

impl<T> GatewayResultExt<T> for Result<T, ImageError> {
    fn during(self, operation: &'static str) -> Result<T, LifecycleError> {
        self.map_err(|e| LifecycleError::failed(operation, e))
    }
}

impl<T> GatewayResultExt<T> for Result<T, ExecError> {
    fn during(self, operation: &'static str) -> Result<T, LifecycleError> {
        self.map_err(|e| LifecycleError::failed(operation, e))
    }
}

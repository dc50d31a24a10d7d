// ABOUTME: Runtime error types with SNAFU pattern.
// ABOUTME: Unifies detection and connection errors for programmatic handling.

use snafu::Snafu;

use super::detection::DetectionError;
use super::traits::RuntimeInfoError;

/// Failure to find or reach a container runtime.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RuntimeError {
    #[snafu(display("runtime detection failed: {source}"))]
    Detection { source: DetectionError },

    #[snafu(display("runtime connection failed: {source}"))]
    Connection { source: RuntimeInfoError },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    /// No socket found and none configured.
    NoRuntimeFound,
    /// A configured socket path does not exist.
    SocketMissing,
    /// The socket exists but the API did not answer.
    ConnectionFailed,
    /// The API answered with an error.
    RuntimeOperation,
}

impl RuntimeError {
    pub fn kind(&self) -> RuntimeErrorKind {
        match self {
            RuntimeError::Detection { source } => match source {
                DetectionError::NoRuntimeFound => RuntimeErrorKind::NoRuntimeFound,
                DetectionError::SocketMissing(_) => RuntimeErrorKind::SocketMissing,
            },
            RuntimeError::Connection { source } => match source {
                RuntimeInfoError::Unreachable(_) => RuntimeErrorKind::ConnectionFailed,
                RuntimeInfoError::Api(_) => RuntimeErrorKind::RuntimeOperation,
            },
        }
    }
}

impl From<DetectionError> for RuntimeError {
    fn from(source: DetectionError) -> Self {
        RuntimeError::Detection { source }
    }
}

impl From<RuntimeInfoError> for RuntimeError {
    fn from(source: RuntimeInfoError) -> Self {
        RuntimeError::Connection { source }
    }
}

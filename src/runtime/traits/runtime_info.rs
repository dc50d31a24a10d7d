// ABOUTME: Reachability and version queries against the runtime API.
// ABOUTME: Used to confirm a detected socket answers before any lifecycle work.

use super::sealed::Sealed;
use super::shared_types::RuntimeMetadata;
use async_trait::async_trait;

#[async_trait]
pub trait RuntimeInfo: Sealed + Send + Sync {
    /// Version, API level and platform reported by the daemon.
    async fn info(&self) -> Result<RuntimeMetadata, RuntimeInfoError>;

    /// Cheapest round trip to the daemon.
    async fn ping(&self) -> Result<(), RuntimeInfoError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RuntimeInfoError {
    /// The socket could not be opened or did not answer.
    #[error("runtime unreachable: {0}")]
    Unreachable(String),

    /// The daemon answered with an error.
    #[error("runtime API error: {0}")]
    Api(String),
}

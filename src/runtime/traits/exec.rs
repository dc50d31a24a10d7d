// ABOUTME: Exec capability: run a one-off command inside a running container.
// ABOUTME: Used to probe for an interactive shell before a terminal is opened.

use super::sealed::Sealed;
use super::shared_types::{ExecConfig, ExecResult};
use crate::types::ContainerId;
use async_trait::async_trait;

#[async_trait]
pub trait ExecOps: Sealed + Send + Sync {
    /// Run `config.cmd` to completion. A non-zero exit code is a successful
    /// call; only failing to run the command at all is an error.
    async fn exec(
        &self,
        container: &ContainerId,
        config: &ExecConfig,
    ) -> Result<ExecResult, ExecError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    #[error("container not running: {0}")]
    ContainerNotRunning(String),

    #[error("exec instance not found: {0}")]
    ExecNotFound(String),

    #[error("exec failed: {0}")]
    Failed(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}

// ABOUTME: Container operations trait for container runtimes.
// ABOUTME: Create, start, stop, remove, inspect, list and commit containers.

use super::sealed::Sealed;
use super::shared_types::{CommitOptions, ContainerConfig, ContainerInfo, ContainerState};
use crate::types::{ContainerId, SnapshotId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// Container lifecycle operations.
#[async_trait]
pub trait ContainerOps: Sealed + Send + Sync {
    /// Create a container from the given configuration.
    async fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<ContainerId, ContainerError>;

    /// Start a created or stopped container.
    ///
    /// Returning `Ok` does not mean the container is already running.
    async fn start_container(&self, id: &ContainerId) -> Result<(), ContainerError>;

    /// Stop a running container, killing it after `timeout`.
    async fn stop_container(
        &self,
        id: &ContainerId,
        timeout: Duration,
    ) -> Result<(), ContainerError>;

    /// Remove a container.
    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), ContainerError>;

    /// Get live information about a container.
    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerInfo, ContainerError>;

    /// List containers matching the given filters.
    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ContainerSummary>, ContainerError>;

    /// Commit the container filesystem to a new image.
    async fn commit_container(
        &self,
        id: &ContainerId,
        options: &CommitOptions,
    ) -> Result<SnapshotId, ContainerError>;
}

/// Filters for listing containers.
#[derive(Debug, Clone, Default)]
pub struct ContainerFilters {
    /// Filter by label (key=value).
    pub labels: HashMap<String, String>,
    /// Filter by name (supports partial match).
    pub name: Option<String>,
    /// Include stopped containers.
    pub all: bool,
}

impl ContainerFilters {
    /// Every container regardless of state.
    pub fn all() -> Self {
        Self {
            all: true,
            ..Default::default()
        }
    }
}

/// Summary information about a container.
#[derive(Debug, Clone)]
pub struct ContainerSummary {
    pub id: ContainerId,
    pub name: String,
    /// Image reference; empty when the runtime reports none.
    pub image: String,
    pub state: ContainerState,
    /// Human readable status ("Up 3 minutes").
    pub status: String,
    pub labels: HashMap<String, String>,
}

/// Errors from container operations.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("container not found: {0}")]
    NotFound(String),

    #[error("container already exists: {0}")]
    AlreadyExists(String),

    #[error("container not running: {0}")]
    NotRunning(String),

    #[error("container already running: {0}")]
    AlreadyRunning(String),

    #[error("image not found: {0}")]
    ImageNotFound(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}

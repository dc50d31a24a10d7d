// ABOUTME: Shared types used across runtime trait definitions.
// ABOUTME: ContainerConfig, ContainerState, CommitOptions, BuildSpec, ExecConfig, etc.

use crate::types::ContainerId;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Configuration for creating a container.
#[derive(Debug, Clone, Default)]
pub struct ContainerConfig {
    /// Name for the container.
    pub name: String,
    /// Image reference or image id to run.
    pub image: String,
    /// Allocate a pseudo-TTY.
    pub tty: bool,
    /// Keep stdin open even when nothing is attached.
    pub open_stdin: bool,
    /// Labels to apply.
    pub labels: HashMap<String, String>,
    /// Bind mounts.
    pub volumes: Vec<VolumeMount>,
    /// Command to run (overrides image CMD).
    pub command: Option<Vec<String>>,
    /// Working directory.
    pub working_dir: Option<String>,
}

/// Bind mount from a host path into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    /// Host path.
    pub source: String,
    /// Target path in container.
    pub target: String,
    pub read_only: bool,
}

/// Container state as reported by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
}

impl ContainerState {
    pub fn is_running(self) -> bool {
        self == ContainerState::Running
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContainerState::Created => "created",
            ContainerState::Running => "running",
            ContainerState::Paused => "paused",
            ContainerState::Restarting => "restarting",
            ContainerState::Removing => "removing",
            ContainerState::Exited => "exited",
            ContainerState::Dead => "dead",
        }
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for state strings the runtime reports but we do not model.
#[derive(Debug, thiserror::Error)]
#[error("unknown container state: {0}")]
pub struct UnknownState(pub String);

impl FromStr for ContainerState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "created" => Ok(ContainerState::Created),
            "running" => Ok(ContainerState::Running),
            "paused" => Ok(ContainerState::Paused),
            "restarting" => Ok(ContainerState::Restarting),
            "removing" => Ok(ContainerState::Removing),
            "exited" | "stopped" => Ok(ContainerState::Exited),
            "dead" => Ok(ContainerState::Dead),
            other => Err(UnknownState(other.to_string())),
        }
    }
}

/// Live information about a container.
#[derive(Debug, Clone)]
pub struct ContainerInfo {
    pub id: ContainerId,
    pub name: String,
    pub image: String,
    pub state: ContainerState,
    /// Creation timestamp.
    pub created: String,
    pub labels: HashMap<String, String>,
}

/// Options for committing a container to an image.
#[derive(Debug, Clone)]
pub struct CommitOptions {
    /// Repository to tag the new image under.
    pub repository: String,
    /// Tag; the runtime defaults to `latest`.
    pub tag: Option<String>,
    pub comment: Option<String>,
    /// Pause the container while committing.
    pub pause: bool,
}

impl CommitOptions {
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            tag: None,
            comment: None,
            pause: true,
        }
    }
}

/// What to build and how to tag it.
#[derive(Debug, Clone)]
pub struct BuildSpec {
    /// Directory sent to the runtime as the build context.
    pub context: PathBuf,
    /// Dockerfile path relative to the context.
    pub dockerfile: String,
    /// Tag for the resulting image.
    pub tag: String,
}

/// Runtime metadata.
#[derive(Debug, Clone)]
pub struct RuntimeMetadata {
    /// Runtime name (e.g., "docker", "podman").
    pub name: String,
    pub version: String,
    pub api_version: String,
    pub os: String,
    pub arch: String,
}

/// Exec configuration for running commands in containers.
#[derive(Debug, Clone)]
pub struct ExecConfig {
    /// Command and arguments to run.
    pub cmd: Vec<String>,
    pub env: Vec<String>,
    pub working_dir: Option<String>,
    pub user: Option<String>,
    pub attach_stdout: bool,
    pub attach_stderr: bool,
    pub tty: bool,
}

impl ExecConfig {
    /// Run `cmd` with stdout and stderr captured.
    pub fn command<I, S>(cmd: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cmd: cmd.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            cmd: Vec::new(),
            env: Vec::new(),
            working_dir: None,
            user: None,
            attach_stdout: true,
            attach_stderr: true,
            tty: false,
        }
    }
}

/// Result of an exec operation.
#[derive(Debug, Clone)]
pub struct ExecResult {
    pub exit_code: i64,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ExecResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

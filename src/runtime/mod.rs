// ABOUTME: Runtime gateway: capability traits plus the bollard implementation.
// ABOUTME: Also detects which local Docker or Podman socket to talk to.

mod bollard;
mod detection;
mod error;
#[cfg(test)]
pub(crate) mod fake;
pub mod traits;
mod types;

pub use self::bollard::{BollardRuntime, connect_local};
pub use detection::{DetectionError, detect_local};
pub use error::{RuntimeError, RuntimeErrorKind};
pub use traits::{
    BuildSpec, CommitOptions, ContainerConfig, ContainerError, ContainerFilters, ContainerInfo,
    ContainerOps, ContainerState, ContainerSummary, ExecConfig, ExecError, ExecOps, ExecResult,
    FullRuntime, ImageError, ImageOps, RuntimeInfo as RuntimeInfoOps, RuntimeInfoError,
    RuntimeMetadata, VolumeMount,
};
pub use types::{RuntimeConfig, RuntimeEndpoint, RuntimeType};

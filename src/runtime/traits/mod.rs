// ABOUTME: Composable capability traits forming the runtime gateway.
// ABOUTME: Defines ContainerOps, ImageOps, ExecOps, RuntimeInfo and FullRuntime.

mod container;
mod exec;
mod image;
mod runtime_info;
pub(crate) mod sealed;
mod shared_types;

pub use container::{ContainerError, ContainerFilters, ContainerOps, ContainerSummary};
pub use exec::{ExecError, ExecOps};
pub use image::{ImageError, ImageOps};
pub use runtime_info::{RuntimeInfo, RuntimeInfoError};
pub use shared_types::*;

/// Every capability the lifecycle orchestrator needs from a runtime.
pub trait FullRuntime: ContainerOps + ImageOps + ExecOps + RuntimeInfo {}

impl<T> FullRuntime for T where T: ContainerOps + ImageOps + ExecOps + RuntimeInfo {}

// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Uses phantom types to prevent ID confusion at compile time.

mod container_name;
mod id;
mod image_ref;

pub use container_name::{ContainerName, ContainerNameError};
pub use id::{ContainerId, Id, SnapshotId};
pub use image_ref::{ImageRef, ParseImageRefError};

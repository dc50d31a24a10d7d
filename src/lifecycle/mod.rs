// ABOUTME: Container lifecycle: creation requests, image resolution, toggling and the orchestrator.
// ABOUTME: Talks to the runtime only through the gateway traits.

mod error;
mod naming;
mod orchestrator;
mod request;
mod resolver;
mod start;
mod toggle;
mod workspace;

pub use error::{GatewayResultExt, LifecycleError, LifecycleErrorKind, MissingKind};
pub use naming::{base_name_from_image, resolve_name};
pub use orchestrator::{LifecycleSettings, MANAGED_LABEL, Orchestrator};
pub use request::{CatalogChoice, CreationDraft, CreationRequest, CreationSource, DockerfileChoice};
pub use resolver::{ResolvedImage, catalog_reference, normalize_family, resolve};
pub use start::{StartPolicy, wait_until_running};
pub use toggle::{ToggleHandle, ToggleState};
pub use workspace::Workspace;

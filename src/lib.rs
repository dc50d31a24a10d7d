// ABOUTME: Library root for hangar - container lifecycle management over Docker or Podman.
// ABOUTME: The CLI binary is in main.rs.

pub mod config;
pub mod directory;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod output;
pub mod runtime;
pub mod snapshot;
pub mod terminal;
pub mod types;

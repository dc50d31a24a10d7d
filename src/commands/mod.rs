// ABOUTME: Command module aggregator for the hangar CLI.
// ABOUTME: Re-exports the runtime session, container commands, console and info handlers.

mod console;
mod container;
mod info;
mod session;

pub use console::console;
pub use container::{StdinPolicy, run_container_command};
pub use info::info;
pub use session::Session;

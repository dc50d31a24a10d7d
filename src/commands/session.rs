// ABOUTME: Connected runtime session shared by the one-shot commands and the console.
// ABOUTME: Owns the orchestrator and resolves container names or ids against its directory.

use std::sync::Arc;

use hangar::config::Config;
use hangar::error::{Error, Result};
use hangar::lifecycle::Orchestrator;
use hangar::output::Output;
use hangar::runtime::{BollardRuntime, connect_local};
use hangar::terminal::{InlineTerminal, SystemTerminal, TerminalLauncher};
use hangar::types::ContainerId;

pub struct Session {
    pub config: Config,
    pub output: Arc<Output>,
    pub orchestrator: Orchestrator<BollardRuntime>,
}

impl Session {
    /// Connect to the local runtime and load the container directory.
    pub async fn open(config: Config, output: Arc<Output>) -> Result<Self> {
        let runtime = connect_local(Some(&config.runtime_config())).await?;
        tracing::info!(runtime = %runtime.runtime_type(), "connected");

        let mut orchestrator = Orchestrator::new(
            Arc::new(runtime),
            output.clone(),
            config.workspace(),
            config.lifecycle_settings(),
        );
        if !orchestrator.refresh().await {
            return Err(Error::OperationFailed("refresh"));
        }

        Ok(Self {
            config,
            output,
            orchestrator,
        })
    }

    /// Find a container by name, id or unique id prefix.
    pub fn resolve(&self, key: &str) -> Result<ContainerId> {
        self.orchestrator
            .directory()
            .find(key)
            .map(|record| record.id.clone())
            .ok_or_else(|| Error::UnknownContainer(key.to_string()))
    }

    pub fn launcher(&self, here: bool) -> Box<dyn TerminalLauncher> {
        let runtime_type = self.orchestrator.runtime().runtime_type();
        if here {
            Box::new(InlineTerminal::new(runtime_type))
        } else {
            Box::new(SystemTerminal::new(
                runtime_type,
                self.config.terminal.clone(),
            ))
        }
    }
}

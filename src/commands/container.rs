// ABOUTME: Container commands shared by the command line and the console.
// ABOUTME: Maps each command onto one orchestrator operation.

use hangar::error::{Error, Result};
use hangar::lifecycle::ToggleHandle;
use tokio::io::AsyncReadExt;

use super::Session;
use crate::cli::ContainerCommand;

/// Whether `create --dockerfile-stdin` may read standard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdinPolicy {
    Read,
    /// Stdin carries console commands.
    Reserved,
}

/// Run one command against the session.
///
/// A toggle is returned unsettled so the caller decides whether to wait.
pub async fn run_container_command(
    session: &mut Session,
    command: ContainerCommand,
    stdin: StdinPolicy,
) -> Result<Option<ToggleHandle>> {
    match command {
        ContainerCommand::Catalog => {
            session.output.print_catalog(&session.config.catalog);
        }
        ContainerCommand::List => {
            session.output.print_directory();
        }
        ContainerCommand::Create(mut args) => {
            let inline = if args.dockerfile_stdin {
                args.dockerfile_stdin = false;
                Some(read_stdin(stdin).await?)
            } else {
                None
            };
            let draft = args.into_draft(inline);
            session.output.start_timer();
            let created = session
                .orchestrator
                .create_from_draft(draft, &session.config.catalog)
                .await;
            if created.is_none() {
                return Err(Error::OperationFailed("create"));
            }
        }
        ContainerCommand::Toggle { container } => {
            let id = session.resolve(&container)?;
            return Ok(session.orchestrator.toggle_run_state(&id));
        }
        ContainerCommand::Rm { container } => {
            let id = session.resolve(&container)?;
            if !session.orchestrator.delete(&id).await {
                return Err(Error::OperationFailed("delete"));
            }
        }
        ContainerCommand::Snapshot {
            container,
            repository,
        } => {
            let id = session.resolve(&container)?;
            let taken = session.orchestrator.snapshot(&id, &repository).await;
            match taken {
                Some(snapshot_id) => session.output.progress(&format!("Snapshot id: {snapshot_id}")),
                None if repository.trim().is_empty() => {}
                None => return Err(Error::OperationFailed("snapshot")),
            }
        }
        ContainerCommand::Shell { container, here } => {
            let id = session.resolve(&container)?;
            let launcher = session.launcher(here);
            if !session
                .orchestrator
                .open_terminal(&id, launcher.as_ref())
                .await
            {
                return Err(Error::OperationFailed("shell"));
            }
        }
    }
    Ok(None)
}

async fn read_stdin(policy: StdinPolicy) -> Result<String> {
    if policy == StdinPolicy::Reserved {
        return Err(Error::InvalidCommand(
            "--dockerfile-stdin is not available in the console; use --dockerfile".to_string(),
        ));
    }
    let mut content = String::new();
    tokio::io::stdin().read_to_string(&mut content).await?;
    Ok(content)
}

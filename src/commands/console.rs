// ABOUTME: Interactive console reading one command per line from stdin.
// ABOUTME: Toggles settle in the background while further commands are accepted.

use std::io::Write;

use clap::Parser;

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use hangar::error::{Error, Result};
use hangar::lifecycle::{ToggleHandle, ToggleState};
use hangar::output::OutputMode;
use hangar::types::ContainerId;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{Session, StdinPolicy, run_container_command};
use crate::cli::{ConsoleCommand, ConsoleLine, ContainerCommand};

enum Flow {
    Continue,
    Toggled(ToggleHandle),
    Exit,
}

type Settling = BoxFuture<'static, (ContainerId, ToggleState)>;

/// Run the console until `exit` or end of input.
///
/// The snapshot registry lives as long as the session.
pub async fn console(mut session: Session) -> Result<()> {
    let output = session.output.clone();
    output.progress("Type 'help' for commands, 'exit' to leave.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut toggles: FuturesUnordered<Settling> = FuturesUnordered::new();

    loop {
        if output.mode() == OutputMode::Normal {
            print!("hangar> ");
            std::io::stdout().flush()?;
        }

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match handle_line(&mut session, &line).await {
                    Ok(Flow::Exit) => break,
                    Ok(Flow::Toggled(handle)) => toggles.push(settle(handle)),
                    Ok(Flow::Continue) => {}
                    Err(e) => output.error(&e.to_string()),
                }
            }
            Some((id, state)) = toggles.next(), if !toggles.is_empty() => {
                tracing::debug!(container = %id.short(), ?state, "toggle settled");
                session.orchestrator.refresh().await;
            }
        }
    }

    // Let outstanding toggles report before leaving.
    while toggles.next().await.is_some() {}
    session.orchestrator.refresh().await;
    Ok(())
}

fn settle(handle: ToggleHandle) -> Settling {
    async move {
        let id = handle.container().clone();
        (id, handle.wait().await)
    }
    .boxed()
}

async fn handle_line(session: &mut Session, line: &str) -> Result<Flow> {
    let words = shell_words::split(line).map_err(|e| Error::InvalidCommand(e.to_string()))?;
    if words.is_empty() {
        return Ok(Flow::Continue);
    }

    let parsed = match ConsoleLine::try_parse_from(&words) {
        Ok(parsed) => parsed,
        Err(e) => {
            // Covers `help` as well as usage errors.
            e.print()?;
            return Ok(Flow::Continue);
        }
    };

    match parsed.command {
        ConsoleCommand::Exit => return Ok(Flow::Exit),
        ConsoleCommand::Refresh => {
            if session.orchestrator.refresh().await {
                session.output.print_directory();
            }
        }
        ConsoleCommand::Snapshots => {
            session
                .output
                .print_snapshots(&session.orchestrator.snapshots().all());
        }
        ConsoleCommand::Container(ContainerCommand::Toggle { container }) => {
            let id = session.resolve(&container)?;
            return match session.orchestrator.toggle_run_state(&id) {
                Some(handle) => Ok(Flow::Toggled(handle)),
                None => {
                    session
                        .output
                        .progress(&format!("{container} is already starting or stopping"));
                    Ok(Flow::Continue)
                }
            };
        }
        ConsoleCommand::Container(command) => {
            if let Some(handle) =
                run_container_command(session, command, StdinPolicy::Reserved).await?
            {
                return Ok(Flow::Toggled(handle));
            }
        }
    }
    Ok(Flow::Continue)
}

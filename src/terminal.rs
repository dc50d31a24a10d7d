// ABOUTME: Shell detection inside containers and terminal launching on the host.
// ABOUTME: Launching sits behind a trait so the open-terminal sequence can be tested.

use async_trait::async_trait;

use crate::runtime::{ExecConfig, ExecOps, RuntimeType};
use crate::types::ContainerId;

/// Shells probed for, in order.
pub const SHELL_CANDIDATES: [&str; 3] = ["/bin/bash", "/bin/sh", "/bin/ash"];

/// Used when no candidate is found or probing fails.
pub const DEFAULT_SHELL: &str = "/bin/sh";

#[derive(Debug, thiserror::Error)]
pub enum TerminalError {
    #[error("terminal command is empty")]
    EmptyCommand,

    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with status {code}")]
    Exited { program: String, code: i32 },
}

/// Opens an interactive shell session for a running container.
#[async_trait]
pub trait TerminalLauncher: Send + Sync {
    async fn launch(&self, container: &ContainerId, shell: &str) -> Result<(), TerminalError>;
}

/// First candidate shell that exists in the container.
pub async fn detect_shell<R: ExecOps + ?Sized>(runtime: &R, container: &ContainerId) -> String {
    for shell in SHELL_CANDIDATES {
        let probe = ExecConfig::command(["test", "-f", shell]);
        match runtime.exec(container, &probe).await {
            Ok(result) if result.success() => {
                tracing::debug!(container = %container.short(), shell, "found shell");
                return shell.to_string();
            }
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(container = %container.short(), error = %e, "shell probe failed");
                break;
            }
        }
    }
    DEFAULT_SHELL.to_string()
}

fn default_command() -> Vec<String> {
    if cfg!(windows) {
        ["cmd.exe", "/c", "start", "cmd.exe", "/k"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    } else {
        vec!["x-terminal-emulator".to_string(), "-e".to_string()]
    }
}

/// Spawns a terminal emulator running `<runtime> exec -it <id> <shell>`.
#[derive(Debug, Clone)]
pub struct SystemTerminal {
    runtime: RuntimeType,
    prefix: Vec<String>,
}

impl SystemTerminal {
    /// `prefix` replaces the emulator invocation, e.g. `["kitty", "-e"]`.
    pub fn new(runtime: RuntimeType, prefix: Option<Vec<String>>) -> Self {
        Self {
            runtime,
            prefix: prefix
                .filter(|p| !p.is_empty())
                .unwrap_or_else(default_command),
        }
    }

    pub fn command_line(&self, container: &ContainerId, shell: &str) -> Vec<String> {
        let mut argv = self.prefix.clone();
        argv.extend(exec_argv(self.runtime, container, shell));
        argv
    }
}

fn exec_argv(runtime: RuntimeType, container: &ContainerId, shell: &str) -> Vec<String> {
    vec![
        runtime.cli_binary().to_string(),
        "exec".to_string(),
        "-it".to_string(),
        container.to_string(),
        shell.to_string(),
    ]
}

#[async_trait]
impl TerminalLauncher for SystemTerminal {
    async fn launch(&self, container: &ContainerId, shell: &str) -> Result<(), TerminalError> {
        let argv = self.command_line(container, shell);
        let (program, args) = argv.split_first().ok_or(TerminalError::EmptyCommand)?;
        tracing::debug!(?argv, "spawning terminal");
        // Detached: the emulator outlives this call.
        tokio::process::Command::new(program)
            .args(args)
            .spawn()
            .map_err(|source| TerminalError::Spawn {
                program: program.clone(),
                source,
            })?;
        Ok(())
    }
}

/// Runs the exec session in the current terminal and waits for it to end.
#[derive(Debug, Clone, Copy)]
pub struct InlineTerminal {
    runtime: RuntimeType,
}

impl InlineTerminal {
    pub fn new(runtime: RuntimeType) -> Self {
        Self { runtime }
    }
}

#[async_trait]
impl TerminalLauncher for InlineTerminal {
    async fn launch(&self, container: &ContainerId, shell: &str) -> Result<(), TerminalError> {
        let argv = exec_argv(self.runtime, container, shell);
        let (program, args) = argv.split_first().ok_or(TerminalError::EmptyCommand)?;
        let status = tokio::process::Command::new(program)
            .args(args)
            .status()
            .await
            .map_err(|source| TerminalError::Spawn {
                program: program.clone(),
                source,
            })?;
        match status.code() {
            Some(0) | None => Ok(()),
            Some(code) => Err(TerminalError::Exited {
                program: program.clone(),
                code,
            }),
        }
    }
}

// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands, shared with the interactive console grammar.

use clap::{Args, Parser, Subcommand};
use hangar::lifecycle::{CatalogChoice, CreationDraft, DockerfileChoice};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hangar")]
#[command(about = "Create, run and snapshot development containers on Docker or Podman")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print results and errors
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a hangar.yml template in the current directory
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Start an interactive session
    Console,

    /// Show the runtime endpoint and version
    Info,

    #[command(flatten)]
    Container(ContainerCommand),
}

/// Commands available both on the command line and in the console.
#[derive(Subcommand, Debug)]
pub enum ContainerCommand {
    /// List the curated image catalog
    Catalog,

    /// List all containers
    #[command(visible_alias = "ls")]
    List,

    /// Create a container from exactly one image source
    Create(CreateArgs),

    /// Start a stopped container or stop a running one
    Toggle {
        /// Container name or id
        container: String,
    },

    /// Force-remove a container
    #[command(visible_alias = "delete")]
    Rm {
        /// Container name or id
        container: String,
    },

    /// Commit a container's filesystem as a new image
    Snapshot {
        /// Container name or id
        container: String,
        /// Repository (and optional tag) for the image
        repository: String,
    },

    /// Open a shell in a container, starting it first if needed
    Shell {
        /// Container name or id
        container: String,
        /// Run in this terminal instead of a new emulator window
        #[arg(long)]
        here: bool,
    },
}

#[derive(Args, Debug, Default)]
pub struct CreateArgs {
    /// Container name; derived from the image when omitted
    #[arg(long)]
    pub name: Option<String>,

    /// Catalog family, e.g. Ubuntu or Node.js
    #[arg(long)]
    pub family: Option<String>,

    /// Catalog version; the family's first version when omitted
    #[arg(long, requires = "family")]
    pub version: Option<String>,

    /// Image reference, e.g. alpine:3.19
    #[arg(long)]
    pub image: Option<String>,

    /// Snapshot id from this session
    #[arg(long)]
    pub snapshot: Option<String>,

    /// Path to a Dockerfile; its directory is the build context
    #[arg(long)]
    pub dockerfile: Option<PathBuf>,

    /// Read Dockerfile content from standard input
    #[arg(long)]
    pub dockerfile_stdin: bool,
}

impl CreateArgs {
    /// Map the flags onto a draft. `inline` is the Dockerfile read from stdin.
    pub fn into_draft(self, inline: Option<String>) -> CreationDraft {
        let dockerfile = match (self.dockerfile, inline) {
            (None, None) => None,
            (path, inline_content) => Some(DockerfileChoice {
                path,
                inline_content,
            }),
        };
        CreationDraft {
            name: self.name,
            catalog: self.family.map(|family| CatalogChoice {
                family,
                version: self.version,
            }),
            custom: self.image,
            snapshot: self.snapshot,
            dockerfile,
        }
    }
}

/// One console input line.
#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_version_flag = true)]
#[command(override_usage = "<command> [args]")]
pub struct ConsoleLine {
    #[command(subcommand)]
    pub command: ConsoleCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConsoleCommand {
    #[command(flatten)]
    Container(ContainerCommand),

    /// List snapshots taken in this session
    Snapshots,

    /// Re-read the container list from the runtime
    Refresh,

    /// Leave the console
    #[command(visible_alias = "quit")]
    Exit,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
        ConsoleLine::command().debug_assert();
    }

    #[test]
    fn create_flags_become_draft() {
        let cli = Cli::try_parse_from([
            "hangar", "create", "--family", "Ubuntu", "--version", "20.04", "--name", "box",
        ])
        .unwrap();
        let Commands::Container(ContainerCommand::Create(args)) = cli.command else {
            panic!("expected create");
        };
        let draft = args.into_draft(None);
        assert_eq!(draft.name.as_deref(), Some("box"));
        assert_eq!(
            draft.catalog,
            Some(CatalogChoice {
                family: "Ubuntu".to_string(),
                version: Some("20.04".to_string()),
            })
        );
        assert!(draft.custom.is_none() && draft.dockerfile.is_none());
    }

    #[test]
    fn stdin_content_becomes_inline_dockerfile() {
        let draft = CreateArgs::default().into_draft(Some("FROM alpine\n".to_string()));
        assert_eq!(
            draft.dockerfile,
            Some(DockerfileChoice {
                path: None,
                inline_content: Some("FROM alpine\n".to_string()),
            })
        );
    }

    #[test]
    fn version_requires_family() {
        assert!(Cli::try_parse_from(["hangar", "create", "--version", "3"]).is_err());
    }

    #[test]
    fn console_line_parses_without_binary_name() {
        let line = ConsoleLine::try_parse_from(["snapshot", "web", "myimage:v1"]).unwrap();
        assert!(matches!(
            line.command,
            ConsoleCommand::Container(ContainerCommand::Snapshot { .. })
        ));
        let line = ConsoleLine::try_parse_from(["quit"]).unwrap();
        assert!(matches!(line.command, ConsoleCommand::Exit));
    }
}

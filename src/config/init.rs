// ABOUTME: Config scaffolding for new setups.
// ABOUTME: Writes a commented hangar.yml template.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::CONFIG_FILENAME;

/// Write a template config into `dir`. Refuses to overwrite unless `force`.
pub fn init_config(dir: &Path, force: bool) -> Result<PathBuf> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    std::fs::write(&config_path, TEMPLATE)?;
    Ok(config_path)
}

const TEMPLATE: &str = r#"# Host directory with one sub-directory per container.
# HANGAR_WORKSPACE overrides this.
# workspace: ~/.local/share/hangar/workspaces
mount_target: /workspace

# Leave unset to detect Podman (rootless, then rootful) and then Docker.
# runtime: podman
# socket: /run/user/1000/podman/podman.sock

start:
  interval: 500ms
  timeout: 5s
  backoff: 1.0
  max_interval: 2s
stop_timeout: 10s
auto_start: false

# Terminal emulator used by `hangar shell`; the exec command is appended.
# terminal: ["x-terminal-emulator", "-e"]

# Replaces the built-in catalog when set.
# catalog:
#   - name: Ubuntu
#     versions: ["22.04", "20.04", "latest"]
"#;

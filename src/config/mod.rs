// ABOUTME: Configuration types and parsing for hangar.yml.
// ABOUTME: Handles YAML parsing, file discovery, defaults and the HANGAR_WORKSPACE override.

mod catalog;
mod deserialize;
mod init;

pub use catalog::{Catalog, CatalogFamily};
pub use init::init_config;

use crate::error::{Error, Result};
use crate::lifecycle::{LifecycleSettings, StartPolicy, Workspace};
use crate::runtime::{RuntimeConfig, RuntimeType};
use deserialize::deserialize_command;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "hangar.yml";
pub const CONFIG_FILENAME_ALT: &str = "hangar.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".hangar/config.yml";

/// Overrides `workspace` when set.
pub const WORKSPACE_ENV: &str = "HANGAR_WORKSPACE";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Host directory holding one sub-directory per container.
    #[serde(default = "default_workspace")]
    pub workspace: PathBuf,

    /// Where the workspace directory appears inside containers.
    #[serde(default = "default_mount_target")]
    pub mount_target: String,

    #[serde(default)]
    pub runtime: Option<RuntimeType>,

    #[serde(default)]
    pub socket: Option<String>,

    #[serde(default)]
    pub start: StartPolicy,

    #[serde(default = "default_stop_timeout", with = "humantime_serde")]
    pub stop_timeout: Duration,

    #[serde(default)]
    pub auto_start: bool,

    /// Terminal emulator invocation the exec command is appended to.
    #[serde(default, deserialize_with = "deserialize_command")]
    pub terminal: Option<Vec<String>>,

    #[serde(default)]
    pub catalog: Catalog,
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

fn default_workspace() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".local/share/hangar/workspaces")
}

fn default_mount_target() -> String {
    "/workspace".to_string()
}

fn default_stop_timeout() -> Duration {
    Duration::from_secs(10)
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// Bind-mount sources must be absolute, so relative roots resolve against the
/// current directory.
fn workspace_root(path: &Path) -> Result<PathBuf> {
    Ok(std::path::absolute(expand_home(path))?)
}

impl Default for Config {
    fn default() -> Self {
        Config {
            workspace: default_workspace(),
            mount_target: default_mount_target(),
            runtime: None,
            socket: None,
            start: StartPolicy::default(),
            stop_timeout: default_stop_timeout(),
            auto_start: false,
            terminal: None,
            catalog: Catalog::default(),
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty file is a valid config with every default.
        let config: Config = if yaml.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)?.with_env_overrides()
    }

    /// First config file present in `dir`.
    pub fn find(dir: &Path) -> Option<PathBuf> {
        [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ]
        .into_iter()
        .find(|path| path.exists())
    }

    /// Load the config file in `dir`, or defaults when there is none.
    pub fn discover(dir: &Path) -> Result<Self> {
        match Self::find(dir) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading config");
                Self::load(&path)
            }
            None => Config::default().validate()?.with_env_overrides(),
        }
    }

    fn validate(mut self) -> Result<Self> {
        if !self.mount_target.starts_with('/') {
            return Err(Error::InvalidConfig(format!(
                "mount_target must be an absolute container path, got '{}'",
                self.mount_target
            )));
        }
        if self.start.interval.is_zero() {
            return Err(Error::InvalidConfig(
                "start.interval must be greater than zero".to_string(),
            ));
        }
        if !self.start.backoff.is_finite() || self.start.backoff < 1.0 {
            return Err(Error::InvalidConfig(format!(
                "start.backoff must be a finite number of at least 1.0, got {}",
                self.start.backoff
            )));
        }
        if self.start.backoff > 1.0 && self.start.max_interval < self.start.interval {
            return Err(Error::InvalidConfig(format!(
                "start.max_interval ({:?}) must not be shorter than start.interval ({:?})",
                self.start.max_interval, self.start.interval
            )));
        }
        self.workspace = workspace_root(&self.workspace)?;
        Ok(self)
    }

    fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(workspace) = std::env::var_os(WORKSPACE_ENV).filter(|v| !v.is_empty()) {
            self.workspace = workspace_root(Path::new(&workspace))?;
        }
        Ok(self)
    }

    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            runtime: self.runtime,
            socket: self.socket.clone(),
        }
    }

    pub fn lifecycle_settings(&self) -> LifecycleSettings {
        LifecycleSettings {
            start: self.start.clone(),
            stop_timeout: self.stop_timeout,
            auto_start: self.auto_start,
        }
    }

    pub fn workspace(&self) -> Workspace {
        Workspace::new(self.workspace.clone(), self.mount_target.clone())
    }
}

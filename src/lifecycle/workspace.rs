// ABOUTME: Host-side workspace directories bind-mounted into containers.
// ABOUTME: One directory per container name plus per-run Dockerfile build directories.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::runtime::VolumeMount;

const BUILDS_DIR: &str = ".builds";

/// Root of all container workspaces on this machine.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    mount_target: String,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>, mount_target: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            mount_target: mount_target.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn container_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Create the container's directory if it does not exist yet.
    pub fn ensure_container_dir(&self, name: &str) -> io::Result<PathBuf> {
        let dir = self.container_dir(name);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Bind mount of the container's directory onto the in-container target.
    pub fn mount_for(&self, name: &str) -> VolumeMount {
        VolumeMount {
            source: self.container_dir(name).to_string_lossy().into_owned(),
            target: self.mount_target.clone(),
            read_only: false,
        }
    }

    /// Write `content` to `Dockerfile` in a fresh build directory.
    ///
    /// The directory is removed when the returned handle is dropped.
    pub fn write_dockerfile(&self, run_id: &str, content: &str) -> io::Result<TempDir> {
        let builds = self.root.join(BUILDS_DIR);
        std::fs::create_dir_all(&builds)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("{run_id}-"))
            .tempdir_in(&builds)?;
        std::fs::write(dir.path().join("Dockerfile"), content)?;
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_container_dir_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::new(tmp.path(), "/workspace");

        let first = ws.ensure_container_dir("dev").unwrap();
        std::fs::write(first.join("notes.txt"), "keep me").unwrap();
        let second = ws.ensure_container_dir("dev").unwrap();

        assert_eq!(first, second);
        assert_eq!(
            std::fs::read_to_string(second.join("notes.txt")).unwrap(),
            "keep me"
        );
    }

    #[test]
    fn mount_targets_configured_path() {
        let ws = Workspace::new("/srv/hangar", "/data");
        let mount = ws.mount_for("web");
        assert_eq!(mount.source, "/srv/hangar/web");
        assert_eq!(mount.target, "/data");
        assert!(!mount.read_only);
    }

    #[test]
    fn dockerfile_goes_into_its_own_build_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::new(tmp.path(), "/workspace");

        let dir = ws.write_dockerfile("run1", "FROM alpine\n").unwrap();
        let path = dir.path().to_path_buf();

        assert_eq!(path.parent(), Some(tmp.path().join(".builds").as_path()));
        assert_eq!(
            std::fs::read_to_string(path.join("Dockerfile")).unwrap(),
            "FROM alpine\n"
        );

        drop(dir);
        assert!(!path.exists());
    }
}

// ABOUTME: Turns a creation request into a concrete image to run.
// ABOUTME: Pulls catalog and custom images, builds Dockerfiles, looks up snapshots.

use crate::runtime::{BuildSpec, ImageOps};
use crate::snapshot::SnapshotRegistry;
use crate::types::ImageRef;

use super::error::{GatewayResultExt, LifecycleError, MissingKind};
use super::naming::base_name_from_image;
use super::request::CreationSource;
use super::workspace::Workspace;

/// Repository used to tag images built from Dockerfiles.
const BUILD_REPOSITORY: &str = "hangar-build";

/// The image a new container will run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    /// What to pass to the runtime's create call: a reference or an image id.
    pub reference: String,
    /// Fallback container name when none was requested.
    pub base_name: String,
}

impl ResolvedImage {
    fn from_reference(reference: String) -> Self {
        let base_name = base_name_from_image(&reference);
        Self {
            reference,
            base_name,
        }
    }
}

/// Registry repository for a catalog family: lower-cased, with `Node.js`
/// published as `node`.
pub fn normalize_family(family: &str) -> String {
    let lower = family.trim().to_lowercase();
    match lower.as_str() {
        "node.js" => "node".to_string(),
        _ => lower,
    }
}

/// Image reference for a catalog entry, e.g. `Node.js`/`18` → `node:18`.
pub fn catalog_reference(family: &str, version: &str) -> String {
    format!("{}:{}", normalize_family(family), version.trim())
}

/// Resolve `source` to an image, pulling or building as needed.
///
/// # Errors
///
/// - `NotFound` for a snapshot id the registry does not hold
/// - `InvalidRequest` for an unparsable custom reference or empty Dockerfile source
/// - `RuntimeOperationFailed` when the pull or build fails
/// - `Workspace` when an inline Dockerfile cannot be written
pub async fn resolve<R: ImageOps + ?Sized>(
    source: &CreationSource,
    snapshots: &SnapshotRegistry,
    runtime: &R,
    workspace: &Workspace,
) -> Result<ResolvedImage, LifecycleError> {
    match source {
        CreationSource::Catalog { family, version } => {
            let reference = catalog_reference(family, version);
            let parsed = parse_reference(&reference)?;
            tracing::debug!(image = %parsed, "pulling catalog image");
            runtime.pull_image(&parsed).await.during("pull")?;
            Ok(ResolvedImage::from_reference(reference))
        }

        CreationSource::Custom { image_ref } => {
            let parsed = parse_reference(image_ref)?;
            if let Some(snapshot) = snapshots.find_by_reference(&parsed) {
                tracing::debug!(
                    image = %parsed,
                    snapshot = %snapshot.snapshot_id.short(),
                    "custom image is a local snapshot; not pulling"
                );
            } else {
                tracing::debug!(image = %parsed, "pulling custom image");
                if let Err(e) = runtime.pull_image(&parsed).await {
                    // Images built or committed in an earlier session exist
                    // only locally and cannot be pulled.
                    if !runtime.image_exists(&parsed).await.unwrap_or(false) {
                        return Err(e).during("pull");
                    }
                    tracing::warn!(image = %parsed, error = %e, "pull failed; using local image");
                }
            }
            Ok(ResolvedImage::from_reference(image_ref.clone()))
        }

        CreationSource::Snapshot { snapshot_id } => {
            let snapshot = snapshots
                .get(snapshot_id)
                .ok_or_else(|| LifecycleError::NotFound {
                    kind: MissingKind::Snapshot,
                    id: snapshot_id.to_string(),
                })?;
            Ok(ResolvedImage {
                reference: snapshot.snapshot_id.to_string(),
                base_name: base_name_from_image(&snapshot.repository_tag),
            })
        }

        CreationSource::Dockerfile {
            path,
            inline_content,
        } => {
            let run_id = uuid::Uuid::new_v4().simple().to_string();
            // Holds the inline build directory until the build returns.
            let mut build_dir = None;
            let spec = match (inline_content.as_deref(), path) {
                (Some(content), _) if !content.trim().is_empty() => {
                    let dir = workspace.write_dockerfile(&run_id, content)?;
                    let context = dir.path().to_path_buf();
                    build_dir = Some(dir);
                    BuildSpec {
                        context,
                        dockerfile: "Dockerfile".to_string(),
                        tag: build_tag(&run_id),
                    }
                }
                (_, Some(path)) => {
                    let context = path
                        .parent()
                        .filter(|p| !p.as_os_str().is_empty())
                        .map(|p| p.to_path_buf())
                        .unwrap_or_else(|| std::path::PathBuf::from("."));
                    let dockerfile = path
                        .file_name()
                        .map(|f| f.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "Dockerfile".to_string());
                    BuildSpec {
                        context,
                        dockerfile,
                        tag: build_tag(&run_id),
                    }
                }
                _ => {
                    return Err(LifecycleError::InvalidRequest(
                        "Dockerfile needs a path or inline content".to_string(),
                    ));
                }
            };

            tracing::debug!(context = %spec.context.display(), tag = %spec.tag, "building image");
            let built = runtime.build_image(&spec).await.during("build");
            if let Some(dir) = build_dir
                && let Err(e) = dir.close()
            {
                tracing::warn!(context = %spec.context.display(), error = %e, "could not remove build directory");
            }
            Ok(ResolvedImage::from_reference(built?))
        }
    }
}

fn build_tag(run_id: &str) -> String {
    format!("{}:{}", BUILD_REPOSITORY, &run_id[..run_id.len().min(12)])
}

fn parse_reference(reference: &str) -> Result<ImageRef, LifecycleError> {
    ImageRef::parse(reference)
        .map_err(|e| LifecycleError::InvalidRequest(format!("{}: {}", reference, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::LifecycleErrorKind;
    use crate::runtime::fake::{Call, FakeRuntime};
    use crate::snapshot::Snapshot;
    use crate::types::{ContainerId, SnapshotId};

    fn workspace() -> (tempfile::TempDir, Workspace) {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::new(tmp.path(), "/workspace");
        (tmp, ws)
    }

    #[test]
    fn catalog_references_are_normalized() {
        assert_eq!(catalog_reference("Node.js", "18"), "node:18");
        assert_eq!(catalog_reference("Ubuntu", "22.04"), "ubuntu:22.04");
        assert_eq!(catalog_reference("PostgreSQL", "16"), "postgresql:16");
    }

    #[tokio::test]
    async fn catalog_pulls_normalized_reference() {
        let (_tmp, ws) = workspace();
        let runtime = FakeRuntime::new();
        let registry = SnapshotRegistry::new();

        let source = CreationSource::Catalog {
            family: "Node.js".to_string(),
            version: "18".to_string(),
        };
        let resolved = resolve(&source, &registry, &runtime, &ws).await.unwrap();

        assert_eq!(resolved.reference, "node:18");
        assert_eq!(resolved.base_name, "node");
        assert_eq!(runtime.calls(), vec![Call::Pull("node:18".to_string())]);
    }

    #[tokio::test]
    async fn unknown_snapshot_is_not_found_without_pull() {
        let (_tmp, ws) = workspace();
        let runtime = FakeRuntime::new();
        let registry = SnapshotRegistry::new();

        let source = CreationSource::Snapshot {
            snapshot_id: SnapshotId::new("sha256:missing"),
        };
        let err = resolve(&source, &registry, &runtime, &ws).await.unwrap_err();

        assert_eq!(err.kind(), LifecycleErrorKind::NotFound);
        assert!(runtime.calls().is_empty());
    }

    #[tokio::test]
    async fn registered_snapshot_resolves_to_its_id() {
        let (_tmp, ws) = workspace();
        let runtime = FakeRuntime::new();
        let registry = SnapshotRegistry::new();
        registry.put(Snapshot::new(
            SnapshotId::new("sha256:feed"),
            ContainerId::new("c1"),
            "devbox",
        ));

        let source = CreationSource::Snapshot {
            snapshot_id: SnapshotId::new("sha256:feed"),
        };
        let resolved = resolve(&source, &registry, &runtime, &ws).await.unwrap();

        assert_eq!(resolved.reference, "sha256:feed");
        assert_eq!(resolved.base_name, "devbox");
        assert!(runtime.calls().is_empty());
    }

    #[tokio::test]
    async fn custom_image_is_pulled() {
        let (_tmp, ws) = workspace();
        let runtime = FakeRuntime::new();
        let registry = SnapshotRegistry::new();

        let source = CreationSource::Custom {
            image_ref: "ghcr.io/acme/tool:1.0".to_string(),
        };
        let resolved = resolve(&source, &registry, &runtime, &ws).await.unwrap();

        assert_eq!(resolved.reference, "ghcr.io/acme/tool:1.0");
        assert_eq!(resolved.base_name, "tool");
        assert_eq!(runtime.count(|c| matches!(c, Call::Pull(_))), 1);
    }

    #[tokio::test]
    async fn custom_image_matching_snapshot_tag_skips_pull() {
        let (_tmp, ws) = workspace();
        let runtime = FakeRuntime::new();
        let registry = SnapshotRegistry::new();
        registry.put(Snapshot::new(
            SnapshotId::new("sha256:feed"),
            ContainerId::new("c1"),
            "devbox",
        ));

        let source = CreationSource::Custom {
            image_ref: "devbox".to_string(),
        };
        let resolved = resolve(&source, &registry, &runtime, &ws).await.unwrap();

        assert_eq!(resolved.reference, "devbox");
        assert!(runtime.calls().is_empty());
    }

    #[tokio::test]
    async fn unpullable_custom_image_present_locally_is_used() {
        let (_tmp, ws) = workspace();
        let runtime = FakeRuntime::new().with_local_image("devbox:old");
        runtime.fail("pull");
        let registry = SnapshotRegistry::new();

        let source = CreationSource::Custom {
            image_ref: "devbox:old".to_string(),
        };
        let resolved = resolve(&source, &registry, &runtime, &ws).await.unwrap();

        assert_eq!(resolved.reference, "devbox:old");
        assert_eq!(runtime.count(|c| matches!(c, Call::Pull(_))), 1);
    }

    #[tokio::test]
    async fn unpullable_custom_image_missing_locally_fails() {
        let (_tmp, ws) = workspace();
        let runtime = FakeRuntime::new();
        runtime.fail("pull");
        let registry = SnapshotRegistry::new();

        let source = CreationSource::Custom {
            image_ref: "ghcr.io/acme/tool:1.0".to_string(),
        };
        let err = resolve(&source, &registry, &runtime, &ws).await.unwrap_err();

        assert_eq!(err.kind(), LifecycleErrorKind::RuntimeOperationFailed);
        assert!(err.to_string().starts_with("pull failed"));
    }

    #[tokio::test]
    async fn pull_failure_is_runtime_operation_failed() {
        let (_tmp, ws) = workspace();
        let runtime = FakeRuntime::new();
        runtime.fail("pull");
        let registry = SnapshotRegistry::new();

        let source = CreationSource::Catalog {
            family: "Ubuntu".to_string(),
            version: "22.04".to_string(),
        };
        let err = resolve(&source, &registry, &runtime, &ws).await.unwrap_err();

        assert_eq!(err.kind(), LifecycleErrorKind::RuntimeOperationFailed);
        assert!(err.to_string().starts_with("pull failed"));
    }

    #[tokio::test]
    async fn inline_dockerfile_is_written_then_built() {
        let (tmp, ws) = workspace();
        let runtime = FakeRuntime::new();
        let registry = SnapshotRegistry::new();

        let source = CreationSource::Dockerfile {
            path: None,
            inline_content: Some("FROM alpine\nRUN true\n".to_string()),
        };
        let resolved = resolve(&source, &registry, &runtime, &ws).await.unwrap();

        assert!(resolved.reference.starts_with("hangar-build:"));
        assert_eq!(resolved.base_name, "hangar-build");
        assert_eq!(
            runtime.last_build_dockerfile().as_deref(),
            Some("FROM alpine\nRUN true\n")
        );
        let builds = tmp.path().join(".builds");
        assert!(builds.is_dir());
        assert_eq!(std::fs::read_dir(&builds).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn failed_inline_build_removes_its_directory() {
        let (tmp, ws) = workspace();
        let runtime = FakeRuntime::new();
        runtime.fail("build");
        let registry = SnapshotRegistry::new();

        let source = CreationSource::Dockerfile {
            path: None,
            inline_content: Some("FROM alpine\n".to_string()),
        };
        let err = resolve(&source, &registry, &runtime, &ws).await.unwrap_err();

        assert_eq!(err.kind(), LifecycleErrorKind::RuntimeOperationFailed);
        let builds = tmp.path().join(".builds");
        assert_eq!(std::fs::read_dir(&builds).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn dockerfile_path_builds_from_its_directory() {
        let (_tmp, ws) = workspace();
        let project = tempfile::tempdir().unwrap();
        let path = project.path().join("Dockerfile.dev");
        std::fs::write(&path, "FROM debian\n").unwrap();
        let runtime = FakeRuntime::new();
        let registry = SnapshotRegistry::new();

        let source = CreationSource::Dockerfile {
            path: Some(path),
            inline_content: None,
        };
        resolve(&source, &registry, &runtime, &ws).await.unwrap();

        assert!(matches!(
            runtime.calls().as_slice(),
            [Call::Build { dockerfile, .. }] if dockerfile == "Dockerfile.dev"
        ));
        assert_eq!(runtime.last_build_dockerfile().as_deref(), Some("FROM debian\n"));
    }
}

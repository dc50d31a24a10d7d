// ABOUTME: Creation requests and the dialog-level draft they are validated from.
// ABOUTME: A request names exactly one image source plus an optional container name.

use std::path::PathBuf;

use crate::config::Catalog;
use crate::types::{ContainerName, SnapshotId};

use super::error::LifecycleError;

/// Where the image for a new container comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreationSource {
    /// Curated family and version, e.g. `Node.js` / `18`.
    Catalog { family: String, version: String },
    /// A literal image reference.
    Custom { image_ref: String },
    /// An image previously committed from a container.
    Snapshot { snapshot_id: SnapshotId },
    /// Build from a Dockerfile. Non-empty inline content wins over the path.
    Dockerfile {
        path: Option<PathBuf>,
        inline_content: Option<String>,
    },
}

impl CreationSource {
    /// Short label used in log messages.
    pub fn label(&self) -> &'static str {
        match self {
            CreationSource::Catalog { .. } => "catalog",
            CreationSource::Custom { .. } => "custom",
            CreationSource::Snapshot { .. } => "snapshot",
            CreationSource::Dockerfile { .. } => "dockerfile",
        }
    }
}

/// A validated creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationRequest {
    pub requested_name: Option<ContainerName>,
    pub source: CreationSource,
}

impl CreationRequest {
    pub fn new(source: CreationSource) -> Self {
        Self {
            requested_name: None,
            source,
        }
    }

    pub fn named(mut self, name: ContainerName) -> Self {
        self.requested_name = Some(name);
        self
    }

    pub fn catalog(family: impl Into<String>, version: impl Into<String>) -> Self {
        Self::new(CreationSource::Catalog {
            family: family.into(),
            version: version.into(),
        })
    }

    pub fn custom(image_ref: impl Into<String>) -> Self {
        Self::new(CreationSource::Custom {
            image_ref: image_ref.into(),
        })
    }

    pub fn snapshot(snapshot_id: SnapshotId) -> Self {
        Self::new(CreationSource::Snapshot { snapshot_id })
    }

    pub fn dockerfile_inline(content: impl Into<String>) -> Self {
        Self::new(CreationSource::Dockerfile {
            path: None,
            inline_content: Some(content.into()),
        })
    }

    pub fn dockerfile_path(path: impl Into<PathBuf>) -> Self {
        Self::new(CreationSource::Dockerfile {
            path: Some(path.into()),
            inline_content: None,
        })
    }
}

/// Catalog selection as entered; the version may be left to the catalog default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogChoice {
    pub family: String,
    pub version: Option<String>,
}

/// Dockerfile selection as entered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DockerfileChoice {
    pub path: Option<PathBuf>,
    pub inline_content: Option<String>,
}

/// Unvalidated creation input: a name plus one toggle per source.
///
/// Several toggles may be filled in while editing; [`CreationDraft::into_request`]
/// insists that exactly one is set when submitting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreationDraft {
    pub name: Option<String>,
    pub catalog: Option<CatalogChoice>,
    pub custom: Option<String>,
    pub snapshot: Option<String>,
    pub dockerfile: Option<DockerfileChoice>,
}

impl CreationDraft {
    /// Validate the draft.
    ///
    /// # Errors
    ///
    /// Returns `LifecycleError::InvalidRequest` when zero or several sources are
    /// set, the name is not a valid container name, or the chosen source is
    /// incomplete.
    pub fn into_request(self, catalog: &Catalog) -> Result<CreationRequest, LifecycleError> {
        let requested_name = match self.name.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(name) => Some(
                ContainerName::new(name)
                    .map_err(|e| LifecycleError::InvalidRequest(e.to_string()))?,
            ),
        };

        let source = match (self.catalog, self.custom, self.snapshot, self.dockerfile) {
            (Some(choice), None, None, None) => catalog_source(choice, catalog)?,
            (None, Some(image_ref), None, None) => custom_source(image_ref)?,
            (None, None, Some(id), None) => snapshot_source(id)?,
            (None, None, None, Some(choice)) => dockerfile_source(choice)?,
            (None, None, None, None) => {
                return Err(LifecycleError::InvalidRequest(
                    "no image source selected".to_string(),
                ));
            }
            (c, i, s, d) => {
                let n = [c.is_some(), i.is_some(), s.is_some(), d.is_some()]
                    .into_iter()
                    .filter(|set| *set)
                    .count();
                return Err(LifecycleError::InvalidRequest(format!(
                    "{} image sources selected, expected exactly one",
                    n
                )));
            }
        };

        Ok(CreationRequest {
            requested_name,
            source,
        })
    }
}

fn catalog_source(choice: CatalogChoice, catalog: &Catalog) -> Result<CreationSource, LifecycleError> {
    let family = choice.family.trim().to_string();
    if family.is_empty() {
        return Err(LifecycleError::InvalidRequest(
            "catalog family is empty".to_string(),
        ));
    }
    let version = match choice.version.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => v,
        _ => catalog
            .default_version(&family)
            .map(str::to_string)
            .ok_or_else(|| {
                LifecycleError::InvalidRequest(format!(
                    "no version given and {} is not in the catalog",
                    family
                ))
            })?,
    };
    Ok(CreationSource::Catalog { family, version })
}

fn custom_source(image_ref: String) -> Result<CreationSource, LifecycleError> {
    let image_ref = image_ref.trim().to_string();
    if image_ref.is_empty() {
        return Err(LifecycleError::InvalidRequest(
            "custom image is empty".to_string(),
        ));
    }
    Ok(CreationSource::Custom { image_ref })
}

fn snapshot_source(id: String) -> Result<CreationSource, LifecycleError> {
    let id = id.trim().to_string();
    if id.is_empty() {
        return Err(LifecycleError::InvalidRequest(
            "snapshot id is empty".to_string(),
        ));
    }
    Ok(CreationSource::Snapshot {
        snapshot_id: SnapshotId::new(id),
    })
}

fn dockerfile_source(choice: DockerfileChoice) -> Result<CreationSource, LifecycleError> {
    let inline_content = choice.inline_content.filter(|c| !c.trim().is_empty());
    match (&inline_content, &choice.path) {
        (Some(_), _) => {}
        (None, Some(path)) if path.is_file() => {}
        (None, Some(path)) => {
            return Err(LifecycleError::InvalidRequest(format!(
                "Dockerfile not found: {}",
                path.display()
            )));
        }
        (None, None) => {
            return Err(LifecycleError::InvalidRequest(
                "Dockerfile needs a path or inline content".to_string(),
            ));
        }
    }
    Ok(CreationSource::Dockerfile {
        path: choice.path,
        inline_content,
    })
}

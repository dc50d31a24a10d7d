// ABOUTME: In-memory registry of images committed from containers.
// ABOUTME: Shared between the orchestrator and the creation request resolver.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::types::{ContainerId, ImageRef, SnapshotId};

/// An image captured from a container's filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub snapshot_id: SnapshotId,
    pub source_container_id: ContainerId,
    /// Repository name chosen when committing.
    pub repository_tag: String,
    pub created_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(
        snapshot_id: SnapshotId,
        source_container_id: ContainerId,
        repository_tag: impl Into<String>,
    ) -> Self {
        Self {
            snapshot_id,
            source_container_id,
            repository_tag: repository_tag.into(),
            created_at: Utc::now(),
        }
    }
}

/// Snapshots recorded during this process's lifetime, keyed by snapshot id.
///
/// Nothing is persisted. The committed images outlive the process, their
/// registry entries do not.
#[derive(Debug, Default)]
pub struct SnapshotRegistry {
    entries: RwLock<HashMap<SnapshotId, Snapshot>>,
}

impl SnapshotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a snapshot, replacing any entry with the same id.
    pub fn put(&self, snapshot: Snapshot) {
        self.entries
            .write()
            .insert(snapshot.snapshot_id.clone(), snapshot);
    }

    pub fn get(&self, id: &SnapshotId) -> Option<Snapshot> {
        self.entries.read().get(id).cloned()
    }

    /// All snapshots, oldest first.
    pub fn all(&self) -> Vec<Snapshot> {
        let mut all: Vec<Snapshot> = self.entries.read().values().cloned().collect();
        all.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.snapshot_id.as_str().cmp(b.snapshot_id.as_str()))
        });
        all
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Find the snapshot whose repository tag names the same image as `reference`.
    pub fn find_by_reference(&self, reference: &ImageRef) -> Option<Snapshot> {
        self.entries
            .read()
            .values()
            .find(|s| {
                ImageRef::parse(&s.repository_tag)
                    .map(|tag| &tag == reference)
                    .unwrap_or(false)
            })
            .cloned()
    }
}

// ABOUTME: Read model of every container the runtime knows about.
// ABOUTME: Rebuilt wholesale from a runtime listing; never merged incrementally.

use std::collections::HashSet;

use serde::Serialize;

use crate::runtime::{ContainerState, ContainerSummary};
use crate::types::ContainerId;

/// One container as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerRecord {
    pub id: ContainerId,
    pub name: String,
    /// Image reference, `"none"` when the runtime reports an empty one.
    pub image: String,
    pub state: ContainerState,
    /// Runtime's human readable status, e.g. "Up 5 minutes".
    pub status: String,
}

impl From<ContainerSummary> for ContainerRecord {
    fn from(summary: ContainerSummary) -> Self {
        let image = if summary.image.trim().is_empty() {
            "none".to_string()
        } else {
            summary.image
        };
        Self {
            id: summary.id,
            name: summary.name,
            image,
            state: summary.state,
            status: summary.status,
        }
    }
}

/// Last known list of containers.
#[derive(Debug, Clone, Default)]
pub struct ContainerDirectory {
    records: Vec<ContainerRecord>,
}

impl ContainerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all records, sorted by name.
    pub fn replace(&mut self, mut records: Vec<ContainerRecord>) {
        records.sort_by(|a, b| a.name.cmp(&b.name));
        self.records = records;
    }

    pub fn records(&self) -> &[ContainerRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn names(&self) -> HashSet<String> {
        self.records.iter().map(|r| r.name.clone()).collect()
    }

    pub fn get(&self, id: &ContainerId) -> Option<&ContainerRecord> {
        self.records.iter().find(|r| &r.id == id)
    }

    /// Look up by exact name, full id, or id prefix.
    pub fn find(&self, key: &str) -> Option<&ContainerRecord> {
        self.records
            .iter()
            .find(|r| r.name == key)
            .or_else(|| self.records.iter().find(|r| r.id.as_str() == key))
            .or_else(|| {
                let mut matches = self
                    .records
                    .iter()
                    .filter(|r| !key.is_empty() && r.id.as_str().starts_with(key));
                match (matches.next(), matches.next()) {
                    (Some(only), None) => Some(only),
                    _ => None,
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn summary(id: &str, name: &str, image: &str) -> ContainerSummary {
        ContainerSummary {
            id: ContainerId::new(id),
            name: name.to_string(),
            image: image.to_string(),
            state: ContainerState::Running,
            status: "Up 1 minute".to_string(),
            labels: HashMap::new(),
        }
    }

    #[test]
    fn empty_image_shows_as_none() {
        let record = ContainerRecord::from(summary("abc", "dev", ""));
        assert_eq!(record.image, "none");
    }

    #[test]
    fn replace_is_wholesale_and_sorted() {
        let mut dir = ContainerDirectory::new();
        dir.replace(vec![summary("1", "zeta", "a").into(), summary("2", "alpha", "b").into()]);
        dir.replace(vec![summary("3", "mid", "c").into(), summary("4", "beta", "d").into()]);

        let names: Vec<&str> = dir.records().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["beta", "mid"]);
    }

    #[test]
    fn find_by_name_id_or_unique_prefix() {
        let mut dir = ContainerDirectory::new();
        dir.replace(vec![
            summary("abc123", "web", "nginx").into(),
            summary("abd456", "db", "postgres").into(),
        ]);

        assert_eq!(dir.find("web").unwrap().id.as_str(), "abc123");
        assert_eq!(dir.find("abd456").unwrap().name, "db");
        assert_eq!(dir.find("abc").unwrap().name, "web");
        assert!(dir.find("ab").is_none());
        assert!(dir.find("").is_none());
    }
}

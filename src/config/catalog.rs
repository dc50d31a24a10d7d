// ABOUTME: Curated catalog of image families and their versions.
// ABOUTME: Ships a built-in list; hangar.yml may replace it.

use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};

use super::deserialize::deserialize_versions;

/// One family, e.g. `Node.js` with versions `20, 18, 16, latest`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CatalogFamily {
    pub name: String,
    /// First entry is the default.
    #[serde(deserialize_with = "deserialize_versions")]
    pub versions: NonEmpty<String>,
}

impl CatalogFamily {
    fn new(name: &str, first: &str, rest: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            versions: NonEmpty {
                head: first.to_string(),
                tail: rest.iter().map(|v| v.to_string()).collect(),
            },
        }
    }
}

/// Ordered list of catalog families.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Catalog {
    families: Vec<CatalogFamily>,
}

impl Catalog {
    pub fn new(families: Vec<CatalogFamily>) -> Self {
        Self { families }
    }

    pub fn families(&self) -> &[CatalogFamily] {
        &self.families
    }

    /// Case-insensitive lookup by family name.
    pub fn find(&self, family: &str) -> Option<&CatalogFamily> {
        let family = family.trim();
        self.families
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(family))
    }

    pub fn default_version(&self, family: &str) -> Option<&str> {
        self.find(family).map(|f| f.versions.head.as_str())
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(vec![
            CatalogFamily::new("Ubuntu", "22.04", &["20.04", "18.04", "latest"]),
            CatalogFamily::new("Debian", "12", &["11", "10", "latest"]),
            CatalogFamily::new("Alpine", "3.19", &["3.18", "3.17", "latest"]),
            CatalogFamily::new("CentOS", "7", &["latest"]),
            CatalogFamily::new("Fedora", "39", &["38", "latest"]),
            CatalogFamily::new("Python", "3.12", &["3.11", "3.10", "latest"]),
            CatalogFamily::new("Node.js", "20", &["18", "16", "latest"]),
            CatalogFamily::new("Nginx", "1.24", &["1.22", "latest"]),
            CatalogFamily::new("Redis", "7.2", &["7.0", "latest"]),
            CatalogFamily::new("PostgreSQL", "16", &["15", "14", "latest"]),
            CatalogFamily::new("MySQL", "8.2", &["8.0", "latest"]),
            CatalogFamily::new("MongoDB", "7.0", &["6.0", "latest"]),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_catalog_has_twelve_families() {
        let catalog = Catalog::default();
        assert_eq!(catalog.families().len(), 12);
        assert!(
            catalog
                .families()
                .iter()
                .all(|f| f.versions.last() == "latest")
        );
    }

    #[test]
    fn lookup_ignores_case() {
        let catalog = Catalog::default();
        assert_eq!(catalog.find("node.js").unwrap().name, "Node.js");
        assert_eq!(catalog.default_version("POSTGRESQL"), Some("16"));
        assert_eq!(catalog.default_version("haskell"), None);
    }

    #[test]
    fn parses_from_yaml_list() {
        let yaml = r#"
- name: Rust
  versions: ["1.80", "latest"]
"#;
        let catalog: Catalog = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(catalog.default_version("rust"), Some("1.80"));
    }

    #[test]
    fn empty_version_list_is_rejected() {
        let yaml = r#"
- name: Rust
  versions: []
"#;
        let err = serde_yaml::from_str::<Catalog>(yaml).unwrap_err();
        assert!(err.to_string().contains("at least one version"));
    }
}

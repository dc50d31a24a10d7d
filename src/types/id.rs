// ABOUTME: Phantom-typed identifiers for runtime objects.
// ABOUTME: Keeps container and snapshot ids from being mixed up.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Marker types. Empty enums cannot be instantiated and need no trait bounds.
pub enum ContainerMarker {}
pub enum SnapshotMarker {}

/// Length of the abbreviated id shown to users.
const SHORT_LEN: usize = 12;

/// An opaque runtime identifier tagged with the kind of object it names.
#[must_use = "IDs reference resources and should not be ignored"]
pub struct Id<T> {
    value: String,
    _marker: PhantomData<T>,
}

impl<T> Id<T> {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn into_inner(self) -> String {
        self.value
    }

    /// Abbreviated form: digest algorithm prefix dropped, first 12 characters.
    pub fn short(&self) -> &str {
        let hex = self
            .value
            .split_once(':')
            .map(|(_, rest)| rest)
            .unwrap_or(&self.value);
        match hex.char_indices().nth(SHORT_LEN) {
            Some((idx, _)) => &hex[..idx],
            None => hex,
        }
    }
}

// Manual impls so that T needs no bounds of its own.

impl<T> std::fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Id").field("value", &self.value).finish()
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Id<T> {}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T> std::fmt::Display for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::new(value))
    }
}

pub type ContainerId = Id<ContainerMarker>;
pub type SnapshotId = Id<SnapshotMarker>;

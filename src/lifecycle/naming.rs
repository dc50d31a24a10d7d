// ABOUTME: Unique container name generation.
// ABOUTME: Derives a base name from an image reference and appends a counter on collision.

use std::collections::HashSet;

/// Return `base` if no existing container uses it, otherwise the first free
/// `base1`, `base2`, ...
pub fn resolve_name(base: &str, existing: &HashSet<String>) -> String {
    if !existing.contains(base) {
        return base.to_string();
    }

    (1u64..)
        .map(|n| format!("{}{}", base, n))
        .find(|candidate| !existing.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Fallback base name for an image reference: the last path component with
/// tag and digest removed (`docker.io/library/ubuntu:22.04` → `ubuntu`).
pub fn base_name_from_image(reference: &str) -> String {
    let without_digest = reference.split('@').next().unwrap_or(reference);
    let last = without_digest.rsplit('/').next().unwrap_or(without_digest);
    let name = last.split(':').next().unwrap_or(last);
    if name.is_empty() {
        "container".to_string()
    } else {
        name.to_string()
    }
}

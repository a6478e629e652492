//! The `manifest.json` sidecar, grounded on the teacher's
//! `output/command.rs` JSON conventions and the codebase intelligence crate's
//! `storage/metadata.rs` manifest-with-version pattern.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    pub tool_version: String,
    pub manifest_version: u32,
    pub indexed_at: String,
    pub file_hashes: HashMap<String, String>,
}

/// Bumped only on incompatible on-disk layout changes; unrelated to
/// `tool_version`'s semver (compatibility check uses `tool_version`'s
/// major.minor, not this field, but an old `manifest_version` is still reason
/// to discard a cache outright).
pub const CURRENT_MANIFEST_VERSION: u32 = 1;

impl Manifest {
    pub fn new(file_hashes: HashMap<String, String>) -> Self {
        Manifest {
            tool_version: crate::version::package_version().to_string(),
            manifest_version: CURRENT_MANIFEST_VERSION,
            indexed_at: chrono::Utc::now().to_rfc3339(),
            file_hashes,
        }
    }

    /// A cache is compatible iff `major.minor` matches the running tool's
    /// and the manifest layout version matches exactly.
    pub fn is_compatible(&self) -> bool {
        if self.manifest_version != CURRENT_MANIFEST_VERSION {
            return false;
        }
        let (major, minor) = crate::version::cache_compat_version();
        let mut parts = self.tool_version.split('.');
        let cached_major: u32 = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
        let cached_minor: u32 = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
        cached_major == major && cached_minor == minor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_manifest_is_compatible_with_itself() {
        let manifest = Manifest::new(HashMap::new());
        assert!(manifest.is_compatible());
    }

    #[test]
    fn mismatched_minor_version_is_incompatible() {
        let mut manifest = Manifest::new(HashMap::new());
        manifest.tool_version = "0.99.0".to_string();
        assert!(!manifest.is_compatible());
    }

    #[test]
    fn mismatched_manifest_layout_is_incompatible() {
        let mut manifest = Manifest::new(HashMap::new());
        manifest.manifest_version = CURRENT_MANIFEST_VERSION + 1;
        assert!(!manifest.is_compatible());
    }
}

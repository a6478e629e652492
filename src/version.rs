//! Version and build information for scip-index.
//!
//! Provides version string and build metadata (commit SHA, build date, rustc version).
//! Also carries the cache compatibility version used by [`crate::cache`]:
//! caches are compatible across patch releases but not across minor/major bumps.

/// Get the full version string including build metadata
///
/// Returns format: "scip-index {version} ({commit} {date}) rustc {rustc_version}"
pub fn version() -> String {
    let version = env!("CARGO_PKG_VERSION");
    let commit = build_commit();
    let date = build_date();
    let rustc_version = rustc_version();

    format!("scip-index {} ({} {}) rustc {}", version, commit, date, rustc_version)
}

/// Get the package version (e.g., "0.1.0")
pub fn package_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Get the build commit SHA
///
/// Returns "unknown" if not built with commit info
pub fn build_commit() -> &'static str {
    option_env!("SCIP_INDEX_COMMIT_SHA").unwrap_or("unknown")
}

/// Get the build date
///
/// Returns "unknown" if not built with date info
pub fn build_date() -> &'static str {
    option_env!("SCIP_INDEX_BUILD_DATE").unwrap_or("unknown")
}

/// Get the Rust compiler version used for the build
///
/// Returns "unknown" if not built with rustc version info
pub fn rustc_version() -> &'static str {
    option_env!("SCIP_INDEX_RUSTC_VERSION").unwrap_or("unknown")
}

/// `(major, minor)` of [`package_version`], used by the cache compatibility
/// check: a cache is compatible iff major and minor match;
/// patch differences are compatible.
pub fn cache_compat_version() -> (u32, u32) {
    let mut parts = package_version().split('.');
    let major = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    (major, minor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_compat_version_parses_semver() {
        let (major, minor) = cache_compat_version();
        assert_eq!((major, minor), (0, 1));
    }
}

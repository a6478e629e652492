//! Layered configuration: defaults → TOML file → environment variables.
//!
//! Mirrors the codebase intelligence crate's `figment`-based settings
//! layering, with the prefix and section names adapted to this tool. Env
//! vars use `SCIP_INDEX_` with `__` separating nested keys, e.g.
//! `SCIP_INDEX_CACHE__MAX_SIZE_BYTES=1000000`.

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub watcher: WatcherConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Override for the global cache directory (`<TOOL>_CACHE`).
    pub directory: Option<PathBuf>,
    #[serde(default = "default_max_cache_bytes")]
    pub max_size_bytes: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatcherConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_true")]
    pub gitignore_aware: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub default: String,
    #[serde(default)]
    pub modules: std::collections::HashMap<String, String>,
}

fn default_max_cache_bytes() -> u64 {
    256 * 1024 * 1024
}
fn default_debounce_ms() -> u64 {
    500
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: None,
            max_size_bytes: default_max_cache_bytes(),
        }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            gitignore_aware: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: Default::default(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            watcher: WatcherConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Settings {
    /// Load configuration from defaults, an optional `scip-index.toml` in the
    /// current directory, and `SCIP_INDEX_*` environment variables.
    pub fn load() -> Result<Self, figment::Error> {
        let mut settings: Settings = Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file("scip-index.toml"))
            .merge(
                Env::prefixed("SCIP_INDEX_").map(|key| key.as_str().to_lowercase().replace("__", ".").into()),
            )
            .extract()?;

        if let Ok(dir) = std::env::var("SCIP_INDEX_CACHE") {
            settings.cache.directory = Some(PathBuf::from(dir));
        }
        Ok(settings)
    }

    /// Resolve the global cache directory: explicit config/env override, else
    /// the platform cache dir, else `~/.scip-index`.
    pub fn cache_dir(&self) -> PathBuf {
        if let Some(dir) = &self.cache.directory {
            return dir.clone();
        }
        dirs::cache_dir()
            .map(|d| d.join("scip-index"))
            .unwrap_or_else(|| PathBuf::from(".scip-index"))
    }
}

//! Multi-source config loading with priority merging.
//!
//! Priority order (highest wins):
//!   CLI flags > Environment vars > Project config > User config > Defaults

use std::path::Path;

use super::schema::NimdexConfig;

/// CLI-level overrides, applied last.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub db_path: Option<String>,
    pub host: Option<String>,
    pub model: Option<String>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Load configuration from all available sources and merge them.
///
/// Sources (low → high priority):
///   1. Built-in defaults
///   2. User config (`~/.config/nimdex/config.yaml`, platform-specific)
///   3. Project config (`.nimdex.yaml` in `project_dir`)
///   4. Environment variables (`NIMDEX_*`)
///   5. CLI overrides
pub fn load_config(project_dir: Option<&Path>, overrides: &ConfigOverrides) -> NimdexConfig {
    let mut config = NimdexConfig::default();

    if let Some(user) = load_user_config() {
        config = merge_configs(config, user);
    }

    if let Some(dir) = project_dir {
        if let Some(project) = load_project_config(dir) {
            config = merge_configs(config, project);
        }
    }

    load_env_overrides(&mut config);

    if let Some(path) = &overrides.db_path {
        config.database.path = path.clone();
    }
    if let Some(host) = &overrides.host {
        config.embedding.host = host.clone();
    }
    if let Some(model) = &overrides.model {
        config.embedding.model = model.clone();
    }

    config
}

/// Load user config from the platform-specific config directory.
///
/// Returns `None` if the file does not exist or is unparseable.
pub fn load_user_config() -> Option<NimdexConfig> {
    let path = user_config_path()?;
    load_config_file(&path)
}

/// Load project config from `.nimdex.yaml` in the given directory.
///
/// Returns `None` if the file does not exist or is unparseable.
pub fn load_project_config(dir: &Path) -> Option<NimdexConfig> {
    load_config_file(&dir.join(".nimdex.yaml"))
}

/// Apply environment variable overrides to a config in place.
///
/// Supported variables: `NIMDEX_DB_PATH`, `NIMDEX_POOL_SIZE`,
/// `NIMDEX_EMBEDDING_HOST`, `NIMDEX_EMBEDDING_MODEL`, `NIMDEX_BATCH_SIZE`,
/// `NIMDEX_SIMILARITY_THRESHOLD`, `NIMDEX_MAX_FILE_SIZE`. Unparseable
/// numeric values are ignored.
pub fn load_env_overrides(config: &mut NimdexConfig) {
    if let Ok(val) = std::env::var("NIMDEX_DB_PATH") {
        if !val.is_empty() {
            config.database.path = val;
        }
    }
    if let Ok(val) = std::env::var("NIMDEX_POOL_SIZE") {
        if let Ok(size) = val.parse() {
            config.database.pool_size = size;
        }
    }
    if let Ok(val) = std::env::var("NIMDEX_EMBEDDING_HOST") {
        if !val.is_empty() {
            config.embedding.host = val;
        }
    }
    if let Ok(val) = std::env::var("NIMDEX_EMBEDDING_MODEL") {
        if !val.is_empty() {
            config.embedding.model = val;
        }
    }
    if let Ok(val) = std::env::var("NIMDEX_BATCH_SIZE") {
        if let Ok(size) = val.parse() {
            config.embedding.batch_size = size;
        }
    }
    if let Ok(val) = std::env::var("NIMDEX_SIMILARITY_THRESHOLD") {
        if let Ok(threshold) = val.parse() {
            config.embedding.similarity_threshold = threshold;
        }
    }
    if let Ok(val) = std::env::var("NIMDEX_MAX_FILE_SIZE") {
        if let Ok(size) = val.parse() {
            config.indexing.max_file_size = size;
        }
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Platform-specific user config path via the `directories` crate.
fn user_config_path() -> Option<std::path::PathBuf> {
    directories::ProjectDirs::from("dev", "nimdex", "nimdex")
        .map(|dirs| dirs.config_dir().join("config.yaml"))
}

/// Try to load and parse a YAML config file. Returns `None` on any error.
fn load_config_file(path: &Path) -> Option<NimdexConfig> {
    let contents = std::fs::read_to_string(path).ok()?;
    serde_yaml::from_str(&contents).ok()
}

/// Merge two configs: `overlay` fields that differ from the built-in
/// defaults take priority over `base`. A field left at its default in the
/// overlay cannot clobber an explicit value from a lower layer.
fn merge_configs(mut base: NimdexConfig, overlay: NimdexConfig) -> NimdexConfig {
    let defaults = NimdexConfig::default();

    if overlay.database.path != defaults.database.path {
        base.database.path = overlay.database.path;
    }
    if overlay.database.pool_size != defaults.database.pool_size {
        base.database.pool_size = overlay.database.pool_size;
    }

    if overlay.embedding.host != defaults.embedding.host {
        base.embedding.host = overlay.embedding.host;
    }
    if overlay.embedding.model != defaults.embedding.model {
        base.embedding.model = overlay.embedding.model;
    }
    if overlay.embedding.batch_size != defaults.embedding.batch_size {
        base.embedding.batch_size = overlay.embedding.batch_size;
    }
    if overlay.embedding.similarity_threshold != defaults.embedding.similarity_threshold {
        base.embedding.similarity_threshold = overlay.embedding.similarity_threshold;
    }
    if overlay.embedding.timeout_secs != defaults.embedding.timeout_secs {
        base.embedding.timeout_secs = overlay.embedding.timeout_secs;
    }

    if overlay.indexing.max_file_size != defaults.indexing.max_file_size {
        base.indexing.max_file_size = overlay.indexing.max_file_size;
    }

    base
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

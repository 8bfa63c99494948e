//! Store configuration
//!
//! Settings come from two places, applied in order:
//! 1. An optional TOML file (`config=<path>` in the options string)
//! 2. Inline `key=value` pairs in the options string, comma-separated
//!
//! Inline pairs override values loaded from the file. Every field has a
//! default, so an empty options string is valid.

use serde::{Deserialize, Serialize};
use std::path::Path;

use hmkv_core::limits::{DEFAULT_MAX_KEY_BYTES, DEFAULT_MAX_VALUE_BYTES};
use hmkv_core::{KviError, KviResult, Limits};

/// Default cap on live watcher registrations per store
pub const DEFAULT_MAX_WATCHERS: usize = 10_000;

/// Default cap on undelivered events queued for one callback watcher
pub const DEFAULT_MAX_CALLBACK_BACKLOG: usize = 65_536;

/// Default thread-name prefix for callback workers
pub const DEFAULT_WORKER_PREFIX: &str = "hmkv-watch";

/// Option key that names a TOML file to load first
pub const CONFIG_OPTION: &str = "config";

/// Configuration for an in-memory store.
///
/// # Example
///
/// ```toml
/// max_key_bytes = 1024
/// max_value_bytes = 1572864
/// max_watchers = 10000
/// max_callback_backlog = 65536
/// worker_name_prefix = "hmkv-watch"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KviConfig {
    /// Keys longer than this are rejected.
    #[serde(default = "default_max_key_bytes")]
    pub max_key_bytes: usize,
    /// Values longer than this are rejected.
    #[serde(default = "default_max_value_bytes")]
    pub max_value_bytes: usize,
    /// Maximum number of live watcher registrations (blocking + callback).
    ///
    /// Each callback watcher runs on its own OS thread, so this also bounds
    /// the number of worker threads a store can start.
    #[serde(default = "default_max_watchers")]
    pub max_watchers: usize,
    /// Undelivered events one callback watcher may queue; 0 means unbounded.
    ///
    /// A watcher whose callback falls this far behind is cancelled rather
    /// than silently skipping events. It then reports inactive, and the
    /// overflow is counted in `WatchStats::callbacks_overflowed`.
    #[serde(default = "default_max_callback_backlog")]
    pub max_callback_backlog: usize,
    /// Thread-name prefix for callback workers.
    #[serde(default = "default_worker_prefix")]
    pub worker_name_prefix: String,
}

fn default_max_key_bytes() -> usize {
    DEFAULT_MAX_KEY_BYTES
}

fn default_max_value_bytes() -> usize {
    DEFAULT_MAX_VALUE_BYTES
}

fn default_max_watchers() -> usize {
    DEFAULT_MAX_WATCHERS
}

fn default_max_callback_backlog() -> usize {
    DEFAULT_MAX_CALLBACK_BACKLOG
}

fn default_worker_prefix() -> String {
    DEFAULT_WORKER_PREFIX.to_string()
}

impl Default for KviConfig {
    fn default() -> Self {
        Self {
            max_key_bytes: default_max_key_bytes(),
            max_value_bytes: default_max_value_bytes(),
            max_watchers: default_max_watchers(),
            max_callback_backlog: default_max_callback_backlog(),
            worker_name_prefix: default_worker_prefix(),
        }
    }
}

impl KviConfig {
    /// Key and value limits derived from this config
    pub fn limits(&self) -> Limits {
        Limits {
            max_key_bytes: self.max_key_bytes,
            max_value_bytes: self.max_value_bytes,
        }
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# hmkv in-memory store configuration

# Longest accepted key, in bytes
max_key_bytes = 1024

# Longest accepted value, in bytes (1.5 MiB)
max_value_bytes = 1572864

# Live watcher registrations allowed per store (blocking + callback)
max_watchers = 10000

# Undelivered events queued per callback watcher before it is cancelled (0 = unbounded)
max_callback_backlog = 65536

# Thread-name prefix for callback workers
worker_name_prefix = "hmkv-watch"
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> KviResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            KviError::invalid_argument(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: KviConfig = toml::from_str(&content).map_err(|e| {
            KviError::invalid_argument(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> KviResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                KviError::backend(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> KviResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| KviError::backend(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            KviError::backend(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Build a config from an options string
    ///
    /// Format: `key=value[,key=value...]`. Whitespace around items is ignored
    /// and empty items are skipped. `config=<path>` loads a TOML file before
    /// the remaining pairs are applied, wherever it appears in the list.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for malformed pairs, unknown keys, bad
    /// values, or an unreadable config file.
    pub fn from_options(options: &str) -> KviResult<Self> {
        let mut pairs = Vec::new();
        for item in options.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (key, value) = item.split_once('=').ok_or_else(|| {
                KviError::invalid_argument(format!("option '{}' is not key=value", item))
            })?;
            pairs.push((key.trim(), value.trim()));
        }

        let mut config = match pairs.iter().find(|(k, _)| *k == CONFIG_OPTION) {
            Some((_, path)) => Self::from_file(Path::new(path))?,
            None => Self::default(),
        };

        for (key, value) in pairs.into_iter().filter(|(k, _)| *k != CONFIG_OPTION) {
            config.apply_option(key, value)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Set one field by name
    pub fn apply_option(&mut self, key: &str, value: &str) -> KviResult<()> {
        match key {
            "max_key_bytes" => self.max_key_bytes = parse_count(key, value)?,
            "max_value_bytes" => self.max_value_bytes = parse_count(key, value)?,
            "max_watchers" => self.max_watchers = parse_count(key, value)?,
            "max_callback_backlog" => self.max_callback_backlog = parse_count(key, value)?,
            "worker_name_prefix" => self.worker_name_prefix = value.to_string(),
            other => {
                return Err(KviError::invalid_argument(format!(
                    "unknown option '{}'",
                    other
                )))
            }
        }
        Ok(())
    }

    /// Reject settings that would make the store unusable
    pub fn validate(&self) -> KviResult<()> {
        for (name, value) in [
            ("max_key_bytes", self.max_key_bytes),
            ("max_value_bytes", self.max_value_bytes),
            ("max_watchers", self.max_watchers),
        ] {
            if value == 0 {
                return Err(KviError::invalid_argument(format!(
                    "{} must be at least 1",
                    name
                )));
            }
        }
        if self.worker_name_prefix.is_empty() {
            return Err(KviError::invalid_argument("worker_name_prefix must not be empty"));
        }
        Ok(())
    }
}

fn parse_count(key: &str, value: &str) -> KviResult<usize> {
    value.parse().map_err(|_| {
        KviError::invalid_argument(format!(
            "option '{}' expects a non-negative integer, got '{}'",
            key, value
        ))
    })
}

// Copyright 2024-2026 exram Contributors
// SPDX-License-Identifier: Apache-2.0

//! Heap configuration from environment variables or a TOML file.
//!
//! [`load`] reads `EXRAM_*` environment variables with defaults. Invalid
//! values fall back to defaults without failing. [`load_file`] reads the same
//! settings from TOML and reports errors instead.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `EXRAM_ARENA_SIZE` | 131072 | External arena size (bytes) |
//! | `EXRAM_ALLOCATOR` | free-list | `free-list` or `bump` |
//! | `EXRAM_CACHE` | on | Insert a cache layer in front of the device |
//! | `EXRAM_BACKING_FILE` | (unset) | Persist the arena in a memory-mapped file |
//! | `EXRAM_LOG_LEVEL` | warn | `tracing` filter directive |
//! | `EXRAM_LOG_FORMAT` | pretty | `pretty` or `json` |
//!
//! # File format
//!
//! ```toml
//! [heap]
//! arena_size = 65536
//! allocator = "bump"
//! cache = false
//!
//! [log]
//! level = "debug"
//! format = "json"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::Size;
use crate::pointer::CACHE_WINDOW;
use crate::telemetry::{LogConfig, LogFormat};

/// Default external arena size: 128 KiB, the size of a common SPI SRAM part.
pub const DEFAULT_ARENA_SIZE: Size = 128 * 1024;

/// Smallest arena any allocator can do useful work in.
pub const MIN_ARENA_SIZE: Size = 64;

/// Errors raised while reading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Arena size {size} is below the minimum of {minimum} bytes")]
    ArenaTooSmall { size: Size, minimum: Size },
}

/// Allocation strategy for the arena.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AllocatorKind {
    #[default]
    FreeList,
    Bump,
}

impl FromStr for AllocatorKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "free-list" | "freelist" | "free_list" => Ok(Self::FreeList),
            "bump" => Ok(Self::Bump),
            other => Err(ConfigError::InvalidValue {
                key: "allocator",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for AllocatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FreeList => f.write_str("free-list"),
            Self::Bump => f.write_str("bump"),
        }
    }
}

/// How to build a [`Heap`](crate::pointer::Heap).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeapConfig {
    /// Arena size in bytes; also the end address.
    pub arena_size: Size,
    pub allocator: AllocatorKind,
    /// Insert a [`CacheLayer`](crate::layers::CacheLayer) in front of the device.
    pub cache: bool,
    /// Memory-mapped file holding the arena. Reopened if it exists.
    pub backing_file: Option<PathBuf>,
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            arena_size: DEFAULT_ARENA_SIZE,
            allocator: AllocatorKind::FreeList,
            cache: true,
            backing_file: None,
        }
    }
}

impl HeapConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.arena_size < MIN_ARENA_SIZE {
            return Err(ConfigError::ArenaTooSmall {
                size: self.arena_size,
                minimum: MIN_ARENA_SIZE,
            });
        }
        // A bump cursor is not persisted, so reopening would overwrite the file.
        if let (AllocatorKind::Bump, Some(path)) = (self.allocator, &self.backing_file) {
            if path.exists() {
                return Err(ConfigError::InvalidValue {
                    key: "allocator",
                    value: format!("bump cannot reopen existing backing file {}", path.display()),
                });
            }
        }
        Ok(())
    }
}

/// All configuration for the library and the CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExramConfig {
    pub heap: HeapConfig,
    pub log: LogConfig,
}

/// Effective configuration summary (serializable).
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    pub arena_size: Size,
    pub allocator: AllocatorKind,
    pub cache: bool,
    pub cache_window: usize,
    pub backing_file: Option<String>,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl ExramConfig {
    /// Return a serializable summary of all effective values.
    pub fn effective_config(&self) -> EffectiveConfig {
        EffectiveConfig {
            arena_size: self.heap.arena_size,
            allocator: self.heap.allocator,
            cache: self.heap.cache,
            cache_window: if self.heap.cache { CACHE_WINDOW } else { 0 },
            backing_file: self
                .heap
                .backing_file
                .as_ref()
                .map(|p| p.display().to_string()),
            log_level: self.log.level.clone(),
            log_format: self.log.format,
        }
    }
}

/// Parse a `u32` env var, returning `default` on missing or invalid.
fn parse_u32(key: &str, default: u32) -> u32 {
    match std::env::var(key) {
        Ok(val) => val.trim().parse::<u32>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Parse an on/off env var, returning `default` on missing or invalid.
fn parse_switch(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => match val.trim().to_ascii_lowercase().as_str() {
            "on" | "true" | "1" | "yes" => true,
            "off" | "false" | "0" | "no" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

/// Parse an env var through `FromStr`, returning `default` on missing or invalid.
fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(val) => val.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Load heap configuration from environment.
fn load_heap_config() -> HeapConfig {
    let arena_size = parse_u32("EXRAM_ARENA_SIZE", DEFAULT_ARENA_SIZE);
    let arena_size = arena_size.max(MIN_ARENA_SIZE);
    let allocator = parse_or("EXRAM_ALLOCATOR", AllocatorKind::default());
    let cache = parse_switch("EXRAM_CACHE", true);
    let backing_file = std::env::var_os("EXRAM_BACKING_FILE")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);
    HeapConfig {
        arena_size,
        allocator,
        cache,
        backing_file,
    }
}

/// Load logging configuration from environment.
fn load_log_config() -> LogConfig {
    let defaults = LogConfig::default();
    let level = std::env::var("EXRAM_LOG_LEVEL")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(defaults.level);
    let format = parse_or("EXRAM_LOG_FORMAT", defaults.format);
    LogConfig {
        format,
        level,
        output_path: None,
    }
}

/// Load all configuration from environment variables.
///
/// Missing or invalid values fall back to safe defaults without panicking.
pub fn load() -> ExramConfig {
    ExramConfig {
        heap: load_heap_config(),
        log: load_log_config(),
    }
}

/// Load configuration from a TOML file. Missing keys take their defaults.
pub fn load_file(path: impl AsRef<Path>) -> Result<ExramConfig, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: ExramConfig = toml::from_str(&text)?;
    config.heap.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    // Serialize env-mutating tests to avoid cross-test pollution.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ENV_KEYS: &[&str] = &[
        "EXRAM_ARENA_SIZE",
        "EXRAM_ALLOCATOR",
        "EXRAM_CACHE",
        "EXRAM_BACKING_FILE",
        "EXRAM_LOG_LEVEL",
        "EXRAM_LOG_FORMAT",
    ];

    fn clear_env_vars() {
        for k in ENV_KEYS {
            std::env::remove_var(k);
        }
    }

    #[test]
    fn test_defaults_are_sensible() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        let cfg = load();
        assert_eq!(cfg.heap.arena_size, 131_072);
        assert_eq!(cfg.heap.allocator, AllocatorKind::FreeList);
        assert!(cfg.heap.cache);
        assert!(cfg.heap.backing_file.is_none());
        assert_eq!(cfg.log.level, "warn");
        assert_eq!(cfg.log.format, LogFormat::Pretty);
    }

    #[test]
    fn test_env_vars_override_defaults() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        std::env::set_var("EXRAM_ARENA_SIZE", "4096");
        std::env::set_var("EXRAM_ALLOCATOR", "bump");
        std::env::set_var("EXRAM_CACHE", "off");
        std::env::set_var("EXRAM_BACKING_FILE", "/tmp/arena.bin");
        std::env::set_var("EXRAM_LOG_LEVEL", "exram=debug");
        std::env::set_var("EXRAM_LOG_FORMAT", "json");
        let cfg = load();
        assert_eq!(cfg.heap.arena_size, 4096);
        assert_eq!(cfg.heap.allocator, AllocatorKind::Bump);
        assert!(!cfg.heap.cache);
        assert_eq!(cfg.heap.backing_file, Some(PathBuf::from("/tmp/arena.bin")));
        assert_eq!(cfg.log.level, "exram=debug");
        assert_eq!(cfg.log.format, LogFormat::Json);
        clear_env_vars();
    }

    #[test]
    fn test_invalid_env_falls_back_to_default() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        std::env::set_var("EXRAM_ARENA_SIZE", "lots");
        std::env::set_var("EXRAM_ALLOCATOR", "slab");
        std::env::set_var("EXRAM_CACHE", "maybe");
        std::env::set_var("EXRAM_LOG_FORMAT", "xml");
        let cfg = load();
        assert_eq!(cfg.heap.arena_size, DEFAULT_ARENA_SIZE);
        assert_eq!(cfg.heap.allocator, AllocatorKind::FreeList);
        assert!(cfg.heap.cache);
        assert_eq!(cfg.log.format, LogFormat::Pretty);
        clear_env_vars();
    }

    #[test]
    fn test_arena_size_floor() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        std::env::set_var("EXRAM_ARENA_SIZE", "3");
        let cfg = load();
        assert_eq!(cfg.heap.arena_size, MIN_ARENA_SIZE);
        clear_env_vars();
    }

    #[test]
    fn test_load_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[heap]\narena_size = 2048\nallocator = \"bump\"\n").unwrap();
        let cfg = load_file(file.path()).unwrap();
        assert_eq!(cfg.heap.arena_size, 2048);
        assert_eq!(cfg.heap.allocator, AllocatorKind::Bump);
        assert!(cfg.heap.cache);
        assert_eq!(cfg.log, LogConfig::default());
    }

    #[test]
    fn test_load_file_rejects_small_arena() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[heap]\narena_size = 8").unwrap();
        assert!(matches!(
            load_file(file.path()),
            Err(ConfigError::ArenaTooSmall { size: 8, .. })
        ));
    }

    #[test]
    fn test_bump_rejects_existing_backing_file() {
        let dir = tempfile::tempdir().unwrap();
        let arena = dir.path().join("arena.bin");
        let mut cfg = HeapConfig {
            allocator: AllocatorKind::Bump,
            backing_file: Some(arena.clone()),
            ..HeapConfig::default()
        };
        assert!(cfg.validate().is_ok());

        std::fs::write(&arena, [0u8; 64]).unwrap();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue { key: "allocator", .. })
        ));

        cfg.allocator = AllocatorKind::FreeList;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_load_file_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[heap]\nallocator = \"slab\"").unwrap();
        assert!(matches!(load_file(file.path()), Err(ConfigError::Parse(_))));
        assert!(matches!(
            load_file("/nonexistent/exram.toml"),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_effective_config_contains_all_fields() {
        let cfg = ExramConfig::default();
        let eff = cfg.effective_config();
        assert_eq!(eff.arena_size, DEFAULT_ARENA_SIZE);
        assert_eq!(eff.cache_window, CACHE_WINDOW);
        assert!(eff.backing_file.is_none());
        let json = serde_json::to_value(&eff).unwrap();
        assert_eq!(json["allocator"], "free-list");
        assert_eq!(json["log_format"], "pretty");
    }
}

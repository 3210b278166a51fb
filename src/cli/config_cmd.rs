// Copyright 2024-2026 exram Contributors
// SPDX-License-Identifier: Apache-2.0

//! Config CLI subcommands: show, defaults, validate.
//!
//! Without `--file`, settings come from `EXRAM_*` environment variables.

use std::path::Path;

use crate::config::{self, ConfigError, EffectiveConfig, ExramConfig};

/// Environment or file configuration, depending on `file`.
pub fn resolve(file: Option<&Path>) -> Result<ExramConfig, ConfigError> {
    match file {
        Some(path) => config::load_file(path),
        None => Ok(config::load()),
    }
}

/// Print effective config to stdout, as `KEY=value` lines or JSON.
pub fn run_show(file: Option<&Path>, json: bool) -> i32 {
    let cfg = match resolve(file) {
        Ok(cfg) => cfg.effective_config(),
        Err(e) => {
            eprintln!("Error: {}", e);
            return 2;
        }
    };
    if json {
        match serde_json::to_string_pretty(&cfg) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        }
    } else {
        print_config(&cfg);
    }
    0
}

/// Print default config values (no env overrides) to stdout.
pub fn run_defaults() {
    print_config(&ExramConfig::default().effective_config());
}

/// Validate configuration for obvious misconfigurations.
///
/// Returns 0 if valid, 1 if any warnings are found, 2 if it cannot be loaded.
pub fn run_validate(file: Option<&Path>) -> i32 {
    let cfg = match resolve(file) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 2;
        }
    };
    let mut warnings = 0;

    if let Err(e) = cfg.heap.validate() {
        eprintln!("WARNING: {}", e);
        warnings += 1;
    }

    if let Some(path) = &cfg.heap.backing_file {
        let parent_missing = path
            .parent()
            .is_some_and(|p| !p.as_os_str().is_empty() && !p.exists());
        if parent_missing {
            eprintln!("WARNING: directory for EXRAM_BACKING_FILE ({}) does not exist", path.display());
            warnings += 1;
        }
    }

    if let Err(e) = tracing_subscriber::EnvFilter::try_new(&cfg.log.level) {
        eprintln!("WARNING: EXRAM_LOG_LEVEL ({}) is not a valid filter: {}", cfg.log.level, e);
        warnings += 1;
    }

    if warnings == 0 {
        println!("Configuration is valid.");
        0
    } else {
        1
    }
}

fn print_config(cfg: &EffectiveConfig) {
    println!("EXRAM_ARENA_SIZE={}", cfg.arena_size);
    println!("EXRAM_ALLOCATOR={}", cfg.allocator);
    println!("EXRAM_CACHE={}", if cfg.cache { "on" } else { "off" });
    println!("EXRAM_CACHE_WINDOW={}", cfg.cache_window);
    println!("EXRAM_BACKING_FILE={}", cfg.backing_file.as_deref().unwrap_or(""));
    println!("EXRAM_LOG_LEVEL={}", cfg.log_level);
    println!(
        "EXRAM_LOG_FORMAT={}",
        match cfg.log_format {
            crate::telemetry::LogFormat::Json => "json",
            crate::telemetry::LogFormat::Pretty => "pretty",
        }
    );
}

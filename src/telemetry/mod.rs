// Copyright 2024-2026 exram Contributors
// SPDX-License-Identifier: Apache-2.0

//! Telemetry for exram.
//!
//! Structured logging through `tracing` and counters/gauges through the
//! `metrics` facade. Installing a metrics recorder is left to the embedding
//! application.

mod logging;
pub mod metrics;

pub use logging::{init_logging, LogConfig, LogError, LogFormat};
pub use self::metrics::CacheOutcome;

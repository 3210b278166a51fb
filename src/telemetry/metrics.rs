// Copyright 2024-2026 exram Contributors
// SPDX-License-Identifier: Apache-2.0

//! Metric names and recording helpers.
//!
//! All values go through the `metrics` facade; without an installed recorder
//! they are no-ops.

use metrics::{counter, gauge};

use crate::address::Size;

pub const ALLOC_TOTAL: &str = "exram_alloc_total";
pub const ALLOC_FAILURES_TOTAL: &str = "exram_alloc_failures_total";
pub const FREE_TOTAL: &str = "exram_free_total";
pub const FREE_REJECTED_TOTAL: &str = "exram_free_rejected_total";
pub const FREE_BYTES: &str = "exram_free_bytes";
pub const CACHE_HITS_TOTAL: &str = "exram_cache_hits_total";
pub const CACHE_MISSES_TOTAL: &str = "exram_cache_misses_total";
pub const CACHE_BYPASSES_TOTAL: &str = "exram_cache_bypasses_total";
pub const CACHE_FLUSHES_TOTAL: &str = "exram_cache_flushes_total";
pub const TRANSPORT_READS_TOTAL: &str = "exram_transport_reads_total";
pub const TRANSPORT_WRITES_TOTAL: &str = "exram_transport_writes_total";
pub const TRANSPORT_BYTES_READ_TOTAL: &str = "exram_transport_bytes_read_total";
pub const TRANSPORT_BYTES_WRITTEN_TOTAL: &str = "exram_transport_bytes_written_total";
pub const SHADOW_STALE_RECLAIMS_TOTAL: &str = "exram_shadow_stale_reclaims_total";

/// Record an allocation attempt and the resulting free-byte gauge.
pub fn record_allocation(succeeded: bool, free_bytes: Size) {
    if succeeded {
        counter!(ALLOC_TOTAL).increment(1);
    } else {
        counter!(ALLOC_FAILURES_TOTAL).increment(1);
    }
    gauge!(FREE_BYTES).set(f64::from(free_bytes));
}

/// Record a free call; `reclaimed == 0` counts as rejected.
pub fn record_free(reclaimed: Size, free_bytes: Size) {
    if reclaimed > 0 {
        counter!(FREE_TOTAL).increment(1);
    } else {
        counter!(FREE_REJECTED_TOTAL).increment(1);
    }
    gauge!(FREE_BYTES).set(f64::from(free_bytes));
}

/// Cache access outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    Miss,
    Bypass,
}

pub fn record_cache_access(outcome: CacheOutcome) {
    match outcome {
        CacheOutcome::Hit => counter!(CACHE_HITS_TOTAL).increment(1),
        CacheOutcome::Miss => counter!(CACHE_MISSES_TOTAL).increment(1),
        CacheOutcome::Bypass => counter!(CACHE_BYPASSES_TOTAL).increment(1),
    }
}

pub fn record_cache_flush() {
    counter!(CACHE_FLUSHES_TOTAL).increment(1);
}

pub fn record_transport_read(bytes: usize) {
    counter!(TRANSPORT_READS_TOTAL).increment(1);
    counter!(TRANSPORT_BYTES_READ_TOTAL).increment(bytes as u64);
}

pub fn record_transport_write(bytes: usize) {
    counter!(TRANSPORT_WRITES_TOTAL).increment(1);
    counter!(TRANSPORT_BYTES_WRITTEN_TOTAL).increment(bytes as u64);
}

pub fn record_stale_reclaim() {
    counter!(SHADOW_STALE_RECLAIMS_TOTAL).increment(1);
}

// Copyright 2024-2026 exram Contributors
// SPDX-License-Identifier: Apache-2.0

//! `demo` subcommand: allocate, free and reallocate on the configured stack,
//! then round-trip a value through a shadow.

use serde::Serialize;

use crate::address::{Address, Size};
use crate::alloc::{Allocator, BumpAllocator, FreeListAllocator};
use crate::config::{AllocatorKind, ExramConfig};
use crate::error::HeapError;
use crate::layers::{AccessCounter, CacheLayer};
use crate::pointer::{Heap, CACHE_WINDOW};
use crate::transport::{MemoryTransport, Transport};

const BLOCK: Size = 100;

/// Outcome of the demo scenario.
#[derive(Debug, Clone, Serialize)]
pub struct DemoReport {
    pub allocator: AllocatorKind,
    pub cache: bool,
    pub first: Address,
    pub second: Address,
    pub third: Address,
    /// True if the third allocation landed where the freed second one was.
    pub reused: bool,
    pub free_bytes_before: Size,
    pub free_bytes_after_free: Size,
    pub device_reads: u64,
    pub device_writes: u64,
    pub device_bytes_read: u64,
    pub device_bytes_written: u64,
    pub shadow_value: u32,
}

/// Run the scenario on an in-memory device of the configured size.
pub fn run_scenario(config: &ExramConfig) -> Result<DemoReport, HeapError> {
    config.heap.validate()?;
    let end = Address::new(config.heap.arena_size);
    let mut counter = AccessCounter::new(MemoryTransport::new(config.heap.arena_size));

    let (first, second, third, free_bytes_before, free_bytes_after_free) = {
        let device: Box<dyn Transport + '_> = if config.heap.cache {
            Box::new(CacheLayer::<_, CACHE_WINDOW>::new(&mut counter))
        } else {
            Box::new(&mut counter)
        };
        let mut allocator: Box<dyn Allocator + '_> = match config.heap.allocator {
            AllocatorKind::FreeList => Box::new(FreeListAllocator::new(device, end)?),
            AllocatorKind::Bump => Box::new(BumpAllocator::new(device, end)),
        };

        let before = allocator.free_bytes();
        let first = allocator.allocate(BLOCK);
        let second = allocator.allocate(BLOCK);
        allocator.free(second);
        let after_free = allocator.free_bytes();
        let third = allocator.allocate(BLOCK);
        (first, second, third, before, after_free)
    };

    let mut heap_config = config.heap.clone();
    heap_config.backing_file = None;
    let heap = Heap::from_config(&heap_config)?;
    let value = heap.make_external(0u32);
    value.update(|v| *v += 42)?;
    let shadow_value = value.get()?;
    value.free();

    Ok(DemoReport {
        allocator: config.heap.allocator,
        cache: config.heap.cache,
        first,
        second,
        third,
        reused: !second.is_null() && second == third,
        free_bytes_before,
        free_bytes_after_free,
        device_reads: counter.reads(),
        device_writes: counter.writes(),
        device_bytes_read: counter.bytes_read(),
        device_bytes_written: counter.bytes_written(),
        shadow_value,
    })
}

/// Run the demo and print the report. Returns the process exit code.
pub fn run_demo(config: &ExramConfig, json: bool) -> i32 {
    let report = match run_scenario(config) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        }
        return 0;
    }

    println!("Allocator:         {}", report.allocator);
    println!("Cache:             {}", if report.cache { "on" } else { "off" });
    println!("First block:       {}", report.first);
    println!("Second block:      {}", report.second);
    println!("Third block:       {} (reused: {})", report.third, report.reused);
    println!("Free bytes before: {}", report.free_bytes_before);
    println!("Free bytes after:  {}", report.free_bytes_after_free);
    println!(
        "Device reads:      {} ({} bytes)",
        report.device_reads, report.device_bytes_read
    );
    println!(
        "Device writes:     {} ({} bytes)",
        report.device_writes, report.device_bytes_written
    );
    println!("Shadow value:      {}", report.shadow_value);
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(allocator: AllocatorKind, cache: bool) -> ExramConfig {
        let mut cfg = ExramConfig::default();
        cfg.heap.arena_size = 1024;
        cfg.heap.allocator = allocator;
        cfg.heap.cache = cache;
        cfg
    }

    #[test]
    fn test_free_list_scenario_reuses_block() {
        let report = run_scenario(&config(AllocatorKind::FreeList, false)).unwrap();
        assert!(!report.first.is_null());
        assert!(report.second >= report.first + BLOCK);
        assert!(report.reused);
        assert_eq!(report.free_bytes_before, report.free_bytes_after_free);
        assert_eq!(report.shadow_value, 42);
        assert!(report.device_writes > 0);
    }

    #[test]
    fn test_cache_does_not_change_results() {
        let direct = run_scenario(&config(AllocatorKind::FreeList, false)).unwrap();
        let cached = run_scenario(&config(AllocatorKind::FreeList, true)).unwrap();
        assert_eq!(cached.first, direct.first);
        assert_eq!(cached.third, direct.third);
        assert_eq!(cached.free_bytes_after_free, direct.free_bytes_after_free);
        assert_eq!(cached.device_bytes_read % CACHE_WINDOW as u64, 0);
    }

    #[test]
    fn test_bump_scenario_never_reuses() {
        let report = run_scenario(&config(AllocatorKind::Bump, true)).unwrap();
        assert!(!report.reused);
        assert_eq!(report.shadow_value, 42);
    }
}

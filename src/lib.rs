// Copyright 2024-2026 exram Contributors
// SPDX-License-Identifier: Apache-2.0

//! exram: memory that lives behind a byte transport.
//!
//! External memory (an SPI SRAM, a memory-mapped file, a plain buffer) is
//! reached only through [`Transport`] reads and writes. On top of that
//! contract the crate provides:
//!
//! - **Decorators** ([`layers`]): a single-window write-back cache, access
//!   counting, access logging and artificial latency, stacked in any order.
//! - **Allocators** ([`alloc`]): a first-fit free-list allocator whose block
//!   headers live inside the arena itself, and a bump allocator.
//! - **Pointers** ([`pointer`]): typed external references whose
//!   dereference yields a local shadow, written back when the last shadow of
//!   a value goes away.
//! - **Planning** ([`planner`]): overhead of a paged address space kept in
//!   external memory.
//!
//! # Failure model
//!
//! Exhaustion and rejected frees are reported by return value (null address,
//! zero bytes). `Result` is reserved for I/O, configuration and dereferencing
//! null.

pub mod address;
pub mod alloc;
pub mod cli;
pub mod config;
pub mod error;
pub mod layers;
pub mod planner;
pub mod pointer;
pub mod telemetry;
pub mod transport;

pub use address::{Address, Size};
pub use alloc::{Allocator, BumpAllocator, FreeListAllocator};
pub use config::{AllocatorKind, ExramConfig, HeapConfig};
pub use error::HeapError;
pub use layers::{AccessCounter, AccessLogger, CacheLayer, LatencyLayer, Layer};
pub use pointer::{ExternalPtr, ExternalValue, Heap, Shadow};
pub use transport::{MappedTransport, MemoryTransport, Transport};

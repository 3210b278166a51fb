// Copyright 2024-2026 exram Contributors
// SPDX-License-Identifier: Apache-2.0

//! Allocators for external address space.
//!
//! An allocator hands out external addresses only; it knows nothing about
//! shadows or typed values. Exhaustion is reported by returning
//! [`Address::NULL`] and rejected frees by returning 0, so callers must check
//! both results.

mod bump;
mod free_list;

pub use bump::{BumpAllocator, BUMP_START};
pub use free_list::{FreeListAllocator, ALIGNMENT, HEADER_SIZE};

use crate::address::{Address, Size};
use crate::transport::Transport;

/// A live allocation as seen by inspection helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    /// First payload byte, as returned by `allocate`.
    pub address: Address,
    /// Payload bytes reserved (after alignment).
    pub size: Size,
}

/// Manages free and used regions of one external arena.
pub trait Allocator: Send {
    /// Reserve at least `count` bytes, or return `Address::NULL`.
    fn allocate(&mut self, count: Size) -> Address;

    /// Release the block starting at `address`, returning the payload bytes
    /// reclaimed (possibly more than were requested). Returns 0 when the
    /// address is rejected or the allocator never reclaims.
    fn free(&mut self, address: Address) -> Size;

    /// Payload bytes of the live block at `address`, if the allocator tracks
    /// block extents and `address` starts one.
    fn block_size(&mut self, address: Address) -> Option<Size>;

    /// Bytes not attributed to a live allocation.
    fn free_bytes(&self) -> Size;

    /// Address just past the last byte of the arena.
    fn end(&self) -> Address;

    /// The device holding the arena.
    fn transport(&mut self) -> &mut dyn Transport;
}

impl<A: Allocator + ?Sized> Allocator for Box<A> {
    fn allocate(&mut self, count: Size) -> Address {
        (**self).allocate(count)
    }

    fn free(&mut self, address: Address) -> Size {
        (**self).free(address)
    }

    fn block_size(&mut self, address: Address) -> Option<Size> {
        (**self).block_size(address)
    }

    fn free_bytes(&self) -> Size {
        (**self).free_bytes()
    }

    fn end(&self) -> Address {
        (**self).end()
    }

    fn transport(&mut self) -> &mut dyn Transport {
        (**self).transport()
    }
}

// Copyright 2024-2026 exram Contributors
// SPDX-License-Identifier: Apache-2.0

//! Byte transport to external memory.
//!
//! Everything above this module talks to external memory only through
//! [`Transport::read`] and [`Transport::write`]. Decorators in
//! [`crate::layers`] are transports wrapping another transport, so stacks of
//! any depth can be composed.

mod mapped;
mod memory;

pub use mapped::MappedTransport;
pub use memory::MemoryTransport;

use crate::address::Address;

/// Byte-addressable external memory.
///
/// Both operations accept any length and any (unaligned) address. There is no
/// atomicity across a read/write pair and no failure path: a transport access
/// either completes or the process is considered dead.
pub trait Transport: Send {
    /// Copy `dst.len()` bytes starting at external address `from` into `dst`.
    fn read(&mut self, dst: &mut [u8], from: Address);

    /// Copy `src` to external memory starting at address `to`.
    fn write(&mut self, to: Address, src: &[u8]);
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn read(&mut self, dst: &mut [u8], from: Address) {
        (**self).read(dst, from)
    }

    fn write(&mut self, to: Address, src: &[u8]) {
        (**self).write(to, src)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read(&mut self, dst: &mut [u8], from: Address) {
        (**self).read(dst, from)
    }

    fn write(&mut self, to: Address, src: &[u8]) {
        (**self).write(to, src)
    }
}

/// Number of bytes of an access at `address` of `len` bytes that fall inside
/// a device of `capacity` bytes.
pub(crate) fn in_range(capacity: usize, address: Address, len: usize) -> usize {
    let start = address.as_usize();
    if start >= capacity {
        0
    } else {
        len.min(capacity - start)
    }
}

/// Read through a fixed-capacity byte slice; bytes past the end read as zero.
pub(crate) fn read_bounded(memory: &[u8], dst: &mut [u8], from: Address) {
    let n = in_range(memory.len(), from, dst.len());
    let start = from.as_usize();
    dst[..n].copy_from_slice(&memory[start..start + n]);
    dst[n..].fill(0);
}

/// Write into a fixed-capacity byte slice; bytes past the end are discarded.
pub(crate) fn write_bounded(memory: &mut [u8], to: Address, src: &[u8]) {
    let n = in_range(memory.len(), to, src.len());
    let start = to.as_usize();
    memory[start..start + n].copy_from_slice(&src[..n]);
}

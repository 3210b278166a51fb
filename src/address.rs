// Copyright 2024-2026 exram Contributors
// SPDX-License-Identifier: Apache-2.0

//! External addresses and byte counts.
//!
//! External memory may be larger than what the local platform can address, so
//! neither type is tied to `usize`.

use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// Byte count in external memory.
pub type Size = u32;

/// Offset into an external address space.
///
/// `Address::NULL` (offset 0) means "no address". Offset 0 is also where the
/// allocator keeps its bookkeeping, so it is never handed out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(u32);

impl Address {
    pub const NULL: Address = Address(0);

    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u32 {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Add a byte count, returning `None` on overflow of the address space.
    pub fn checked_add(self, count: Size) -> Option<Address> {
        self.0.checked_add(count).map(Address)
    }

    /// Subtract a byte count, returning `None` below offset 0.
    pub fn checked_sub(self, count: Size) -> Option<Address> {
        self.0.checked_sub(count).map(Address)
    }

    /// Bytes from `other` up to `self`, or 0 if `other` lies beyond.
    pub fn saturating_distance(self, other: Address) -> Size {
        self.0.saturating_sub(other.0)
    }

    /// Round up to the next multiple of `quantum` (a power of two).
    pub fn align_up(self, quantum: Size) -> Option<Address> {
        align_up(self.0, quantum).map(Address)
    }

    /// Offset as a local index.
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// Round `value` up to the next multiple of `quantum` (a power of two).
pub fn align_up(value: Size, quantum: Size) -> Option<Size> {
    debug_assert!(quantum.is_power_of_two());
    value
        .checked_add(quantum - 1)
        .map(|v| v & !(quantum - 1))
}

impl From<u32> for Address {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<Address> for u32 {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#08x}", self.0)
    }
}

// Operators follow the integer ones: overflow panics in debug builds and
// wraps in release. Use `checked_add`/`checked_sub` where the operands are
// not already known to be in range.
impl Add<Size> for Address {
    type Output = Address;

    fn add(self, count: Size) -> Address {
        Address(self.0 + count)
    }
}

impl Sub<Size> for Address {
    type Output = Address;

    fn sub(self, count: Size) -> Address {
        Address(self.0 - count)
    }
}

/// Difference between two addresses is a byte count.
impl Sub<Address> for Address {
    type Output = Size;

    fn sub(self, other: Address) -> Size {
        self.0 - other.0
    }
}

impl AddAssign<Size> for Address {
    fn add_assign(&mut self, count: Size) {
        self.0 += count;
    }
}

impl SubAssign<Size> for Address {
    fn sub_assign(&mut self, count: Size) {
        self.0 -= count;
    }
}

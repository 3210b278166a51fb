// Copyright 2024-2026 exram Contributors
// SPDX-License-Identifier: Apache-2.0

//! Bump allocator: a cursor that only moves forward.

use super::Allocator;
use crate::address::{Address, Size};
use crate::telemetry::metrics::{record_allocation, record_free};
use crate::transport::Transport;

/// First address handed out; keeps clear of null.
pub const BUMP_START: Address = Address::new(32);

/// Never reclaims memory. Useful as a baseline and for code paths that do
/// not free.
pub struct BumpAllocator<T: Transport> {
    transport: T,
    cursor: Address,
    end: Address,
}

impl<T: Transport> BumpAllocator<T> {
    /// `end` is the address just past the last usable byte.
    pub fn new(transport: T, end: Address) -> Self {
        Self {
            transport,
            cursor: BUMP_START,
            end,
        }
    }

    /// Next address to be handed out.
    pub fn cursor(&self) -> Address {
        self.cursor
    }

    pub fn device(&self) -> &T {
        &self.transport
    }

    pub fn device_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

impl<T: Transport> Allocator for BumpAllocator<T> {
    fn allocate(&mut self, count: Size) -> Address {
        let address = match self.cursor.checked_add(count.max(1)) {
            Some(next) if next <= self.end => {
                let address = self.cursor;
                self.cursor = next;
                address
            }
            _ => {
                tracing::debug!(count, cursor = %self.cursor, "bump allocator exhausted");
                Address::NULL
            }
        };
        record_allocation(!address.is_null(), self.free_bytes());
        address
    }

    fn free(&mut self, _address: Address) -> Size {
        record_free(0, self.free_bytes());
        0
    }

    fn block_size(&mut self, _address: Address) -> Option<Size> {
        None
    }

    fn free_bytes(&self) -> Size {
        self.end.saturating_distance(self.cursor)
    }

    fn end(&self) -> Address {
        self.end
    }

    fn transport(&mut self) -> &mut dyn Transport {
        &mut self.transport
    }
}

// Copyright 2024-2026 exram Contributors
// SPDX-License-Identifier: Apache-2.0

//! Heap-backed transport.

use super::{read_bounded, write_bounded, Transport};
use crate::address::{Address, Size};

/// External memory simulated by a local, zero-initialised byte vector.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    memory: Vec<u8>,
}

impl MemoryTransport {
    /// Create a device of `capacity` zeroed bytes.
    pub fn new(capacity: Size) -> Self {
        Self {
            memory: vec![0u8; capacity as usize],
        }
    }

    /// Device size in bytes.
    pub fn capacity(&self) -> Size {
        self.memory.len() as Size
    }

    /// Raw device contents.
    pub fn as_bytes(&self) -> &[u8] {
        &self.memory
    }
}

impl Transport for MemoryTransport {
    fn read(&mut self, dst: &mut [u8], from: Address) {
        read_bounded(&self.memory, dst, from);
    }

    fn write(&mut self, to: Address, src: &[u8]) {
        write_bounded(&mut self.memory, to, src);
    }
}

// Copyright 2024-2026 exram Contributors
// SPDX-License-Identifier: Apache-2.0

//! Owner slot stored in front of every external value.

/// Bytes reserved for the owner slot at the start of each frame.
pub const OWNER_SLOT_SIZE: usize = 8;

/// Identity of a shadow that claimed a slot.
///
/// `run` is random per heap and never zero, so an owned slot never encodes
/// as the free pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerToken {
    pub run: u32,
    pub generation: u32,
}

/// Decoded state of an owner slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerSlot {
    Free,
    Owned(OwnerToken),
}

impl OwnerSlot {
    pub fn encode(self) -> [u8; OWNER_SLOT_SIZE] {
        let raw = match self {
            OwnerSlot::Free => 0u64,
            OwnerSlot::Owned(token) => (u64::from(token.run) << 32) | u64::from(token.generation),
        };
        raw.to_le_bytes()
    }

    /// Decode the first [`OWNER_SLOT_SIZE`] bytes of `bytes`.
    pub fn decode(bytes: &[u8]) -> Self {
        let mut raw = [0u8; OWNER_SLOT_SIZE];
        raw.copy_from_slice(&bytes[..OWNER_SLOT_SIZE]);
        match u64::from_le_bytes(raw) {
            0 => OwnerSlot::Free,
            raw => OwnerSlot::Owned(OwnerToken {
                run: (raw >> 32) as u32,
                generation: raw as u32,
            }),
        }
    }

    pub fn is_free(self) -> bool {
        self == OwnerSlot::Free
    }
}

// Copyright 2024-2026 exram Contributors
// SPDX-License-Identifier: Apache-2.0

//! Heap-level error types.
//!
//! Allocation exhaustion and rejected frees are not errors: they are reported
//! through null addresses and zero byte counts. These variants cover the
//! operations that cannot be expressed that way.

use thiserror::Error;

use crate::address::{Address, Size};
use crate::config::ConfigError;

/// Errors raised while building or using a heap.
#[derive(Debug, Error)]
pub enum HeapError {
    #[error("Dereferenced a null external pointer")]
    NullPointer,

    #[error("Arena is not formatted or its block chain is corrupt at {address}: {reason}")]
    CorruptArena { address: Address, reason: String },

    #[error("Frame at {address} is already shadowed as a type other than {expected}")]
    TypeMismatch {
        address: Address,
        expected: &'static str,
    },

    #[error("Arena of {size} bytes is too small, need at least {minimum} bytes")]
    ArenaTooSmall { size: Size, minimum: Size },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HeapError {
    /// Returns true if the external arena itself is in a bad state.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::CorruptArena { .. })
    }
}

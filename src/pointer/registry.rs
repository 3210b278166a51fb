// Copyright 2024-2026 exram Contributors
// SPDX-License-Identifier: Apache-2.0

//! Live shadows of one heap, keyed by external address.

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use rand::Rng;

use super::owner::OwnerToken;
use crate::address::Address;

/// One claimed slot and the local value all of its shadows share.
pub(crate) struct LiveShadow {
    pub token: OwnerToken,
    pub holders: usize,
    /// An `Arc<Mutex<T>>` for the `T` the slot was claimed as.
    pub cell: Arc<dyn Any + Send + Sync>,
}

pub(crate) type LiveMap = HashMap<Address, LiveShadow>;

pub(crate) struct ShadowRegistry {
    run: u32,
    generation: AtomicU32,
    live: Mutex<LiveMap>,
}

impl ShadowRegistry {
    pub fn new() -> Self {
        Self::with_run(rand::thread_rng().gen_range(1..=u32::MAX))
    }

    pub fn with_run(run: u32) -> Self {
        Self {
            run: run.max(1),
            generation: AtomicU32::new(0),
            live: Mutex::new(HashMap::new()),
        }
    }

    pub fn run(&self) -> u32 {
        self.run
    }

    pub fn next_token(&self) -> OwnerToken {
        OwnerToken {
            run: self.run,
            generation: self.generation.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Lock the live map. Taken before the allocator lock, never after.
    pub fn lock(&self) -> MutexGuard<'_, LiveMap> {
        self.live.lock()
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }
}

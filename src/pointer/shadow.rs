// Copyright 2024-2026 exram Contributors
// SPDX-License-Identifier: Apache-2.0

//! Local shadow of an external value.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::heap::Heap;
use super::value::ExternalValue;
use crate::address::Address;

/// Local working copy of the value stored at one external frame.
///
/// All shadows of the same frame on the same heap share one local cell, so a
/// mutation through any of them is seen by all. The value is written back
/// together with a free owner slot when the last shadow of the frame is
/// dropped.
///
/// Closures passed to [`update`](Self::update) and [`read`](Self::read) run
/// with the cell locked and must not dereference the same frame again.
pub struct Shadow<T: ExternalValue> {
    heap: Heap,
    address: Address,
    cell: Arc<Mutex<T>>,
    primary: bool,
}

impl<T: ExternalValue> Shadow<T> {
    pub(crate) fn new(heap: Heap, address: Address, cell: Arc<Mutex<T>>, primary: bool) -> Self {
        Self {
            heap,
            address,
            cell,
            primary,
        }
    }

    /// Copy of the current local value.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.cell.lock().clone()
    }

    pub fn set(&self, value: T) {
        *self.cell.lock() = value;
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.cell.lock())
    }

    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.cell.lock())
    }

    /// Frame address: the owner slot, not the value.
    pub fn address(&self) -> Address {
        self.address
    }

    /// True for the shadow that claimed the owner slot and pulled the value.
    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }
}

impl<T: ExternalValue> Clone for Shadow<T> {
    /// Joins the same cell as a non-primary holder.
    fn clone(&self) -> Self {
        self.heap.retain(self.address);
        Self::new(self.heap.clone(), self.address, Arc::clone(&self.cell), false)
    }
}

impl<T: ExternalValue> Drop for Shadow<T> {
    fn drop(&mut self) {
        self.heap.release(self.address, &self.cell);
    }
}

impl<T: ExternalValue + fmt::Debug> fmt::Debug for Shadow<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shadow")
            .field("address", &self.address)
            .field("primary", &self.primary)
            .field("value", &*self.cell.lock())
            .finish()
    }
}

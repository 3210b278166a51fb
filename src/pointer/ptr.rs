// Copyright 2024-2026 exram Contributors
// SPDX-License-Identifier: Apache-2.0

//! Typed reference to a frame in external memory.

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Add, AddAssign, Sub, SubAssign};

use super::frame_size;
use super::heap::Heap;
use super::shadow::Shadow;
use super::value::ExternalValue;
use crate::address::{Address, Size};
use crate::error::HeapError;

/// Pointer to a `T` stored in external memory.
///
/// Arithmetic moves in whole frames (owner slot plus value), so `ptr + 1`
/// is the next element of an array made with [`Heap::make_array`].
/// Arithmetic never checks bounds.
pub struct ExternalPtr<T: ExternalValue> {
    heap: Heap,
    address: Address,
    _marker: PhantomData<fn() -> T>,
}

impl<T: ExternalValue> ExternalPtr<T> {
    pub(crate) fn new(heap: Heap, address: Address) -> Self {
        Self {
            heap,
            address,
            _marker: PhantomData,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn is_null(&self) -> bool {
        self.address.is_null()
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Produce a shadow of the pointed-to value.
    ///
    /// Joins the live shadow of the frame if there is one, otherwise claims
    /// the owner slot and reads the value from the device.
    #[allow(clippy::should_implement_trait)]
    pub fn deref(&self) -> Result<Shadow<T>, HeapError> {
        self.heap.acquire(self.address)
    }

    pub fn get(&self) -> Result<T, HeapError>
    where
        T: Clone,
    {
        Ok(self.deref()?.get())
    }

    pub fn set(&self, value: T) -> Result<(), HeapError> {
        self.deref()?.set(value);
        Ok(())
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, HeapError> {
        Ok(self.deref()?.update(f))
    }

    /// Pointer to element `index` counting from this one.
    pub fn element(&self, index: Size) -> Self {
        self.clone() + index
    }

    /// Shadow of element `index`.
    pub fn at(&self, index: Size) -> Result<Shadow<T>, HeapError> {
        self.element(index).deref()
    }

    /// Advance by one frame and return the advanced pointer.
    pub fn increment(&mut self) -> &mut Self {
        *self += 1;
        self
    }

    pub fn decrement(&mut self) -> &mut Self {
        *self -= 1;
        self
    }

    /// Advance by one frame and return the pointer as it was before.
    pub fn post_increment(&mut self) -> Self {
        let previous = self.clone();
        *self += 1;
        previous
    }

    pub fn post_decrement(&mut self) -> Self {
        let previous = self.clone();
        *self -= 1;
        previous
    }

    /// Release the frame. Returns the bytes reclaimed, 0 if refused.
    pub fn free(&self) -> Size {
        if self.is_null() {
            return 0;
        }
        self.heap.free(self.address)
    }

    fn offset(index: Size) -> Size {
        frame_size::<T>().wrapping_mul(index)
    }
}

impl<T: ExternalValue> Clone for ExternalPtr<T> {
    fn clone(&self) -> Self {
        Self::new(self.heap.clone(), self.address)
    }
}

impl<T: ExternalValue> PartialEq for ExternalPtr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address && self.heap.ptr_eq(&other.heap)
    }
}

impl<T: ExternalValue> Eq for ExternalPtr<T> {}

impl<T: ExternalValue> fmt::Debug for ExternalPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ExternalPtr").field(&self.address).finish()
    }
}

impl<T: ExternalValue> Add<Size> for ExternalPtr<T> {
    type Output = Self;

    fn add(mut self, index: Size) -> Self {
        self += index;
        self
    }
}

impl<T: ExternalValue> Add<Size> for &ExternalPtr<T> {
    type Output = ExternalPtr<T>;

    fn add(self, index: Size) -> ExternalPtr<T> {
        self.clone() + index
    }
}

impl<T: ExternalValue> Sub<Size> for ExternalPtr<T> {
    type Output = Self;

    fn sub(mut self, index: Size) -> Self {
        self -= index;
        self
    }
}

impl<T: ExternalValue> Sub<Size> for &ExternalPtr<T> {
    type Output = ExternalPtr<T>;

    fn sub(self, index: Size) -> ExternalPtr<T> {
        self.clone() - index
    }
}

impl<T: ExternalValue> AddAssign<Size> for ExternalPtr<T> {
    fn add_assign(&mut self, index: Size) {
        self.address = Address::new(self.address.value().wrapping_add(Self::offset(index)));
    }
}

impl<T: ExternalValue> SubAssign<Size> for ExternalPtr<T> {
    fn sub_assign(&mut self, index: Size) {
        self.address = Address::new(self.address.value().wrapping_sub(Self::offset(index)));
    }
}

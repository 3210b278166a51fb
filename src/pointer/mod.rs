// Copyright 2024-2026 exram Contributors
// SPDX-License-Identifier: Apache-2.0

//! Typed pointers into external memory and their local shadows.
//!
//! Every external value lives in a frame: an 8-byte owner slot followed by
//! the encoded value. Dereferencing an [`ExternalPtr`] yields a [`Shadow`],
//! a local copy that is written back when the last shadow of the frame goes
//! away. The owner slot records which heap instance currently holds the
//! frame, so a slot left claimed by a crashed or leaked holder can be
//! recognised and reclaimed.
//!
//! ```no_run
//! use exram::alloc::FreeListAllocator;
//! use exram::pointer::Heap;
//! use exram::transport::MemoryTransport;
//! use exram::Address;
//!
//! # fn main() -> Result<(), exram::HeapError> {
//! let device = MemoryTransport::new(4096);
//! let heap = Heap::new(FreeListAllocator::new(device, Address::new(4096))?);
//! let counter = heap.make_external(0u32);
//! counter.update(|n| *n += 1)?;
//! assert_eq!(counter.get()?, 1);
//! # Ok(())
//! # }
//! ```

mod heap;
mod owner;
mod ptr;
mod registry;
mod shadow;
mod value;

pub use heap::{Heap, CACHE_WINDOW};
pub use owner::{OwnerSlot, OwnerToken, OWNER_SLOT_SIZE};
pub use ptr::ExternalPtr;
pub use shadow::Shadow;
pub use value::{to_bytes, ExternalValue};

use crate::address::Size;

/// Bytes one `T` occupies externally, owner slot included.
pub fn frame_size<T: ExternalValue>() -> Size {
    Size::try_from(OWNER_SLOT_SIZE + T::SIZE).unwrap_or(Size::MAX)
}

// Copyright 2024-2026 exram Contributors
// SPDX-License-Identifier: Apache-2.0

//! Shared heap handle tying an allocator to its live shadows.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::owner::{OwnerSlot, OWNER_SLOT_SIZE};
use super::ptr::ExternalPtr;
use super::registry::{LiveShadow, ShadowRegistry};
use super::shadow::Shadow;
use super::value::ExternalValue;
use super::frame_size;
use crate::address::{Address, Size};
use crate::alloc::{Allocator, BumpAllocator, FreeListAllocator};
use crate::config::{AllocatorKind, HeapConfig};
use crate::error::HeapError;
use crate::layers::{AccessLogger, CacheLayer};
use crate::telemetry::metrics::record_stale_reclaim;
use crate::transport::{MappedTransport, MemoryTransport, Transport};

/// Window size of the cache layer inserted by [`Heap::from_config`].
pub const CACHE_WINDOW: usize = 64;

const ZERO_CHUNK: usize = 256;

struct HeapInner {
    allocator: Mutex<Box<dyn Allocator>>,
    shadows: ShadowRegistry,
}

/// Cloneable handle to one external heap.
///
/// Clones share the allocator, the device behind it and the registry of
/// live shadows. Locks are always taken registry first, allocator second.
#[derive(Clone)]
pub struct Heap {
    inner: Arc<HeapInner>,
}

impl Heap {
    pub fn new<A: Allocator + 'static>(allocator: A) -> Self {
        Self::from_parts(Box::new(allocator), ShadowRegistry::new())
    }

    /// Like [`new`](Self::new) with a fixed run id instead of a random one.
    ///
    /// Owner slots written by a heap with another run id are treated as
    /// stale when found without a live shadow.
    pub fn with_run_id<A: Allocator + 'static>(allocator: A, run_id: u32) -> Self {
        Self::from_parts(Box::new(allocator), ShadowRegistry::with_run(run_id))
    }

    fn from_parts(allocator: Box<dyn Allocator>, shadows: ShadowRegistry) -> Self {
        Self {
            inner: Arc::new(HeapInner {
                allocator: Mutex::new(allocator),
                shadows,
            }),
        }
    }

    /// Assemble device, decorators and allocator from configuration.
    ///
    /// With a backing file that already exists, the arena is reopened and a
    /// free-list allocator attaches to the block chain found in it.
    pub fn from_config(config: &HeapConfig) -> Result<Self, HeapError> {
        config.validate()?;
        let end = Address::new(config.arena_size);

        let (device, formatted): (Box<dyn Transport>, bool) = match &config.backing_file {
            Some(path) if path.exists() => {
                let mapped = MappedTransport::open(path)?;
                if mapped.capacity() < config.arena_size {
                    return Err(HeapError::ArenaTooSmall {
                        size: mapped.capacity(),
                        minimum: config.arena_size,
                    });
                }
                (Box::new(mapped), true)
            }
            Some(path) => (Box::new(MappedTransport::create(path, config.arena_size)?), false),
            None => (Box::new(MemoryTransport::new(config.arena_size)), false),
        };

        let device = AccessLogger::labeled(device, "device");
        let device: Box<dyn Transport> = if config.cache {
            Box::new(CacheLayer::<_, CACHE_WINDOW>::new(device))
        } else {
            Box::new(device)
        };

        let allocator: Box<dyn Allocator> = match config.allocator {
            AllocatorKind::FreeList if formatted => Box::new(FreeListAllocator::open(device, end)?),
            AllocatorKind::FreeList => Box::new(FreeListAllocator::new(device, end)?),
            AllocatorKind::Bump => Box::new(BumpAllocator::new(device, end)),
        };

        let heap = Self::from_parts(allocator, ShadowRegistry::new());
        tracing::info!(
            arena_size = config.arena_size,
            allocator = %config.allocator,
            cache = config.cache,
            reopened = formatted,
            free_bytes = heap.free_bytes(),
            "heap ready"
        );
        Ok(heap)
    }

    /// Random non-zero id stamped into every owner slot this heap claims.
    pub fn run_id(&self) -> u32 {
        self.inner.shadows.run()
    }

    pub fn allocate(&self, count: Size) -> Address {
        self.inner.allocator.lock().allocate(count)
    }

    /// Release a block. Refused (returns 0) while any frame inside it has a
    /// live shadow.
    pub fn free(&self, address: Address) -> Size {
        let live = self.inner.shadows.lock();
        let mut allocator = self.inner.allocator.lock();
        let extent = allocator.block_size(address).unwrap_or(0).max(1);
        let end = address.value().saturating_add(extent);
        if let Some(shadowed) = live
            .keys()
            .find(|key| (address.value()..end).contains(&key.value()))
        {
            tracing::warn!(%address, %shadowed, "refusing to free a block with live shadows");
            return 0;
        }
        allocator.free(address)
    }

    pub fn free_bytes(&self) -> Size {
        self.inner.allocator.lock().free_bytes()
    }

    pub fn end(&self) -> Address {
        self.inner.allocator.lock().end()
    }

    /// Run `f` against the device with the allocator locked.
    pub fn with_transport<R>(&self, f: impl FnOnce(&mut dyn Transport) -> R) -> R {
        let mut allocator = self.inner.allocator.lock();
        f(allocator.transport())
    }

    pub fn with_allocator<R>(&self, f: impl FnOnce(&mut dyn Allocator) -> R) -> R {
        let mut allocator = self.inner.allocator.lock();
        f(&mut **allocator)
    }

    /// Number of frames with at least one live shadow.
    pub fn live_shadows(&self) -> usize {
        self.inner.shadows.live_count()
    }

    pub fn frame_size<T: ExternalValue>() -> Size {
        frame_size::<T>()
    }

    /// Allocate a frame, store `value` in it and return a pointer to it.
    ///
    /// Returns a null pointer when the allocator is exhausted.
    pub fn make_external<T: ExternalValue>(&self, value: T) -> ExternalPtr<T> {
        let size = frame_size::<T>();
        let address = self.allocate(size);
        if address.is_null() {
            tracing::debug!(size, "external value allocation failed");
            return self.null();
        }

        let mut frame = vec![0u8; size as usize];
        frame[..OWNER_SLOT_SIZE].copy_from_slice(&OwnerSlot::Free.encode());
        value.encode(&mut frame[OWNER_SLOT_SIZE..]);
        self.with_transport(|transport| transport.write(address, &frame));
        self.pointer(address)
    }

    /// Allocate `count` consecutive frames with free slots and zeroed values.
    pub fn make_array<T: ExternalValue>(&self, count: Size) -> ExternalPtr<T> {
        let Some(total) = frame_size::<T>().checked_mul(count) else {
            tracing::debug!(count, "external array size overflows");
            return self.null();
        };
        let address = self.allocate(total);
        if address.is_null() {
            tracing::debug!(count, total, "external array allocation failed");
            return self.null();
        }

        self.with_transport(|transport| zero_fill(transport, address, total));
        self.pointer(address)
    }

    pub fn pointer<T: ExternalValue>(&self, address: Address) -> ExternalPtr<T> {
        ExternalPtr::new(self.clone(), address)
    }

    pub fn null<T: ExternalValue>(&self) -> ExternalPtr<T> {
        self.pointer(Address::NULL)
    }

    /// True if both handles refer to the same heap.
    pub fn ptr_eq(&self, other: &Heap) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Join the live shadow of `address`, or claim its slot and pull the value.
    pub(crate) fn acquire<T: ExternalValue>(&self, address: Address) -> Result<Shadow<T>, HeapError> {
        if address.is_null() {
            return Err(HeapError::NullPointer);
        }

        let mut live = self.inner.shadows.lock();
        if let Some(entry) = live.get_mut(&address) {
            let cell = Arc::clone(&entry.cell)
                .downcast::<Mutex<T>>()
                .map_err(|_| HeapError::TypeMismatch {
                    address,
                    expected: std::any::type_name::<T>(),
                })?;
            entry.holders += 1;
            return Ok(Shadow::new(self.clone(), address, cell, false));
        }

        let token = self.inner.shadows.next_token();
        let mut frame = vec![0u8; OWNER_SLOT_SIZE + T::SIZE];
        self.with_transport(|transport| {
            transport.read(&mut frame, address);
            transport.write(address, &OwnerSlot::Owned(token).encode());
        });

        if let OwnerSlot::Owned(stale) = OwnerSlot::decode(&frame) {
            tracing::warn!(
                %address,
                stale_run = stale.run,
                stale_generation = stale.generation,
                "reclaiming stale owner slot"
            );
            record_stale_reclaim();
        }

        let cell = Arc::new(Mutex::new(T::decode(&frame[OWNER_SLOT_SIZE..])));
        let erased: Arc<dyn Any + Send + Sync> = cell.clone();
        live.insert(
            address,
            LiveShadow {
                token,
                holders: 1,
                cell: erased,
            },
        );
        tracing::trace!(%address, generation = token.generation, "owner slot claimed");
        Ok(Shadow::new(self.clone(), address, cell, true))
    }

    pub(crate) fn retain(&self, address: Address) {
        match self.inner.shadows.lock().get_mut(&address) {
            Some(entry) => entry.holders += 1,
            None => tracing::error!(%address, "retained shadow has no live entry"),
        }
    }

    /// Drop one holder; the last one writes the value back with a free slot.
    pub(crate) fn release<T: ExternalValue>(&self, address: Address, cell: &Mutex<T>) {
        let mut live = self.inner.shadows.lock();
        let Some(entry) = live.get_mut(&address) else {
            tracing::error!(%address, "released shadow has no live entry");
            return;
        };
        entry.holders -= 1;
        if entry.holders > 0 {
            return;
        }
        if let Some(entry) = live.remove(&address) {
            tracing::trace!(%address, generation = entry.token.generation, "owner slot released");
        }

        let mut frame = vec![0u8; OWNER_SLOT_SIZE + T::SIZE];
        frame[..OWNER_SLOT_SIZE].copy_from_slice(&OwnerSlot::Free.encode());
        cell.lock().encode(&mut frame[OWNER_SLOT_SIZE..]);
        self.with_transport(|transport| transport.write(address, &frame));
    }
}

fn zero_fill(transport: &mut dyn Transport, address: Address, count: Size) {
    let zeros = [0u8; ZERO_CHUNK];
    let mut offset: Size = 0;
    while offset < count {
        let len = (count - offset).min(ZERO_CHUNK as Size);
        transport.write(address + offset, &zeros[..len as usize]);
        offset += len;
    }
}

impl fmt::Debug for Heap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Heap")
            .field("run_id", &self.run_id())
            .field("live_shadows", &self.live_shadows())
            .finish_non_exhaustive()
    }
}

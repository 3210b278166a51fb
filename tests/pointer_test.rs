//! Integration tests for external pointers, shadows and the heap.

use std::thread;

use exram::alloc::{BumpAllocator, FreeListAllocator};
use exram::config::{AllocatorKind, HeapConfig};
use exram::pointer::{frame_size, ExternalValue, Heap, OwnerSlot, OwnerToken, OWNER_SLOT_SIZE};
use exram::transport::MemoryTransport;
use exram::{Address, HeapError};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Data {
    a: i32,
    b: f32,
}

impl ExternalValue for Data {
    const SIZE: usize = 8;

    fn encode(&self, out: &mut [u8]) {
        self.a.encode(&mut out[..4]);
        self.b.encode(&mut out[4..]);
    }

    fn decode(bytes: &[u8]) -> Self {
        Self {
            a: i32::decode(&bytes[..4]),
            b: f32::decode(&bytes[4..]),
        }
    }
}

fn bump_heap() -> Heap {
    Heap::new(BumpAllocator::new(MemoryTransport::new(1024), Address::new(1024)))
}

fn free_list_heap(size: u32) -> Heap {
    Heap::new(FreeListAllocator::new(MemoryTransport::new(size), Address::new(size)).unwrap())
}

fn stored_value<T: ExternalValue>(heap: &Heap, address: Address) -> T {
    let mut bytes = vec![0u8; T::SIZE];
    heap.with_transport(|t| t.read(&mut bytes, address + OWNER_SLOT_SIZE as u32));
    T::decode(&bytes)
}

fn stored_slot(heap: &Heap, address: Address) -> OwnerSlot {
    let mut bytes = [0u8; OWNER_SLOT_SIZE];
    heap.with_transport(|t| t.read(&mut bytes, address));
    OwnerSlot::decode(&bytes)
}

// === Dereference ===

#[test]
fn dereference_allows_access() {
    let heap = bump_heap();
    let ptr = heap.make_external(Data { a: 0, b: 0.0 });
    let data = Data { a: 10, b: 3.1415 };

    ptr.set(data).unwrap();
    assert_eq!(ptr.get().unwrap(), data);
}

#[test]
fn shadow_round_trip_commits_on_drop() {
    let heap = free_list_heap(1024);
    let ptr = heap.make_external(0u64);

    let shadow = ptr.deref().unwrap();
    shadow.set(0xDEAD_BEEF);
    assert_eq!(stored_value::<u64>(&heap, ptr.address()), 0);
    drop(shadow);

    assert_eq!(stored_value::<u64>(&heap, ptr.address()), 0xDEAD_BEEF);
    assert_eq!(ptr.deref().unwrap().get(), 0xDEAD_BEEF);
}

#[test]
fn member_access_through_read() {
    let heap = bump_heap();
    let ptr = heap.make_external(Data { a: 10, b: 3.1415 });
    let shadow = ptr.deref().unwrap();
    assert_eq!(shadow.read(|d| d.a), 10);
    assert_eq!(shadow.read(|d| d.b), 3.1415);
}

#[test]
fn null_pointer_dereference_is_an_error() {
    let heap = bump_heap();
    let ptr = heap.null::<Data>();
    assert!(matches!(ptr.get(), Err(HeapError::NullPointer)));
}

#[test]
fn frame_reserves_owner_slot() {
    assert_eq!(frame_size::<Data>(), 16);
    assert_eq!(Heap::frame_size::<u8>(), 9);

    let heap = free_list_heap(1024);
    let before = heap.free_bytes();
    let ptr = heap.make_external(Data { a: 1, b: 2.0 });
    assert_eq!(before - heap.free_bytes(), 16 + 16);
    assert_eq!(ptr.free(), 16);
    assert_eq!(heap.free_bytes(), before);
}

#[test]
fn exhausted_heap_returns_null_pointer() {
    let heap = free_list_heap(64);
    let ptr = heap.make_external([0u64; 8]);
    assert!(ptr.is_null());
    assert!(heap.make_array::<Data>(100).is_null());
}

// === Arrays and offsets ===

#[test]
fn subscript_allows_access() {
    let heap = bump_heap();
    let ptr = heap.make_array::<Data>(2);
    let a = Data { a: 10, b: 3.1415 };
    let b = Data { a: 20, b: 1.5 };

    ptr.at(0).unwrap().set(a);
    ptr.at(1).unwrap().set(b);

    assert_eq!(ptr.at(0).unwrap().get(), a);
    assert_eq!(ptr.at(1).unwrap().get(), b);
}

#[test]
fn new_array_is_zeroed_with_free_slots() {
    let heap = free_list_heap(1024);
    let ptr = heap.make_array::<u32>(5);
    for i in 0..5 {
        let element = ptr.element(i);
        assert!(stored_slot(&heap, element.address()).is_free());
        assert_eq!(element.get().unwrap(), 0);
    }
}

#[test]
fn offsets_index_into_arrays() {
    let heap = bump_heap();
    let ptr = heap.make_array::<Data>(2);
    let mut a_ptr = &ptr + 0;
    let b_ptr = &ptr + 1;

    assert_eq!(*a_ptr.increment(), b_ptr);
    assert_eq!(*a_ptr.decrement(), ptr);
    assert_eq!(b_ptr.address() - ptr.address(), frame_size::<Data>());
}

#[test]
fn iteration_with_post_increment() {
    let heap = free_list_heap(2048);
    let base = heap.make_array::<u16>(10);
    let mut cursor = base.clone();
    for i in 0..10u16 {
        cursor.post_increment().set(i * i).unwrap();
    }

    let mut sum = 0u32;
    while cursor != base {
        cursor -= 1;
        sum += u32::from(cursor.get().unwrap());
    }
    assert_eq!(sum, (0..10u32).map(|i| i * i).sum::<u32>());
}

#[test]
fn array_free_waits_for_element_shadows() {
    let heap = free_list_heap(1024);
    let array = heap.make_array::<u32>(4);
    let shadow = array.at(2).unwrap();
    shadow.set(0xDEAD_BEEF);

    assert_eq!(array.free(), 0);

    // A new array cannot land on the shadowed block.
    let other = heap.make_array::<u32>(4);
    assert_ne!(other.address(), array.address());
    assert_eq!(other.at(2).unwrap().get(), 0);

    drop(shadow);
    assert_eq!(heap.live_shadows(), 0);
    assert_eq!(array.element(2).get().unwrap(), 0xDEAD_BEEF);
    assert_eq!(array.free(), 4 * frame_size::<u32>());

    let reused = heap.make_array::<u32>(4);
    assert_eq!(reused.address(), array.address());
    assert_eq!(reused.at(2).unwrap().get(), 0);
}

// === Shared shadows ===

#[test]
fn second_shadow_joins_first() {
    let heap = free_list_heap(1024);
    let ptr = heap.make_external(1i32);

    let first = ptr.deref().unwrap();
    let second = ptr.deref().unwrap();
    assert!(first.is_primary());
    assert!(!second.is_primary());
    assert_eq!(heap.live_shadows(), 1);

    second.set(7);
    assert_eq!(first.get(), 7);

    // the primary going away first must not lose the joined shadow's write
    drop(first);
    assert_eq!(stored_value::<i32>(&heap, ptr.address()), 1);
    second.update(|v| *v += 1);
    drop(second);

    assert_eq!(stored_value::<i32>(&heap, ptr.address()), 8);
    assert!(stored_slot(&heap, ptr.address()).is_free());
    assert_eq!(heap.live_shadows(), 0);
}

#[test]
fn cloned_shadow_shares_value() {
    let heap = bump_heap();
    let ptr = heap.make_external(0u8);
    let shadow = ptr.deref().unwrap();
    let copy = shadow.clone();
    assert!(!copy.is_primary());
    copy.set(3);
    drop(shadow);
    drop(copy);
    assert_eq!(ptr.get().unwrap(), 3);
}

#[test]
fn concurrent_updates_are_not_lost() {
    let heap = free_list_heap(1024);
    let ptr = heap.make_external(0u64);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let ptr = ptr.clone();
            thread::spawn(move || {
                for _ in 0..250 {
                    ptr.update(|v| *v += 1).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(ptr.get().unwrap(), 1000);
    assert_eq!(heap.live_shadows(), 0);
}

// === Stale owner slots ===

#[test]
fn stale_slot_is_reclaimed() {
    let heap = free_list_heap(1024);
    let ptr = heap.make_external(5u32);
    let stale = OwnerSlot::Owned(OwnerToken {
        run: heap.run_id().wrapping_add(1).max(1),
        generation: 3,
    });
    heap.with_transport(|t| t.write(ptr.address(), &stale.encode()));

    let shadow = ptr.deref().unwrap();
    assert!(shadow.is_primary());
    assert_eq!(shadow.get(), 5);
    drop(shadow);
    assert!(stored_slot(&heap, ptr.address()).is_free());
}

#[test]
fn stale_slot_survives_restart_and_is_reclaimed() {
    let dir = tempfile::tempdir().unwrap();
    let config = HeapConfig {
        arena_size: 4096,
        allocator: AllocatorKind::FreeList,
        cache: true,
        backing_file: Some(dir.path().join("arena.bin")),
    };

    let address = {
        let heap = Heap::from_config(&config).unwrap();
        let ptr = heap.make_external(Data { a: 42, b: 0.5 });
        // a claim never released, as left behind by a crashed run
        let claim = OwnerSlot::Owned(OwnerToken {
            run: heap.run_id(),
            generation: 99,
        });
        heap.with_transport(|t| t.write(ptr.address(), &claim.encode()));
        ptr.address()
    };

    let heap = Heap::from_config(&config).unwrap();
    let ptr = heap.pointer::<Data>(address);
    let shadow = ptr.deref().unwrap();
    assert!(shadow.is_primary());
    assert_eq!(shadow.get(), Data { a: 42, b: 0.5 });
    drop(shadow);
    assert!(stored_slot(&heap, address).is_free());
    assert_eq!(ptr.free(), 16);
}

#[test]
fn runs_with_distinct_ids_write_distinct_tokens() {
    let a = Heap::with_run_id(
        BumpAllocator::new(MemoryTransport::new(256), Address::new(256)),
        11,
    );
    let ptr = a.make_external(0u8);
    let _shadow = ptr.deref().unwrap();
    match stored_slot(&a, ptr.address()) {
        OwnerSlot::Owned(token) => assert_eq!(token.run, 11),
        OwnerSlot::Free => panic!("slot should be owned"),
    }
}

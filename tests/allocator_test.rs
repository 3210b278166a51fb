//! Integration tests for the free-list and bump allocators.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use exram::alloc::{Allocator, BlockInfo, BumpAllocator, FreeListAllocator, ALIGNMENT, HEADER_SIZE};
use exram::layers::{AccessCounter, CacheLayer};
use exram::transport::MemoryTransport;
use exram::{Address, Size};

fn arena(size: Size) -> FreeListAllocator<MemoryTransport> {
    FreeListAllocator::new(MemoryTransport::new(size), Address::new(size)).unwrap()
}

fn overlaps(a: Address, a_len: Size, b: Address, b_len: Size) -> bool {
    a < b + b_len && b < a + a_len
}

// === Free-bytes conservation ===

#[test]
fn allocate_then_free_restores_free_bytes() {
    let mut allocator = arena(4096);
    for n in [0, 1, 3, 4, 5, 16, 100, 1000, 4000] {
        let before = allocator.free_bytes();
        let address = allocator.allocate(n);
        assert!(!address.is_null(), "allocate({}) failed", n);
        assert!(allocator.free(address) >= n);
        assert_eq!(allocator.free_bytes(), before, "n = {}", n);
    }
}

#[test]
fn free_bytes_accounts_header_and_alignment() {
    let mut allocator = arena(1024);
    let before = allocator.free_bytes();
    allocator.allocate(10);
    assert_eq!(allocator.free_bytes(), before - HEADER_SIZE - 12);
}

// === Non-overlap ===

#[test]
fn live_blocks_never_overlap() {
    let mut allocator = arena(8192);
    let mut rng = StdRng::seed_from_u64(7);
    let mut live: Vec<(Address, Size)> = Vec::new();

    for _ in 0..500 {
        if live.is_empty() || rng.gen_bool(0.6) {
            let n = rng.gen_range(0..200);
            let address = allocator.allocate(n);
            if address.is_null() {
                continue;
            }
            assert!(address + n <= Address::new(8192));
            for &(other, other_len) in &live {
                assert!(!overlaps(address, n, other, other_len));
            }
            live.push((address, n));
        } else {
            let index = rng.gen_range(0..live.len());
            let (address, n) = live.swap_remove(index);
            assert!(allocator.free(address) >= n);
        }
    }

    let blocks: Vec<BlockInfo> = allocator.blocks();
    assert_eq!(blocks.len(), live.len());
}

#[test]
fn free_bytes_matches_live_blocks() {
    let mut allocator = arena(2048);
    let a = allocator.allocate(50);
    allocator.allocate(70);
    allocator.allocate(1);
    allocator.free(a);

    let used: Size = allocator
        .blocks()
        .iter()
        .map(|b| b.size + HEADER_SIZE)
        .sum();
    assert_eq!(allocator.free_bytes(), 2048 - HEADER_SIZE - used);
    assert!(allocator.blocks().iter().all(|b| b.address.value() % ALIGNMENT == 0));
}

// === Reuse ===

#[test]
fn freed_block_is_reused_first_fit() {
    let mut allocator = arena(1024);
    let _a = allocator.allocate(64);
    let b = allocator.allocate(64);
    allocator.free(b);
    assert_eq!(allocator.allocate(64), b);
}

#[test]
fn smaller_request_fits_in_freed_gap() {
    let mut allocator = arena(1024);
    let a = allocator.allocate(64);
    let _b = allocator.allocate(64);
    allocator.free(a);
    assert_eq!(allocator.allocate(32), a);
}

// === Failure ===

#[test]
fn too_large_allocation_fails_cleanly() {
    let mut allocator = arena(1024);
    let before = allocator.free_bytes();
    assert!(allocator.allocate(2048).is_null());
    assert!(allocator.allocate(before).is_null());
    assert!(allocator.allocate(Size::MAX).is_null());
    assert_eq!(allocator.free_bytes(), before);
}

#[test]
fn exhausted_arena_recovers_after_free() {
    let mut allocator = arena(256);
    let mut blocks = Vec::new();
    loop {
        let address = allocator.allocate(16);
        if address.is_null() {
            break;
        }
        blocks.push(address);
    }
    assert!(!blocks.is_empty());
    let last = blocks[blocks.len() - 1];
    allocator.free(last);
    assert_eq!(allocator.allocate(16), last);
}

#[test]
fn garbage_free_is_rejected() {
    let mut allocator = arena(1024);
    let a = allocator.allocate(100);
    let before = allocator.free_bytes();
    assert_eq!(allocator.free(a + 4), 0);
    assert_eq!(allocator.free(Address::new(1024)), 0);
    assert_eq!(allocator.free_bytes(), before);
}

// === End-to-end ===

#[test]
fn end_to_end_scenario() {
    let mut allocator = arena(1024);
    let initial = allocator.free_bytes();

    let a = allocator.allocate(100);
    assert!(!a.is_null());
    let b = allocator.allocate(100);
    assert!(b >= a + 100);

    allocator.free(b);
    let before_third = allocator.free_bytes();
    assert_eq!(allocator.allocate(100), b);

    allocator.free(b);
    allocator.free(a);
    assert_eq!(allocator.free_bytes(), initial);
    assert_eq!(before_third, initial - HEADER_SIZE - 100);
}

#[test]
fn end_to_end_through_cache_matches_direct() {
    let mut direct = arena(1024);
    let device = CacheLayer::<_, 64>::new(AccessCounter::new(MemoryTransport::new(1024)));
    let mut cached = FreeListAllocator::new(device, Address::new(1024)).unwrap();

    for n in [100, 100, 7, 300] {
        assert_eq!(direct.allocate(n), cached.allocate(n));
    }
    let second = Address::new(148);
    assert_eq!(direct.free(second), cached.free(second));
    assert_eq!(direct.allocate(100), cached.allocate(100));
    assert_eq!(direct.free_bytes(), cached.free_bytes());
}

#[test]
fn reopened_arena_keeps_blocks() {
    let mut allocator = arena(1024);
    let a = allocator.allocate(24);
    let b = allocator.allocate(40);
    let blocks = allocator.blocks();
    let device = allocator.into_inner();

    let mut reopened = FreeListAllocator::open(device, Address::new(1024)).unwrap();
    assert_eq!(reopened.blocks(), blocks);
    assert_eq!(reopened.free(a), 24);
    assert_eq!(reopened.free(b), 40);
    assert_eq!(reopened.free_bytes(), 1024 - HEADER_SIZE);
}

// === Bump allocator ===

#[test]
fn bump_allocator_never_reuses() {
    let mut bump = BumpAllocator::new(MemoryTransport::new(1024), Address::new(1024));
    let a = bump.allocate(100);
    let b = bump.allocate(100);
    assert_eq!(b, a + 100);
    assert_eq!(bump.free(b), 0);
    assert_eq!(bump.allocate(100), b + 100);
}

#[test]
fn bump_allocator_fills_exactly_to_end() {
    let mut bump = BumpAllocator::new(MemoryTransport::new(128), Address::new(128));
    let a = bump.allocate(96);
    assert!(!a.is_null());
    assert_eq!(bump.free_bytes(), 0);
    assert!(bump.allocate(1).is_null());
}

#[test]
fn allocators_work_behind_trait_objects() {
    let mut allocators: Vec<Box<dyn Allocator>> = vec![
        Box::new(arena(512)),
        Box::new(BumpAllocator::new(MemoryTransport::new(512), Address::new(512))),
    ];
    for allocator in &mut allocators {
        let address = allocator.allocate(32);
        assert!(!address.is_null());
        allocator.transport().write(address, &[1, 2, 3]);
        let mut back = [0u8; 3];
        allocator.transport().read(&mut back, address);
        assert_eq!(back, [1, 2, 3]);
        assert_eq!(allocator.end(), Address::new(512));
    }
}

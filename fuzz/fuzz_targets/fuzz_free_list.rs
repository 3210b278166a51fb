//! Fuzz target for the free-list allocator.
//!
//! Drives arbitrary allocate/free sequences, including frees of addresses
//! that were never handed out, and checks that live blocks never overlap
//! and that free bytes always match the live set.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use exram::alloc::{Allocator, FreeListAllocator, HEADER_SIZE};
use exram::transport::MemoryTransport;
use exram::Address;

const ARENA: u32 = 4096;

#[derive(Debug, Arbitrary)]
enum Op {
    Allocate(u16),
    FreeLive(u8),
    FreeRaw(u16),
}

fuzz_target!(|ops: Vec<Op>| {
    let mut allocator =
        FreeListAllocator::new(MemoryTransport::new(ARENA), Address::new(ARENA)).unwrap();
    let mut live: Vec<(Address, u32)> = Vec::new();

    for op in ops {
        match op {
            Op::Allocate(n) => {
                let n = u32::from(n);
                let address = allocator.allocate(n);
                if address.is_null() {
                    continue;
                }
                assert!(address + n <= Address::new(ARENA));
                for &(other, len) in &live {
                    assert!(address + n <= other || other + len <= address);
                }
                live.push((address, n));
            }
            Op::FreeLive(i) => {
                if live.is_empty() {
                    continue;
                }
                let (address, n) = live.swap_remove(usize::from(i) % live.len());
                assert!(allocator.free(address) >= n);
            }
            Op::FreeRaw(raw) => {
                let address = Address::new(u32::from(raw));
                if live.iter().any(|&(a, _)| a == address) {
                    continue;
                }
                // never-allocated addresses may alias a header by chance;
                // only a rejection is safe to continue from
                let before = allocator.free_bytes();
                if allocator.free(address) != 0 {
                    return;
                }
                assert_eq!(allocator.free_bytes(), before);
            }
        }

        let used: u32 = allocator.blocks().iter().map(|b| b.size + HEADER_SIZE).sum();
        assert_eq!(allocator.free_bytes(), ARENA - HEADER_SIZE - used);
    }
});

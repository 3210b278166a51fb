//! Fuzz target for the cache layer.
//!
//! Every read through the cache must return what a flat reference memory
//! returns for the same sequence of writes, whatever the access sizes.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use exram::layers::CacheLayer;
use exram::transport::{MemoryTransport, Transport};
use exram::Address;

const DEVICE: u32 = 512;
const WINDOW: usize = 32;

#[derive(Debug, Arbitrary)]
enum Op {
    Read { address: u16, len: u8 },
    Write { address: u16, bytes: Vec<u8> },
    Flush,
    Evict,
}

/// Keep accesses inside the device; past its end the window may hold bytes
/// the device discards.
fn in_device(address: u16, len: usize) -> (Address, usize) {
    let address = u32::from(address) % DEVICE;
    (Address::new(address), len.min((DEVICE - address) as usize))
}

fuzz_target!(|ops: Vec<Op>| {
    let mut cache = CacheLayer::<_, WINDOW>::new(MemoryTransport::new(DEVICE));
    let mut reference = MemoryTransport::new(DEVICE);

    for op in ops {
        match op {
            Op::Read { address, len } => {
                let (address, len) = in_device(address, usize::from(len));
                let mut got = vec![0u8; len];
                let mut want = vec![0u8; len];
                cache.read(&mut got, address);
                reference.read(&mut want, address);
                assert_eq!(got, want);
            }
            Op::Write { address, bytes } => {
                let (address, len) = in_device(address, bytes.len());
                cache.write(address, &bytes[..len]);
                reference.write(address, &bytes[..len]);
            }
            Op::Flush => cache.flush(),
            Op::Evict => cache.evict(),
        }
    }
});

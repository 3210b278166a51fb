// Copyright 2024-2026 exram Contributors
// SPDX-License-Identifier: Apache-2.0

//! First-fit allocator keeping a linked list of block headers inside the
//! arena it manages.
//!
//! Each block is preceded by a 16-byte header `{previous, next, begin, end}`
//! stored in external memory. A zero-length sentinel head lives at offset 0;
//! the last block's `next` equals the arena end. Free space is never tracked
//! explicitly: it is the gap between one block's aligned end and the next
//! header. Gaps are not merged or compacted, so alternating allocation sizes
//! can fragment the arena.

use super::{Allocator, BlockInfo};
use crate::address::{align_up, Address, Size};
use crate::error::HeapError;
use crate::telemetry::metrics::{record_allocation, record_free};
use crate::transport::Transport;

/// Bytes of bookkeeping in front of every block.
pub const HEADER_SIZE: Size = 16;

/// Payload sizes are rounded up to this quantum.
pub const ALIGNMENT: Size = 4;

const HEAD: Address = Address::NULL;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Header {
    previous: Address,
    next: Address,
    begin: Address,
    end: Address,
}

impl Header {
    /// Empty header placed at `address`.
    fn at(address: Address) -> Self {
        let begin = address + HEADER_SIZE;
        Self {
            previous: Address::NULL,
            next: Address::NULL,
            begin,
            end: begin,
        }
    }

    /// Where this header lives; it sits directly before its data.
    fn address(&self) -> Address {
        self.begin.checked_sub(HEADER_SIZE).unwrap_or(Address::NULL)
    }

    fn size(&self) -> Size {
        self.end.saturating_distance(self.begin)
    }

    fn encode(&self) -> [u8; HEADER_SIZE as usize] {
        let mut bytes = [0u8; HEADER_SIZE as usize];
        for (chunk, field) in bytes
            .chunks_exact_mut(4)
            .zip([self.previous, self.next, self.begin, self.end])
        {
            chunk.copy_from_slice(&field.value().to_le_bytes());
        }
        bytes
    }

    fn decode(bytes: &[u8; HEADER_SIZE as usize]) -> Self {
        let field = |i: usize| {
            Address::new(u32::from_le_bytes([
                bytes[i * 4],
                bytes[i * 4 + 1],
                bytes[i * 4 + 2],
                bytes[i * 4 + 3],
            ]))
        };
        Self {
            previous: field(0),
            next: field(1),
            begin: field(2),
            end: field(3),
        }
    }
}

/// First-fit allocator with external block headers.
pub struct FreeListAllocator<T: Transport> {
    transport: T,
    end: Address,
    free_bytes: Size,
}

impl<T: Transport> FreeListAllocator<T> {
    /// Format `[0, end)` on `transport` as an empty arena.
    pub fn new(transport: T, end: Address) -> Result<Self, HeapError> {
        check_arena_size(end)?;
        let mut allocator = Self {
            transport,
            end,
            free_bytes: end.value() - HEADER_SIZE,
        };

        // The head is a zero-length block whose `next` covers the whole arena,
        // so allocate() can treat it like any other block.
        let mut head = Header::at(HEAD);
        head.previous = HEAD;
        head.next = end;
        allocator.write_header(head);

        tracing::debug!(end = %end, free_bytes = allocator.free_bytes, "formatted arena");
        Ok(allocator)
    }

    /// Attach to an arena formatted earlier, e.g. on a persistent device.
    ///
    /// Walks the block chain to validate it and rebuild the free-byte count.
    pub fn open(transport: T, end: Address) -> Result<Self, HeapError> {
        check_arena_size(end)?;
        let mut allocator = Self {
            transport,
            end,
            free_bytes: 0,
        };

        let head = allocator.read_header(HEAD);
        if head.begin != HEAD + HEADER_SIZE || head.end != head.begin || head.previous != HEAD {
            return Err(corrupt(HEAD, "missing arena head"));
        }

        let mut used: Size = HEADER_SIZE;
        let mut current = head;
        while current.next < end {
            if current.next <= current.address() {
                return Err(corrupt(current.address(), "block chain is not ascending"));
            }
            let next = allocator.read_header(current.next);
            if next.address() != current.next
                || next.previous != current.address()
                || next.end < next.begin
                || next.end > end
            {
                return Err(corrupt(current.next, "inconsistent block header"));
            }
            used += HEADER_SIZE + next.size();
            current = next;
        }
        if current.next != end {
            return Err(corrupt(current.address(), "chain does not end at arena end"));
        }

        allocator.free_bytes = end.value() - used;
        tracing::debug!(end = %end, free_bytes = allocator.free_bytes, "opened arena");
        Ok(allocator)
    }

    /// Snapshot of all live blocks in address order.
    pub fn blocks(&mut self) -> Vec<BlockInfo> {
        let mut blocks = Vec::new();
        let mut current = self.read_header(HEAD);
        while current.next < self.end && current.next > current.address() {
            current = self.read_header(current.next);
            blocks.push(BlockInfo {
                address: current.begin,
                size: current.size(),
            });
        }
        blocks
    }

    pub fn device(&self) -> &T {
        &self.transport
    }

    pub fn device_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    fn read_header(&mut self, address: Address) -> Header {
        let mut bytes = [0u8; HEADER_SIZE as usize];
        self.transport.read(&mut bytes, address);
        Header::decode(&bytes)
    }

    fn write_header(&mut self, header: Header) {
        self.transport.write(header.address(), &header.encode());
    }

    fn link_new_block(&mut self, count: Size) -> Address {
        let Some(aligned) = align_up(count.max(1), ALIGNMENT) else {
            return Address::NULL;
        };
        let Some(total) = aligned.checked_add(HEADER_SIZE) else {
            return Address::NULL;
        };

        let mut current = self.read_header(HEAD);
        loop {
            let Some(gap_start) = current.end.align_up(ALIGNMENT) else {
                return Address::NULL;
            };
            let available = current.next.saturating_distance(gap_start);

            if total <= available {
                // before: current <-> next
                // after:  current <-> block <-> next
                let mut block = Header::at(gap_start);
                block.end = block.begin + aligned;
                block.next = current.next;
                block.previous = current.address();
                current.next = gap_start;

                self.write_header(block);
                self.write_header(current);

                if block.next < self.end {
                    let mut next = self.read_header(block.next);
                    next.previous = gap_start;
                    self.write_header(next);
                }

                self.free_bytes -= total;
                tracing::trace!(address = %block.begin, count, reserved = aligned, "allocated block");
                return block.begin;
            } else if current.next < self.end {
                if current.next <= current.address() {
                    tracing::error!(at = %current.address(), "block chain is not ascending");
                    return Address::NULL;
                }
                current = self.read_header(current.next);
            } else {
                tracing::debug!(count, free_bytes = self.free_bytes, "no gap large enough");
                return Address::NULL;
            }
        }
    }

    /// Header of the linked block whose payload starts at `address`.
    fn linked_header(&mut self, address: Address) -> Result<(Header, Header), &'static str> {
        let header_address = match address.checked_sub(HEADER_SIZE) {
            Some(a) if a != HEAD && address < self.end => a,
            _ => return Err("free of arena head or out-of-range address"),
        };

        let header = self.read_header(header_address);
        if header.begin != address
            || header.end < header.begin
            || header.end > self.end
            || header.previous >= header_address
        {
            return Err("free of address that is not a block");
        }

        let previous = self.read_header(header.previous);
        if previous.next != header_address {
            return Err("free of block that is not linked, double free?");
        }
        Ok((header, previous))
    }

    fn unlink_block(&mut self, address: Address) -> Size {
        let (header, mut previous) = match self.linked_header(address) {
            Ok(found) => found,
            Err(reason) => {
                tracing::warn!(address = %address, "{}", reason);
                return 0;
            }
        };

        previous.next = header.next;
        self.write_header(previous);

        if header.next < self.end {
            let mut next = self.read_header(header.next);
            next.previous = previous.address();
            self.write_header(next);
        }

        let size = header.size();
        self.free_bytes += size + HEADER_SIZE;
        tracing::trace!(address = %address, size, "freed block");
        size
    }
}

impl<T: Transport> Allocator for FreeListAllocator<T> {
    fn allocate(&mut self, count: Size) -> Address {
        let address = self.link_new_block(count);
        record_allocation(!address.is_null(), self.free_bytes);
        address
    }

    fn free(&mut self, address: Address) -> Size {
        let reclaimed = self.unlink_block(address);
        record_free(reclaimed, self.free_bytes);
        reclaimed
    }

    fn block_size(&mut self, address: Address) -> Option<Size> {
        self.linked_header(address).ok().map(|(header, _)| header.size())
    }

    fn free_bytes(&self) -> Size {
        self.free_bytes
    }

    fn end(&self) -> Address {
        self.end
    }

    fn transport(&mut self) -> &mut dyn Transport {
        &mut self.transport
    }
}

fn check_arena_size(end: Address) -> Result<(), HeapError> {
    if end.value() < HEADER_SIZE {
        return Err(HeapError::ArenaTooSmall {
            size: end.value(),
            minimum: HEADER_SIZE,
        });
    }
    Ok(())
}

fn corrupt(address: Address, reason: &str) -> HeapError {
    HeapError::CorruptArena {
        address,
        reason: reason.to_string(),
    }
}

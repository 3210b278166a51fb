// Copyright 2024-2026 exram Contributors
// SPDX-License-Identifier: Apache-2.0

//! Single-window write-back cache.
//!
//! Holds one contiguous window of `N` bytes. Accesses that fit in the window
//! are served locally; a miss writes back the old window (if dirty) and
//! fetches `N` bytes starting at the requested address. Accesses larger than
//! `N` bypass the window, but only after the window has been made coherent
//! with upstream: reads flush it, writes evict it.

use super::Layer;
use crate::address::{Address, Size};
use crate::telemetry::metrics::{record_cache_access, record_cache_flush, CacheOutcome};
use crate::transport::Transport;

/// Counters for one cache instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub bypasses: u64,
    pub flushes: u64,
}

/// Write-back cache of one `N`-byte window over an upstream transport.
pub struct CacheLayer<U: Transport, const N: usize> {
    upstream: U,
    begin: Address,
    end: Address,
    dirty: bool,
    buffer: [u8; N],
    stats: CacheStats,
}

impl<U: Transport, const N: usize> CacheLayer<U, N> {
    pub fn new(upstream: U) -> Self {
        Self {
            upstream,
            begin: Address::NULL,
            end: Address::NULL,
            dirty: false,
            buffer: [0u8; N],
            stats: CacheStats::default(),
        }
    }

    /// Window capacity in bytes.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// True iff `[address, address + count)` lies inside the current window.
    pub fn is_cached(&self, address: Address, count: Size) -> bool {
        if !self.is_populated() {
            return false;
        }
        match address.checked_add(count) {
            Some(range_end) => self.begin <= address && range_end <= self.end,
            None => false,
        }
    }

    /// True if the window holds changes not yet written upstream.
    pub fn dirty(&self) -> bool {
        self.dirty
    }

    /// Current window as `(begin, end)`, or `None` when nothing is cached.
    pub fn window(&self) -> Option<(Address, Address)> {
        self.is_populated().then_some((self.begin, self.end))
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Write the window back upstream if it is dirty.
    pub fn flush(&mut self) {
        if !self.dirty {
            return;
        }
        let len = self.window_len();
        self.upstream.write(self.begin, &self.buffer[..len]);
        self.dirty = false;
        self.stats.flushes += 1;
        record_cache_flush();
        tracing::trace!(begin = %self.begin, len, "cache window flushed");
    }

    /// Re-read the window from upstream, discarding unflushed changes.
    pub fn refresh(&mut self) {
        if self.is_populated() {
            let len = self.window_len();
            self.upstream.read(&mut self.buffer[..len], self.begin);
        }
        self.dirty = false;
    }

    /// Flush if dirty, then drop the window.
    pub fn evict(&mut self) {
        self.flush();
        self.begin = Address::NULL;
        self.end = Address::NULL;
    }

    fn is_populated(&self) -> bool {
        self.end != self.begin
    }

    fn window_len(&self) -> usize {
        (self.end - self.begin) as usize
    }

    fn fetch(&mut self, begin: Address, end: Address) {
        self.begin = begin;
        self.end = end;
        self.refresh();
    }

    /// Make `[address, address + count)` resident and return its offset in
    /// the local buffer, or `None` if the range can never be cached.
    fn cache(&mut self, address: Address, count: usize) -> Option<usize> {
        let outcome = if count > N {
            None
        } else if self.is_cached(address, count as Size) {
            self.stats.hits += 1;
            record_cache_access(CacheOutcome::Hit);
            return Some((address - self.begin) as usize);
        } else {
            address.checked_add(N as Size)
        };

        match outcome {
            Some(end) => {
                self.stats.misses += 1;
                record_cache_access(CacheOutcome::Miss);
                self.evict();
                self.fetch(address, end);
                Some(0)
            }
            None => {
                self.stats.bypasses += 1;
                record_cache_access(CacheOutcome::Bypass);
                None
            }
        }
    }
}

impl<U: Transport, const N: usize> Transport for CacheLayer<U, N> {
    fn read(&mut self, dst: &mut [u8], from: Address) {
        if dst.is_empty() {
            return;
        }
        match self.cache(from, dst.len()) {
            Some(offset) => dst.copy_from_slice(&self.buffer[offset..offset + dst.len()]),
            None => {
                // a dirty window may overlap the range being read
                self.flush();
                self.upstream.read(dst, from);
            }
        }
    }

    fn write(&mut self, to: Address, src: &[u8]) {
        if src.is_empty() {
            return;
        }
        match self.cache(to, src.len()) {
            Some(offset) => {
                self.buffer[offset..offset + src.len()].copy_from_slice(src);
                self.dirty = true;
            }
            None => {
                // the window must not keep stale bytes of the range written
                self.evict();
                self.upstream.write(to, src);
            }
        }
    }
}

impl<U: Transport, const N: usize> Layer for CacheLayer<U, N> {
    type Upstream = U;

    fn upstream(&self) -> &U {
        &self.upstream
    }

    fn upstream_mut(&mut self) -> &mut U {
        &mut self.upstream
    }
}

impl<U: Transport, const N: usize> Drop for CacheLayer<U, N> {
    fn drop(&mut self) {
        self.flush();
    }
}

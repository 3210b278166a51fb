// Copyright 2024-2026 exram Contributors
// SPDX-License-Identifier: Apache-2.0

//! Access counting decorator.

use super::Layer;
use crate::address::Address;
use crate::telemetry::metrics::{record_transport_read, record_transport_write};
use crate::transport::Transport;

/// Counts every access forwarded to the upstream transport.
pub struct AccessCounter<U: Transport> {
    upstream: U,
    reads: u64,
    writes: u64,
    bytes_read: u64,
    bytes_written: u64,
}

impl<U: Transport> AccessCounter<U> {
    pub fn new(upstream: U) -> Self {
        Self {
            upstream,
            reads: 0,
            writes: 0,
            bytes_read: 0,
            bytes_written: 0,
        }
    }

    pub fn reads(&self) -> u64 {
        self.reads
    }

    pub fn writes(&self) -> u64 {
        self.writes
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn reset(&mut self) {
        self.reads = 0;
        self.writes = 0;
        self.bytes_read = 0;
        self.bytes_written = 0;
    }

    pub fn into_inner(self) -> U {
        self.upstream
    }
}

impl<U: Transport> Transport for AccessCounter<U> {
    fn read(&mut self, dst: &mut [u8], from: Address) {
        self.reads += 1;
        self.bytes_read += dst.len() as u64;
        record_transport_read(dst.len());
        self.upstream.read(dst, from);
    }

    fn write(&mut self, to: Address, src: &[u8]) {
        self.writes += 1;
        self.bytes_written += src.len() as u64;
        record_transport_write(src.len());
        self.upstream.write(to, src);
    }
}

impl<U: Transport> Layer for AccessCounter<U> {
    type Upstream = U;

    fn upstream(&self) -> &U {
        &self.upstream
    }

    fn upstream_mut(&mut self) -> &mut U {
        &mut self.upstream
    }
}

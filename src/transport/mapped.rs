// Copyright 2024-2026 exram Contributors
// SPDX-License-Identifier: Apache-2.0

//! File-backed transport using a writable memory map.
//!
//! Contents survive process restarts, which makes this the transport where
//! stale owner slots from an earlier run show up.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use memmap2::MmapMut;

use super::{read_bounded, write_bounded, Transport};
use crate::address::{Address, Size};

/// External memory persisted in a memory-mapped file.
pub struct MappedTransport {
    path: PathBuf,
    mmap: MmapMut,
}

impl MappedTransport {
    /// Create (or truncate) `path` as a zeroed device of `capacity` bytes.
    pub fn create(path: impl AsRef<Path>, capacity: Size) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        file.set_len(u64::from(capacity))?;
        Self::map(path, &file)
    }

    /// Open an existing device file; its length is the device capacity.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        Self::map(path, &file)
    }

    fn map(path: PathBuf, file: &File) -> std::io::Result<Self> {
        // SAFETY: the file is opened read-write by this process only and the
        // mapping is owned by this transport for its whole lifetime.
        let mmap = unsafe { MmapMut::map_mut(file)? };
        tracing::debug!(path = %path.display(), capacity = mmap.len(), "mapped external device");
        Ok(Self { path, mmap })
    }

    /// Device size in bytes, saturated at the 32-bit address space.
    pub fn capacity(&self) -> Size {
        clamp_len(self.mmap.len())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sync dirty pages to the backing file.
    pub fn flush(&self) -> std::io::Result<()> {
        self.mmap.flush()
    }
}

impl Transport for MappedTransport {
    fn read(&mut self, dst: &mut [u8], from: Address) {
        read_bounded(&self.mmap, dst, from);
    }

    fn write(&mut self, to: Address, src: &[u8]) {
        write_bounded(&mut self.mmap, to, src);
    }
}

fn clamp_len(len: usize) -> Size {
    Size::try_from(len).unwrap_or(Size::MAX)
}

impl Drop for MappedTransport {
    fn drop(&mut self) {
        if let Err(e) = self.mmap.flush() {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to sync mapped device");
        }
    }
}

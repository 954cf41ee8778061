//! Memory access layer for the inspected process
//!
//! This module provides:
//! - The [`ForeignMemory`] primitives the process-attachment layer supplies
//! - Bounded, per-pass cached reads through [`MemoryAccess`]
//! - Bounds-checked writes and bitfield read-modify-write
//! - [`SnapshotMemory`], an in-memory target for offline use and tests

pub mod block;
pub mod reader;
pub mod snapshot;
pub mod writer;

pub use block::{BlockBounds, MemoryBlock};
pub use reader::ReadCache;
pub use snapshot::SnapshotMemory;

use crate::config::MemoryConfig;
use crate::core::types::{Address, MemoryError, MemoryResult};
use std::sync::Arc;
use tracing::{trace, warn};

/// Raw access to the address space of the target process.
///
/// Implementations report failures as [`MemoryError::ForeignReadFailure`] /
/// [`MemoryError::ForeignWriteFailure`] and never block on unmapped pages.
pub trait ForeignMemory {
    /// Read exactly `size` bytes at `address`
    fn read(&self, address: Address, size: usize) -> MemoryResult<Vec<u8>>;

    /// Write all of `data` at `address`
    fn write(&self, address: Address, data: &[u8]) -> MemoryResult<()>;
}

impl<T: ForeignMemory + ?Sized> ForeignMemory for &T {
    fn read(&self, address: Address, size: usize) -> MemoryResult<Vec<u8>> {
        (**self).read(address, size)
    }

    fn write(&self, address: Address, data: &[u8]) -> MemoryResult<()> {
        (**self).write(address, data)
    }
}

impl<T: ForeignMemory + ?Sized> ForeignMemory for Box<T> {
    fn read(&self, address: Address, size: usize) -> MemoryResult<Vec<u8>> {
        (**self).read(address, size)
    }

    fn write(&self, address: Address, data: &[u8]) -> MemoryResult<()> {
        (**self).write(address, data)
    }
}

impl<T: ForeignMemory + ?Sized> ForeignMemory for Arc<T> {
    fn read(&self, address: Address, size: usize) -> MemoryResult<Vec<u8>> {
        (**self).read(address, size)
    }

    fn write(&self, address: Address, data: &[u8]) -> MemoryResult<()> {
        (**self).write(address, data)
    }
}

/// Scoped access to foreign memory for one traversal pass.
///
/// Reads are validated against a sanity bound and cached by address until
/// [`end_pass`](Self::end_pass); writes always go straight to the target.
pub struct MemoryAccess<'a> {
    target: &'a dyn ForeignMemory,
    cache: ReadCache,
    max_read_size: usize,
    foreign_reads: u64,
}

impl<'a> MemoryAccess<'a> {
    /// Create memory access over a target using configured limits
    pub fn new(target: &'a dyn ForeignMemory, config: &MemoryConfig) -> Self {
        Self::with_limits(target, config.max_read_size, config.cache_entries)
    }

    pub fn with_limits(
        target: &'a dyn ForeignMemory,
        max_read_size: usize,
        cache_entries: usize,
    ) -> Self {
        MemoryAccess {
            target,
            cache: ReadCache::new(cache_entries),
            max_read_size,
            foreign_reads: 0,
        }
    }

    /// Largest single read this access will issue
    pub fn max_read_size(&self) -> usize {
        self.max_read_size
    }

    /// Read `size` bytes at `address` into a block
    pub fn read(&mut self, address: Address, size: usize) -> MemoryResult<MemoryBlock> {
        if let Err(err) = address.check_range(size, self.max_read_size) {
            warn!("Rejected read of {} bytes at {}: {}", size, address, err);
            return Err(err);
        }

        if let Some(cached) = self.cache.get(address, size) {
            trace!("Cache hit for {} bytes at {}", size, address);
            return Ok(MemoryBlock::with_len(address, cached, size));
        }

        let data = self.read_uncached(address, size)?;
        let data: Arc<[u8]> = Arc::from(data);
        self.cache.put(address, data.clone());
        Ok(MemoryBlock::new(address, data))
    }

    /// Read a little-endian u64 at `address`
    pub fn read_u64(&mut self, address: Address) -> MemoryResult<u64> {
        let block = self.read(address, 8)?;
        block
            .read_u64(0)
            .ok_or_else(|| MemoryError::read_failed(address, "short read"))
    }

    /// Read straight from the target, bypassing the pass cache
    pub(crate) fn read_uncached(&mut self, address: Address, size: usize) -> MemoryResult<Vec<u8>> {
        trace!("Foreign read of {} bytes at {}", size, address);
        self.foreign_reads += 1;
        let data = self.target.read(address, size)?;
        if data.len() != size {
            return Err(MemoryError::read_failed(
                address,
                format!("Partial read: expected {} bytes, got {}", size, data.len()),
            ));
        }
        Ok(data)
    }

    /// Discard everything cached during the current pass
    pub fn end_pass(&mut self) {
        self.cache.clear();
    }

    /// Get cache size
    pub fn cache_size(&self) -> usize {
        self.cache.size()
    }

    /// Number of reads issued to the target by this access
    pub fn foreign_reads(&self) -> u64 {
        self.foreign_reads
    }

    /// Number of reads served from the pass cache
    pub fn cache_hits(&self) -> u64 {
        self.cache.hits()
    }
}

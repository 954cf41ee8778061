//! In-memory stand-in for a target process
//!
//! Holds a set of mapped regions and counts every read it serves, which
//! makes it useful both for inspecting captured memory offline and for
//! asserting how many foreign reads an operation issued.

use super::ForeignMemory;
use crate::core::types::{Address, MemoryError, MemoryResult};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

/// Mapped regions of a fake address space
#[derive(Debug, Default)]
pub struct SnapshotMemory {
    regions: RwLock<BTreeMap<u64, Vec<u8>>>,
    reads: AtomicU64,
    writes: AtomicU64,
    reads_by_address: Mutex<HashMap<Address, u64>>,
}

impl SnapshotMemory {
    pub fn new() -> Self {
        SnapshotMemory::default()
    }

    /// Maps `bytes` at `address`, replacing any region starting there
    pub fn map(&self, address: Address, bytes: Vec<u8>) {
        if let Ok(mut regions) = self.regions.write() {
            regions.insert(address.as_u64(), bytes);
        }
    }

    /// Maps a little-endian u64 at `address`
    pub fn map_u64(&self, address: Address, value: u64) {
        self.map(address, value.to_le_bytes().to_vec());
    }

    /// Maps a NUL-terminated string at `address`
    pub fn map_c_string(&self, address: Address, text: &str) {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        self.map(address, bytes);
    }

    /// Removes the region starting at `address`
    pub fn unmap(&self, address: Address) {
        if let Ok(mut regions) = self.regions.write() {
            regions.remove(&address.as_u64());
        }
    }

    /// Copies bytes out without counting a read
    pub fn peek(&self, address: Address, size: usize) -> Option<Vec<u8>> {
        let regions = self.regions.read().ok()?;
        let (start, region) = Self::locate(&regions, address, size)?;
        Some(region[start..start + size].to_vec())
    }

    /// Total reads served (or attempted)
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Total successful writes
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Reads attempted at exactly `address`
    pub fn reads_at(&self, address: Address) -> u64 {
        self.reads_by_address
            .lock()
            .map(|reads| reads.get(&address).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn reset_counters(&self) {
        self.reads.store(0, Ordering::Relaxed);
        self.writes.store(0, Ordering::Relaxed);
        if let Ok(mut reads) = self.reads_by_address.lock() {
            reads.clear();
        }
    }

    /// Finds the region holding `[address, address + size)` and the start
    /// index of the range inside it
    fn locate(
        regions: &BTreeMap<u64, Vec<u8>>,
        address: Address,
        size: usize,
    ) -> Option<(usize, &Vec<u8>)> {
        let (base, region) = regions.range(..=address.as_u64()).next_back()?;
        let start = usize::try_from(address.as_u64() - base).ok()?;
        let end = start.checked_add(size)?;
        if end > region.len() {
            return None;
        }
        Some((start, region))
    }
}

impl ForeignMemory for SnapshotMemory {
    fn read(&self, address: Address, size: usize) -> MemoryResult<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut reads) = self.reads_by_address.lock() {
            *reads.entry(address).or_insert(0) += 1;
        }

        let regions = self
            .regions
            .read()
            .map_err(|_| MemoryError::read_failed(address, "snapshot lock poisoned"))?;
        let (start, region) = Self::locate(&regions, address, size)
            .ok_or_else(|| MemoryError::read_failed(address, "unmapped memory"))?;
        Ok(region[start..start + size].to_vec())
    }

    fn write(&self, address: Address, data: &[u8]) -> MemoryResult<()> {
        let mut regions = self
            .regions
            .write()
            .map_err(|_| MemoryError::write_failed(address, "snapshot lock poisoned"))?;
        let (base, region) = regions
            .range_mut(..=address.as_u64())
            .next_back()
            .ok_or_else(|| MemoryError::write_failed(address, "unmapped memory"))?;
        let start = (address.as_u64() - *base) as usize;
        let end = start
            .checked_add(data.len())
            .filter(|end| *end <= region.len())
            .ok_or_else(|| MemoryError::write_failed(address, "unmapped memory"))?;
        region[start..end].copy_from_slice(data);
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

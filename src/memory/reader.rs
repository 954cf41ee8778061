//! Per-pass read cache for foreign memory blocks

use crate::core::types::Address;
use std::collections::HashMap;
use std::sync::Arc;

/// Cache entry for read operations
#[derive(Debug, Clone)]
pub struct CacheEntry {
    data: Arc<[u8]>,
    address: Address,
    sequence: u64,
}

/// Read cache for blocks fetched during one traversal pass.
///
/// Keyed by base address; an entry serves any read at the same address of
/// equal or smaller size. Entries never outlive the pass that created them:
/// the owner clears the cache when the pass ends or memory is written.
pub struct ReadCache {
    entries: HashMap<Address, CacheEntry>,
    max_entries: usize,
    next_sequence: u64,
    hits: u64,
    misses: u64,
}

impl ReadCache {
    /// Create a new read cache
    pub fn new(max_entries: usize) -> Self {
        ReadCache {
            entries: HashMap::new(),
            max_entries: max_entries.max(1),
            next_sequence: 0,
            hits: 0,
            misses: 0,
        }
    }

    /// Get cached data covering `[address, address + size)` if available
    pub fn get(&mut self, address: Address, size: usize) -> Option<Arc<[u8]>> {
        match self.entries.get(&address) {
            Some(entry) if entry.data.len() >= size => {
                self.hits += 1;
                Some(entry.data.clone())
            }
            _ => {
                self.misses += 1;
                None
            }
        }
    }

    /// Store data in cache
    pub fn put(&mut self, address: Address, data: Arc<[u8]>) {
        // Evict oldest entry if cache is full
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&address) {
            if let Some(oldest) = self.find_oldest_entry() {
                self.entries.remove(&oldest);
            }
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.entries.insert(
            address,
            CacheEntry {
                data,
                address,
                sequence,
            },
        );
    }

    /// Clear the cache
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Get cache size
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Number of lookups served from the cache
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Number of lookups that had to go to the target
    pub fn misses(&self) -> u64 {
        self.misses
    }

    fn find_oldest_entry(&self) -> Option<Address> {
        self.entries
            .values()
            .min_by_key(|e| e.sequence)
            .map(|e| e.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(data: &[u8]) -> Arc<[u8]> {
        Arc::from(data)
    }

    #[test]
    fn test_cache_operations() {
        let mut cache = ReadCache::new(2);

        cache.put(Address::new(0x1000), bytes(&[1, 2, 3, 4]));
        assert_eq!(cache.get(Address::new(0x1000), 4).as_deref(), Some(&[1, 2, 3, 4][..]));
        assert!(cache.get(Address::new(0x2000), 4).is_none());
        assert_eq!(cache.size(), 1);
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);

        cache.put(Address::new(0x2000), bytes(&[5, 6, 7, 8]));
        assert_eq!(cache.size(), 2);

        cache.put(Address::new(0x3000), bytes(&[9, 10, 11, 12]));
        assert_eq!(cache.size(), 2); // Oldest should be evicted
        assert!(cache.get(Address::new(0x1000), 4).is_none());

        cache.clear();
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_cache_find_oldest() {
        let mut cache = ReadCache::new(3);

        cache.put(Address::new(0x1000), bytes(&[1]));
        cache.put(Address::new(0x2000), bytes(&[2]));
        cache.put(Address::new(0x3000), bytes(&[3]));

        assert_eq!(cache.find_oldest_entry(), Some(Address::new(0x1000)));
    }

    #[test]
    fn test_cache_with_partial_data() {
        let mut cache = ReadCache::new(10);

        cache.put(Address::new(0x1000), bytes(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]));

        // Smaller read at the same base is served
        assert_eq!(cache.get(Address::new(0x1000), 5).map(|d| d.len()), Some(10));

        // Larger read is not
        assert!(cache.get(Address::new(0x1000), 15).is_none());
    }

    #[test]
    fn test_cache_replacement() {
        let mut cache = ReadCache::new(1);

        cache.put(Address::new(0x1000), bytes(&[1, 2, 3]));
        cache.put(Address::new(0x2000), bytes(&[4, 5, 6]));
        assert_eq!(cache.size(), 1);

        assert!(cache.get(Address::new(0x1000), 3).is_none());
        assert_eq!(cache.get(Address::new(0x2000), 3).as_deref(), Some(&[4, 5, 6][..]));
    }
}

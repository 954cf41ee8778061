//! Session-scoped cache of resolved runtime types

use crate::catalog::TypeId;
use crate::core::types::Address;
use std::collections::HashMap;

/// What a metadata pointer resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealTypeEntry {
    /// Name read from the runtime metadata
    pub runtime_name: String,
    /// Best catalog match, if any
    pub type_id: Option<TypeId>,
}

/// Runtime metadata pointer -> resolved type.
///
/// Metadata pointers are stable for a loaded class, so entries live until
/// the target session ends. Misses against the catalog are cached too.
#[derive(Debug, Default)]
pub struct RealTypeCache {
    entries: HashMap<Address, RealTypeEntry>,
    hits: u64,
    misses: u64,
}

impl RealTypeCache {
    pub fn new() -> Self {
        RealTypeCache::default()
    }

    pub fn get(&mut self, metadata: Address) -> Option<RealTypeEntry> {
        match self.entries.get(&metadata) {
            Some(entry) => {
                self.hits += 1;
                Some(entry.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, metadata: Address, entry: RealTypeEntry) {
        self.entries.insert(metadata, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Forget everything; called when the target session changes
    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }
}

//! Runtime type resolution for polymorphic object pointers
//!
//! Every object starts with a pointer to its runtime metadata. The metadata
//! names the most-derived class, which is looked up in the catalog so the
//! object can be interpreted with its real layout instead of the declared one.

mod cache;

pub use cache::{RealTypeCache, RealTypeEntry};

use crate::catalog::{TypeCatalog, TypeId};
use crate::config::ResolverConfig;
use crate::core::types::{Address, MemoryError, MemoryResult};
use crate::memory::MemoryAccess;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, trace};

/// Reads are issued in chunks of this many bytes while scanning for a NUL
const NAME_CHUNK: usize = 64;

/// Where names and parents live inside a runtime metadata object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataLayout {
    pub name_offset: u64,
    pub max_name_len: usize,
    pub super_offset: Option<u64>,
    pub max_super_hops: usize,
}

impl Default for MetadataLayout {
    fn default() -> Self {
        MetadataLayout::from(&ResolverConfig::default())
    }
}

impl From<&ResolverConfig> for MetadataLayout {
    fn from(config: &ResolverConfig) -> Self {
        MetadataLayout {
            name_offset: config.name_offset,
            max_name_len: config.max_name_len,
            super_offset: config.super_offset,
            max_super_hops: config.max_super_hops,
        }
    }
}

/// Resolves the most-derived type behind an object pointer
#[derive(Debug, Default)]
pub struct RuntimeTypeResolver {
    cache: Mutex<RealTypeCache>,
    layout: MetadataLayout,
}

impl RuntimeTypeResolver {
    pub fn new(layout: MetadataLayout) -> Self {
        RuntimeTypeResolver {
            cache: Mutex::new(RealTypeCache::new()),
            layout,
        }
    }

    pub fn layout(&self) -> &MetadataLayout {
        &self.layout
    }

    fn cache(&self) -> MutexGuard<'_, RealTypeCache> {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of metadata pointers resolved so far this session
    pub fn cached_types(&self) -> usize {
        self.cache().len()
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache().hits()
    }

    /// Drop every cached resolution (target detached or reattached)
    pub fn clear(&self) {
        debug!("Clearing real type cache");
        self.cache().clear();
    }

    /// Type to interpret `object` with.
    ///
    /// Never fails: unreadable metadata, unknown names and types unrelated to
    /// `static_type` all fall back to `static_type`.
    pub fn resolve_real_type(
        &self,
        memory: &mut MemoryAccess<'_>,
        catalog: &TypeCatalog,
        object: Address,
        static_type: TypeId,
        prefer_guess: bool,
    ) -> TypeId {
        if !prefer_guess || object.is_null() {
            return static_type;
        }
        if !catalog.try_get(static_type).map_or(false, |d| d.is_class) {
            return static_type;
        }

        match self.try_resolve(memory, catalog, object, static_type) {
            Ok(real) => real,
            Err(err) => {
                debug!(
                    "Falling back to {} for object at {}: {}",
                    type_name(catalog, static_type),
                    object,
                    err
                );
                static_type
            }
        }
    }

    /// Like [`resolve_real_type`](Self::resolve_real_type) but reports why
    /// resolution failed
    pub fn try_resolve(
        &self,
        memory: &mut MemoryAccess<'_>,
        catalog: &TypeCatalog,
        object: Address,
        static_type: TypeId,
    ) -> MemoryResult<TypeId> {
        let metadata = Address::new(memory.read_u64(object)?);
        if metadata.is_null() {
            return Err(MemoryError::ResolutionFailure(format!(
                "object at {} has no runtime metadata",
                object
            )));
        }

        let cached = self.cache().get(metadata);
        let entry = match cached {
            Some(entry) => {
                trace!("Real type cache hit for metadata {}", metadata);
                entry
            }
            None => {
                let entry = self.resolve_metadata(memory, catalog, metadata)?;
                debug!(
                    "Metadata {} resolved to {} ({:?})",
                    metadata, entry.runtime_name, entry.type_id
                );
                self.cache().insert(metadata, entry.clone());
                entry
            }
        };

        let real = entry.type_id.ok_or_else(|| {
            MemoryError::ResolutionFailure(format!("{} is not in the catalog", entry.runtime_name))
        })?;
        if !catalog.is_same_or_descendant(real, static_type) {
            return Err(MemoryError::ResolutionFailure(format!(
                "{} does not derive from {}",
                type_name(catalog, real),
                type_name(catalog, static_type)
            )));
        }
        Ok(real)
    }

    /// Name of the runtime type of `object`, read straight from metadata
    pub fn runtime_type_name(
        &self,
        memory: &mut MemoryAccess<'_>,
        object: Address,
    ) -> MemoryResult<String> {
        let metadata = Address::new(memory.read_u64(object)?);
        self.read_type_name(memory, metadata)
    }

    fn resolve_metadata(
        &self,
        memory: &mut MemoryAccess<'_>,
        catalog: &TypeCatalog,
        metadata: Address,
    ) -> MemoryResult<RealTypeEntry> {
        let runtime_name = self.read_type_name(memory, metadata)?;
        let mut type_id = catalog.is_valid_struct_name(&runtime_name);
        if type_id.is_none() {
            type_id = self.guess_from_supers(memory, catalog, metadata);
        }
        Ok(RealTypeEntry {
            runtime_name,
            type_id,
        })
    }

    /// Walk the runtime parent chain until a type known to the catalog shows up
    fn guess_from_supers(
        &self,
        memory: &mut MemoryAccess<'_>,
        catalog: &TypeCatalog,
        metadata: Address,
    ) -> Option<TypeId> {
        let super_offset = self.layout.super_offset?;
        let mut current = metadata;
        for _ in 0..self.layout.max_super_hops {
            let parent = Address::new(memory.read_u64(current.offset(super_offset)).ok()?);
            if parent.is_null() || parent == current {
                return None;
            }
            let name = self.read_type_name(memory, parent).ok()?;
            if let Some(id) = catalog.is_valid_struct_name(&name) {
                debug!("Runtime super {} is the closest known type", name);
                return Some(id);
            }
            current = parent;
        }
        None
    }

    fn read_type_name(&self, memory: &mut MemoryAccess<'_>, metadata: Address) -> MemoryResult<String> {
        let name_ptr = Address::new(memory.read_u64(metadata.offset(self.layout.name_offset))?);
        if name_ptr.is_null() {
            return Err(MemoryError::ResolutionFailure(format!(
                "metadata at {} has no name",
                metadata
            )));
        }
        let name = read_c_string(memory, name_ptr, self.layout.max_name_len)?;
        if name.is_empty() {
            return Err(MemoryError::ResolutionFailure(format!(
                "metadata at {} has an empty name",
                metadata
            )));
        }
        Ok(name)
    }
}

fn type_name(catalog: &TypeCatalog, id: TypeId) -> &str {
    catalog.try_get(id).map_or("<unknown>", |d| d.name.as_str())
}

/// Read a NUL-terminated UTF-8 string of at most `max_len` bytes.
///
/// Chunks that run into unmapped memory are retried at half size, so a
/// string ending right before a page boundary is still readable.
pub(crate) fn read_c_string(
    memory: &mut MemoryAccess<'_>,
    address: Address,
    max_len: usize,
) -> MemoryResult<String> {
    let mut bytes = Vec::new();
    let mut chunk = NAME_CHUNK.min(max_len).max(1);

    while bytes.len() < max_len {
        let want = chunk.min(max_len - bytes.len());
        let cursor = address.offset(bytes.len() as u64);
        let block = match memory.read(cursor, want) {
            Ok(block) => block,
            Err(_) if want > 1 => {
                chunk = want / 2;
                continue;
            }
            Err(err) => return Err(err),
        };

        let data = block.as_bytes();
        if let Some(end) = data.iter().position(|b| *b == 0) {
            bytes.extend_from_slice(&data[..end]);
            return String::from_utf8(bytes).map_err(|_| {
                MemoryError::ResolutionFailure(format!("type name at {} is not UTF-8", address))
            });
        }
        bytes.extend_from_slice(data);
    }

    Err(MemoryError::ResolutionFailure(format!(
        "type name at {} exceeds {} bytes",
        address, max_len
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogBuilder;
    use crate::memory::SnapshotMemory;

    const OBJECT: u64 = 0x1000;
    const META: u64 = 0x8000;
    const NAME: u64 = 0x9000;

    fn catalog() -> (TypeCatalog, TypeId, TypeId, TypeId) {
        let mut builder = CatalogBuilder::new();
        let object = builder.declare_class("UObject", 0x10);
        let actor = builder.declare_class("AActor", 0x20);
        let vector = builder.declare_struct("FVector", 12);
        builder.set_parent(actor, object);
        (builder.build(), object, actor, vector)
    }

    fn target(name: &str) -> SnapshotMemory {
        let memory = SnapshotMemory::new();
        memory.map_u64(Address::new(OBJECT), META);
        memory.map_u64(Address::new(META), NAME);
        memory.map_c_string(Address::new(NAME), name);
        memory
    }

    #[test]
    fn test_resolves_derived_class() {
        let (catalog, object, actor, _) = catalog();
        let memory = target("AActor");
        let mut access = MemoryAccess::with_limits(&memory, 4096, 64);
        let resolver = RuntimeTypeResolver::default();

        let real = resolver.resolve_real_type(&mut access, &catalog, Address::new(OBJECT), object, true);
        assert_eq!(real, actor);
        assert_eq!(resolver.cached_types(), 1);
    }

    #[test]
    fn test_guess_disabled_or_null_returns_static() {
        let (catalog, object, _, vector) = catalog();
        let memory = target("AActor");
        let mut access = MemoryAccess::with_limits(&memory, 4096, 64);
        let resolver = RuntimeTypeResolver::default();

        assert_eq!(
            resolver.resolve_real_type(&mut access, &catalog, Address::new(OBJECT), object, false),
            object
        );
        assert_eq!(
            resolver.resolve_real_type(&mut access, &catalog, Address::null(), object, true),
            object
        );
        assert_eq!(
            resolver.resolve_real_type(&mut access, &catalog, Address::new(OBJECT), vector, true),
            vector
        );
        assert_eq!(memory.read_count(), 0);
    }

    #[test]
    fn test_unrelated_type_is_rejected() {
        let (catalog, _, actor, _) = catalog();
        let memory = target("UObject");
        let mut access = MemoryAccess::with_limits(&memory, 4096, 64);
        let resolver = RuntimeTypeResolver::default();

        // A base class is not a valid refinement of a derived static type
        let real = resolver.resolve_real_type(&mut access, &catalog, Address::new(OBJECT), actor, true);
        assert_eq!(real, actor);
        assert!(matches!(
            resolver.try_resolve(&mut access, &catalog, Address::new(OBJECT), actor),
            Err(MemoryError::ResolutionFailure(_))
        ));
    }

    #[test]
    fn test_super_chain_walk() {
        let (catalog, object, actor, _) = catalog();
        let parent_meta = 0xA000u64;

        let memory = SnapshotMemory::new();
        memory.map_u64(Address::new(OBJECT), META);
        let mut metadata = NAME.to_le_bytes().to_vec();
        metadata.extend_from_slice(&[0; 8]);
        metadata.extend_from_slice(&parent_meta.to_le_bytes());
        memory.map(Address::new(META), metadata);
        memory.map_c_string(Address::new(NAME), "BP_Door_C");
        memory.map_u64(Address::new(parent_meta), 0xB000);
        memory.map_c_string(Address::new(0xB000), "AActor");

        let mut access = MemoryAccess::with_limits(&memory, 4096, 64);
        let resolver = RuntimeTypeResolver::new(MetadataLayout {
            super_offset: Some(0x10),
            ..MetadataLayout::default()
        });

        let real = resolver.resolve_real_type(&mut access, &catalog, Address::new(OBJECT), object, true);
        assert_eq!(real, actor);
        assert_eq!(
            resolver
                .runtime_type_name(&mut access, Address::new(OBJECT))
                .unwrap(),
            "BP_Door_C"
        );

        // Without a super layout the unknown name falls back
        let plain = RuntimeTypeResolver::default();
        assert_eq!(
            plain.resolve_real_type(&mut access, &catalog, Address::new(OBJECT), object, true),
            object
        );
        assert_eq!(plain.cached_types(), 1);
    }

    #[test]
    fn test_read_c_string_limits() {
        let memory = SnapshotMemory::new();
        memory.map_c_string(Address::new(0x100), "AVeryLongClassName");
        let mut access = MemoryAccess::with_limits(&memory, 4096, 64);

        assert_eq!(
            read_c_string(&mut access, Address::new(0x100), 256).unwrap(),
            "AVeryLongClassName"
        );
        assert!(read_c_string(&mut access, Address::new(0x100), 4).is_err());
        assert!(read_c_string(&mut access, Address::new(0x5000), 16).is_err());
    }
}

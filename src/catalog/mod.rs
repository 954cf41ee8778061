//! Type catalog: the immutable database of recovered struct, class and enum
//! layouts that drives interpretation.
//!
//! The catalog is produced elsewhere (an SDK dump) and loaded once; every
//! other component only borrows it.

mod builder;
mod loader;
mod types;

pub use builder::CatalogBuilder;
pub use loader::{CatalogFile, EnumDef, MemberDef, StructDef, TypeRefDef};
pub use types::{
    BitRange, EnumDescriptor, EnumId, FieldType, Member, TypeDescriptor, TypeId,
    ARRAY_HEADER_SIZE, POINTER_SIZE,
};

use crate::core::types::{MemoryError, MemoryResult};
use std::collections::HashMap;

/// Read-only mapping from names to struct/class/enum descriptors
#[derive(Debug, Default)]
pub struct TypeCatalog {
    types: Vec<TypeDescriptor>,
    enums: Vec<EnumDescriptor>,
    classes_by_name: HashMap<String, TypeId>,
    structs_by_name: HashMap<String, TypeId>,
    enums_by_name: HashMap<String, EnumId>,
}

impl TypeCatalog {
    /// Number of struct and class descriptors
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Returns the descriptor for a handle minted by this catalog's builder
    pub fn get(&self, id: TypeId) -> &TypeDescriptor {
        &self.types[id.0 as usize]
    }

    /// Returns the descriptor for a handle, if it belongs to this catalog
    pub fn try_get(&self, id: TypeId) -> Option<&TypeDescriptor> {
        self.types.get(id.0 as usize)
    }

    pub fn enum_descriptor(&self, id: EnumId) -> Option<&EnumDescriptor> {
        self.enums.get(id.0 as usize)
    }

    /// Iterates over all struct and class descriptors
    pub fn iter(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.iter()
    }

    pub fn find_class(&self, name: &str) -> Option<&TypeDescriptor> {
        self.classes_by_name.get(name).map(|id| self.get(*id))
    }

    pub fn find_struct(&self, name: &str) -> Option<&TypeDescriptor> {
        self.structs_by_name.get(name).map(|id| self.get(*id))
    }

    /// Looks a name up, preferring a class over a struct of the same name
    pub fn find_struct_or_class(&self, name: &str) -> Option<&TypeDescriptor> {
        self.find_class(name).or_else(|| self.find_struct(name))
    }

    pub fn find_enum(&self, name: &str) -> Option<&EnumDescriptor> {
        self.enums_by_name
            .get(name)
            .and_then(|id| self.enum_descriptor(*id))
    }

    /// Resolves a declared struct/class name; `None` when absent
    pub fn is_valid_struct_name(&self, name: &str) -> Option<TypeId> {
        self.find_struct_or_class(name).map(|d| d.id)
    }

    /// Resolves a declared enum name; `None` when absent
    pub fn is_valid_enum_name(&self, name: &str) -> Option<EnumId> {
        self.find_enum(name).map(|e| e.id)
    }

    /// Like [`is_valid_struct_name`](Self::is_valid_struct_name) but as a
    /// typed error for callers that propagate
    pub fn lookup_struct(&self, name: &str) -> MemoryResult<TypeId> {
        self.is_valid_struct_name(name)
            .ok_or_else(|| MemoryError::CatalogLookupFailure(name.to_string()))
    }

    /// Byte size a field of this type occupies inside its owner
    pub fn field_size(&self, field_type: &FieldType) -> usize {
        match field_type {
            FieldType::Primitive(kind) => kind.width(),
            FieldType::InlineStruct(id) => self.try_get(*id).map_or(0, |d| d.size as usize),
            FieldType::ObjectPointer(_) => POINTER_SIZE,
            FieldType::DynamicArray(_) => ARRAY_HEADER_SIZE,
            FieldType::Enum { width, .. } => *width as usize,
            FieldType::Opaque { size } => *size as usize,
        }
    }

    /// Display name of a field type, e.g. `UObject*` or `TArray<FVector>`
    pub fn type_label(&self, field_type: &FieldType) -> String {
        match field_type {
            FieldType::Primitive(kind) => format!("{:?}", kind).to_lowercase(),
            FieldType::InlineStruct(id) => self
                .try_get(*id)
                .map_or_else(|| format!("#{}", id.0), |d| d.name.clone()),
            FieldType::ObjectPointer(id) => format!(
                "{}*",
                self.try_get(*id)
                    .map_or_else(|| format!("#{}", id.0), |d| d.name.clone())
            ),
            FieldType::DynamicArray(element) => format!("TArray<{}>", self.type_label(element)),
            FieldType::Enum { id, .. } => self
                .enum_descriptor(*id)
                .map_or_else(|| format!("enum#{}", id.0), |e| e.name.clone()),
            FieldType::Opaque { size } => format!("bytes[{}]", size),
        }
    }

    /// The parent chain of `id`, nearest first. Stops after visiting every
    /// type once, so a malformed cyclic chain still terminates.
    pub fn ancestors(&self, id: TypeId) -> Vec<TypeId> {
        let mut chain = Vec::new();
        let mut current = self.try_get(id).and_then(|d| d.parent);
        while let Some(parent) = current {
            if chain.len() >= self.types.len() || parent == id || chain.contains(&parent) {
                break;
            }
            chain.push(parent);
            current = self.try_get(parent).and_then(|d| d.parent);
        }
        chain
    }

    /// Whether `candidate` is `ancestor` or inherits from it
    pub fn is_same_or_descendant(&self, candidate: TypeId, ancestor: TypeId) -> bool {
        candidate == ancestor || self.ancestors(candidate).contains(&ancestor)
    }
}

//! Incremental construction of a [`TypeCatalog`]

use super::types::{EnumDescriptor, EnumId, Member, TypeDescriptor, TypeId};
use super::TypeCatalog;
use std::collections::HashMap;
use tracing::warn;

/// Builds a catalog. Types are declared first and filled in afterwards, so
/// members may reference types declared later (or the type itself).
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    types: Vec<TypeDescriptor>,
    enums: Vec<EnumDescriptor>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        CatalogBuilder::default()
    }

    fn declare(&mut self, name: &str, size: u32, is_class: bool) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(TypeDescriptor {
            id,
            name: name.to_string(),
            size,
            members: Vec::new(),
            parent: None,
            is_class,
        });
        id
    }

    /// Declares a plain struct
    pub fn declare_struct(&mut self, name: &str, size: u32) -> TypeId {
        self.declare(name, size, false)
    }

    /// Declares a class (participates in runtime type resolution)
    pub fn declare_class(&mut self, name: &str, size: u32) -> TypeId {
        self.declare(name, size, true)
    }

    /// Appends a member to a declared type
    pub fn add_member(&mut self, owner: TypeId, member: Member) -> &mut Self {
        if let Some(descriptor) = self.types.get_mut(owner.0 as usize) {
            descriptor.members.push(member);
        }
        self
    }

    /// Sets the single-inheritance parent of a declared type
    pub fn set_parent(&mut self, child: TypeId, parent: TypeId) -> &mut Self {
        if child == parent {
            warn!("Ignoring self-inheritance of type #{}", child.0);
            return self;
        }
        if let Some(descriptor) = self.types.get_mut(child.0 as usize) {
            descriptor.parent = Some(parent);
        }
        self
    }

    /// Adds an enum with its constants in declaration order
    pub fn add_enum(&mut self, name: &str, constants: Vec<(String, i64)>) -> EnumId {
        let id = EnumId(self.enums.len() as u32);
        self.enums.push(EnumDescriptor {
            id,
            name: name.to_string(),
            constants,
        });
        id
    }

    /// Finishes construction. The first declaration of a name wins.
    pub fn build(self) -> TypeCatalog {
        let mut classes_by_name = HashMap::new();
        let mut structs_by_name = HashMap::new();
        for descriptor in &self.types {
            let index = if descriptor.is_class {
                &mut classes_by_name
            } else {
                &mut structs_by_name
            };
            if index.contains_key(&descriptor.name) {
                warn!("Duplicate type name in catalog: {}", descriptor.name);
                continue;
            }
            index.insert(descriptor.name.clone(), descriptor.id);
        }

        let mut enums_by_name = HashMap::new();
        for descriptor in &self.enums {
            enums_by_name
                .entry(descriptor.name.clone())
                .or_insert(descriptor.id);
        }

        TypeCatalog {
            types: self.types,
            enums: self.enums,
            classes_by_name,
            structs_by_name,
            enums_by_name,
        }
    }
}

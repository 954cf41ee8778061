//! Loading a catalog from a JSON dump.
//!
//! The dump references types by name. Names that cannot be resolved are not
//! fatal: the member degrades to an opaque byte range of its declared size.

use super::builder::CatalogBuilder;
use super::types::{BitRange, EnumId, FieldType, Member, TypeId, POINTER_SIZE};
use super::TypeCatalog;
use crate::core::types::{MemoryResult, PrimitiveKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Top-level layout of a catalog dump
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub structs: Vec<StructDef>,
    #[serde(default)]
    pub enums: Vec<EnumDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructDef {
    pub name: String,
    pub size: u32,
    #[serde(default)]
    pub is_class: bool,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub members: Vec<MemberDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberDef {
    pub name: String,
    pub offset: u32,
    /// Declared size, used when the type reference cannot be resolved
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub bit: Option<BitRange>,
    #[serde(rename = "type")]
    pub ty: TypeRefDef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TypeRefDef {
    Primitive {
        primitive: String,
    },
    Struct {
        name: String,
    },
    Pointer {
        name: String,
    },
    Array {
        element: Box<TypeRefDef>,
    },
    Enum {
        name: String,
        #[serde(default = "default_enum_width")]
        width: u8,
    },
    Opaque,
}

fn default_enum_width() -> u8 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumDef {
    pub name: String,
    pub constants: Vec<(String, i64)>,
}

struct NameIndex {
    classes: HashMap<String, TypeId>,
    structs: HashMap<String, TypeId>,
    enums: HashMap<String, EnumId>,
}

impl NameIndex {
    fn type_named(&self, name: &str) -> Option<TypeId> {
        self.classes
            .get(name)
            .or_else(|| self.structs.get(name))
            .copied()
    }
}

impl TypeCatalog {
    /// Parses a JSON catalog dump
    pub fn from_json_str(json: &str) -> MemoryResult<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Ok(Self::from_file_model(&file))
    }

    /// Reads and parses a JSON catalog dump from disk
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> MemoryResult<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Builds a catalog from an already deserialized dump
    pub fn from_file_model(file: &CatalogFile) -> Self {
        let mut builder = CatalogBuilder::new();
        let mut index = NameIndex {
            classes: HashMap::new(),
            structs: HashMap::new(),
            enums: HashMap::new(),
        };

        for def in &file.enums {
            let id = builder.add_enum(&def.name, def.constants.clone());
            index.enums.entry(def.name.clone()).or_insert(id);
        }

        let ids: Vec<TypeId> = file
            .structs
            .iter()
            .map(|def| {
                let id = if def.is_class {
                    builder.declare_class(&def.name, def.size)
                } else {
                    builder.declare_struct(&def.name, def.size)
                };
                let names = if def.is_class {
                    &mut index.classes
                } else {
                    &mut index.structs
                };
                names.entry(def.name.clone()).or_insert(id);
                id
            })
            .collect();

        for (def, id) in file.structs.iter().zip(ids) {
            if let Some(parent_name) = &def.parent {
                match index.type_named(parent_name) {
                    Some(parent) => {
                        builder.set_parent(id, parent);
                    }
                    None => warn!(
                        "Parent {} of {} is not in the catalog; inheritance dropped",
                        parent_name, def.name
                    ),
                }
            }

            for member in &def.members {
                let field_type = resolve_type_ref(&member.ty, &index).unwrap_or_else(|| {
                    warn!(
                        "Unresolved type for {}::{}; treating {} bytes as opaque",
                        def.name, member.name, member.size
                    );
                    FieldType::Opaque {
                        size: fallback_size(&member.ty, member.size),
                    }
                });
                let mut resolved = Member::new(member.name.clone(), member.offset, field_type);
                if let Some(bit) = member.bit {
                    if bit.is_valid() {
                        resolved = resolved.with_bitfield(bit);
                    } else {
                        warn!(
                            "Invalid bit range {:?} on {}::{}; ignored",
                            bit, def.name, member.name
                        );
                    }
                }
                builder.add_member(id, resolved);
            }
        }

        let catalog = builder.build();
        debug!(
            "Loaded catalog with {} types and {} enums",
            catalog.len(),
            file.enums.len()
        );
        catalog
    }
}

fn resolve_type_ref(ty: &TypeRefDef, index: &NameIndex) -> Option<FieldType> {
    match ty {
        TypeRefDef::Primitive { primitive } => {
            PrimitiveKind::from_name(primitive).map(FieldType::Primitive)
        }
        TypeRefDef::Struct { name } => index.type_named(name).map(FieldType::InlineStruct),
        TypeRefDef::Pointer { name } => index.type_named(name).map(FieldType::ObjectPointer),
        TypeRefDef::Array { element } => resolve_type_ref(element, index)
            .map(|element| FieldType::DynamicArray(Box::new(element))),
        TypeRefDef::Enum { name, width } => index
            .enums
            .get(name)
            .map(|id| FieldType::Enum { id: *id, width: *width }),
        TypeRefDef::Opaque => None,
    }
}

fn fallback_size(ty: &TypeRefDef, declared: u32) -> u32 {
    if declared > 0 {
        return declared;
    }
    match ty {
        TypeRefDef::Pointer { .. } => POINTER_SIZE as u32,
        TypeRefDef::Enum { width, .. } => *width as u32,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const DUMP: &str = r#"{
        "enums": [
            { "name": "ENetRole", "constants": [["ROLE_None", 0], ["ROLE_Authority", 3]] }
        ],
        "structs": [
            { "name": "UObject", "size": 40, "is_class": true, "members": [
                { "name": "ClassPrivate", "offset": 16, "type": { "kind": "pointer", "name": "UObject" } }
            ]},
            { "name": "AActor", "size": 96, "is_class": true, "parent": "UObject", "members": [
                { "name": "bHidden", "offset": 40, "bit": { "offset": 2 }, "type": { "kind": "primitive", "primitive": "bool" } },
                { "name": "Role", "offset": 41, "type": { "kind": "enum", "name": "ENetRole" } },
                { "name": "Location", "offset": 44, "type": { "kind": "struct", "name": "FVector" } },
                { "name": "Children", "offset": 56, "type": { "kind": "array", "element": { "kind": "pointer", "name": "AActor" } } },
                { "name": "Delegate", "offset": 72, "size": 16, "type": { "kind": "struct", "name": "FMulticastDelegate" } }
            ]},
            { "name": "FVector", "size": 12, "members": [
                { "name": "X", "offset": 0, "type": { "kind": "primitive", "primitive": "float" } }
            ]}
        ]
    }"#;

    #[test]
    fn test_load_dump() {
        let catalog = TypeCatalog::from_json_str(DUMP).unwrap();
        assert_eq!(catalog.len(), 3);

        let actor = catalog.find_class("AActor").unwrap();
        let object = catalog.find_class("UObject").unwrap();
        assert_eq!(actor.parent, Some(object.id));

        let hidden = actor.member("bHidden").unwrap();
        assert_eq!(hidden.bitfield, Some(BitRange::single(2)));

        let vector = catalog.find_struct("FVector").unwrap();
        assert_eq!(
            actor.member("Location").unwrap().field_type,
            FieldType::InlineStruct(vector.id)
        );
        assert_eq!(
            actor.member("Children").unwrap().field_type,
            FieldType::DynamicArray(Box::new(FieldType::ObjectPointer(actor.id)))
        );
        assert!(matches!(
            actor.member("Role").unwrap().field_type,
            FieldType::Enum { width: 1, .. }
        ));
    }

    #[test]
    fn test_unresolved_reference_becomes_opaque() {
        let catalog = TypeCatalog::from_json_str(DUMP).unwrap();
        let actor = catalog.find_class("AActor").unwrap();
        assert_eq!(
            actor.member("Delegate").unwrap().field_type,
            FieldType::Opaque { size: 16 }
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DUMP.as_bytes()).unwrap();
        let catalog = TypeCatalog::from_json_file(file.path()).unwrap();
        assert!(catalog.find_enum("ENetRole").is_some());
    }

    #[test]
    fn test_malformed_json() {
        assert!(TypeCatalog::from_json_str("{ not json").is_err());
    }
}

//! Type descriptors making up the catalog
//!
//! Descriptors refer to each other through [`TypeId`] / [`EnumId`] handles
//! into the owning [`TypeCatalog`](super::TypeCatalog), so self-referential
//! and mutually recursive layouts need no shared ownership.

use crate::core::types::PrimitiveKind;
use serde::{Deserialize, Serialize};

/// Width of an object pointer in the target process
pub const POINTER_SIZE: usize = 8;

/// Size of a dynamic array header: data pointer, i32 count, i32 capacity
pub const ARRAY_HEADER_SIZE: usize = 16;

/// Handle to a struct or class descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    /// Get the raw index (for debugging/serialization)
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Handle to an enum descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnumId(pub(crate) u32);

impl EnumId {
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Bit position of a bitfield member, relative to the member's byte offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BitRange {
    pub offset: u8,
    #[serde(default = "default_bit_width")]
    pub width: u8,
}

fn default_bit_width() -> u8 {
    1
}

impl BitRange {
    /// A single-bit flag
    pub const fn single(bit: u8) -> Self {
        BitRange {
            offset: bit,
            width: 1,
        }
    }

    /// Whether the range fits in the 64-bit window bitfields are decoded from
    pub fn is_valid(&self) -> bool {
        self.width >= 1 && (self.offset as u32 + self.width as u32) <= 64
    }

    /// Number of bytes the range touches, starting at the member offset
    pub fn byte_span(&self) -> usize {
        (self.offset as usize + self.width as usize + 7) / 8
    }

    /// Mask of the range's bits, unshifted
    pub fn value_mask(&self) -> u64 {
        if self.width >= 64 {
            u64::MAX
        } else {
            (1u64 << self.width) - 1
        }
    }
}

/// How the bytes of a member are interpreted
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Primitive(PrimitiveKind),
    /// A struct stored inline in the owner's bytes
    InlineStruct(TypeId),
    /// A pointer to a separately allocated object
    ObjectPointer(TypeId),
    /// A `{ data, count, capacity }` header describing a heap array
    DynamicArray(Box<FieldType>),
    Enum { id: EnumId, width: u8 },
    /// Bytes whose layout is unknown; shown raw, never descended into
    Opaque { size: u32 },
}

/// A named member at a fixed offset inside its owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    pub offset: u32,
    pub bitfield: Option<BitRange>,
    pub field_type: FieldType,
}

impl Member {
    pub fn new(name: impl Into<String>, offset: u32, field_type: FieldType) -> Self {
        Member {
            name: name.into(),
            offset,
            bitfield: None,
            field_type,
        }
    }

    /// A one-bit boolean flag at `offset`, bit `bit`
    pub fn flag(name: impl Into<String>, offset: u32, bit: u8) -> Self {
        Member {
            name: name.into(),
            offset,
            bitfield: Some(BitRange::single(bit)),
            field_type: FieldType::Primitive(PrimitiveKind::Bool),
        }
    }

    /// Turns the member into a bitfield occupying `range`
    pub fn with_bitfield(mut self, range: BitRange) -> Self {
        self.bitfield = Some(range);
        self
    }

    pub fn is_bitfield(&self) -> bool {
        self.bitfield.is_some()
    }
}

/// A struct or class layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub id: TypeId,
    pub name: String,
    pub size: u32,
    /// Members in declaration order
    pub members: Vec<Member>,
    pub parent: Option<TypeId>,
    /// Classes carry runtime metadata and take part in real-type resolution
    pub is_class: bool,
}

impl TypeDescriptor {
    /// Finds a directly declared member by name
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// An enumeration with its named constants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDescriptor {
    pub id: EnumId,
    pub name: String,
    pub constants: Vec<(String, i64)>,
}

impl EnumDescriptor {
    /// Resolves a raw value read from a field `width` bytes wide
    pub fn name_of(&self, raw: u64, width: usize) -> Option<&str> {
        let mask = if width >= 8 {
            u64::MAX
        } else {
            (1u64 << (width * 8)) - 1
        };
        self.constants
            .iter()
            .find(|(_, value)| (*value as u64) & mask == raw & mask)
            .map(|(name, _)| name.as_str())
    }

    /// Value of a named constant
    pub fn value_of(&self, name: &str) -> Option<i64> {
        self.constants
            .iter()
            .find(|(constant, _)| constant == name)
            .map(|(_, value)| *value)
    }
}

//! Decoded value trees

use crate::catalog::{BitRange, FieldType, TypeId};
use crate::core::types::{Address, MemoryValue, OccurrenceKey, PrimitiveKind};
use crate::memory::BlockBounds;
use serde::Serialize;

/// Everything needed to write a field back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldLocation {
    /// Block the field was decoded from; writes must stay inside it
    pub block: BlockBounds,
    /// Byte offset of the field inside `block`
    pub offset: usize,
    pub bit: Option<BitRange>,
    /// Bytes touched by the field
    pub width: usize,
}

impl FieldLocation {
    pub fn address(&self) -> Address {
        self.block.base.offset(self.offset as u64)
    }
}

/// One decoded struct or class occurrence
#[derive(Debug, Clone, Serialize)]
pub struct StructNode {
    pub type_id: TypeId,
    pub type_name: String,
    /// Absolute address of the first byte of this occurrence
    pub address: Address,
    /// Offset of this occurrence inside the object that holds it
    pub inner_offset: u32,
    pub key: OccurrenceKey,
    /// Members inherited from the parent type, decoded at the same address
    pub parent: Option<Box<StructNode>>,
    pub fields: Vec<FieldNode>,
    /// Set when the depth guard stopped descent here
    pub truncated: bool,
}

impl StructNode {
    /// Own field by name
    pub fn field(&self, name: &str) -> Option<&FieldNode> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Field by name, searching inherited members after own members
    pub fn find_field(&self, name: &str) -> Option<&FieldNode> {
        self.field(name)
            .or_else(|| self.parent.as_deref().and_then(|p| p.find_field(name)))
    }

    /// Nested struct nodes reachable by following pointers and inline
    /// structs, counting this one
    pub fn depth(&self) -> usize {
        let own = self
            .fields
            .iter()
            .map(|f| f.value.child_depth())
            .max()
            .unwrap_or(0);
        let inherited = self.parent.as_deref().map_or(0, |p| p.depth() - 1);
        1 + own.max(inherited)
    }
}

/// A decoded member
#[derive(Debug, Clone, Serialize)]
pub struct FieldNode {
    pub name: String,
    pub field_type: FieldType,
    pub location: FieldLocation,
    pub key: OccurrenceKey,
    pub value: FieldValue,
}

impl FieldNode {
    /// Primitive kind a new value for this field is encoded as, or `None`
    /// when the field is not directly editable
    pub fn edit_kind(&self) -> Option<PrimitiveKind> {
        match (&self.field_type, self.location.bit) {
            (FieldType::Primitive(PrimitiveKind::Bool), Some(range)) if range.width == 1 => {
                Some(PrimitiveKind::Bool)
            }
            (FieldType::Primitive(_), Some(_)) => Some(PrimitiveKind::U64),
            (FieldType::Primitive(kind), None) => Some(*kind),
            (FieldType::Enum { width, .. }, _) => PrimitiveKind::unsigned_of_width(*width as usize),
            _ => None,
        }
    }

    pub fn is_readable(&self) -> bool {
        !matches!(self.value, FieldValue::Unreadable(_))
    }
}

/// Header and decoded elements of a dynamic array
#[derive(Debug, Clone, Serialize)]
pub struct ArrayValue {
    pub data: Address,
    pub count: i32,
    pub capacity: i32,
    /// Set when fewer elements were decoded than `count` claims
    pub clamped: bool,
    pub elements: Vec<FieldNode>,
    /// Why the element storage could not be read
    pub error: Option<String>,
}

/// Decoded content of a field
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Primitive(MemoryValue),
    /// Multi-bit bitfield
    Bits(u64),
    Enum {
        raw: u64,
        name: Option<String>,
    },
    Struct(Box<StructNode>),
    Pointer {
        target: Address,
        node: Box<StructNode>,
    },
    /// Null object pointer; not followed
    Unset,
    Array(ArrayValue),
    /// Hex dump of bytes with no usable type
    Opaque(String),
    Unreadable(String),
}

impl FieldValue {
    fn child_depth(&self) -> usize {
        match self {
            FieldValue::Struct(node) => node.depth(),
            FieldValue::Pointer { node, .. } => node.depth(),
            FieldValue::Array(array) => array
                .elements
                .iter()
                .map(|e| e.value.child_depth())
                .max()
                .unwrap_or(0),
            _ => 0,
        }
    }

    pub fn as_primitive(&self) -> Option<MemoryValue> {
        match self {
            FieldValue::Primitive(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructNode> {
        match self {
            FieldValue::Struct(node) => Some(&**node),
            FieldValue::Pointer { node, .. } => Some(&**node),
            _ => None,
        }
    }
}

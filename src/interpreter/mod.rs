//! Type-directed decoding of live memory
//!
//! [`FieldInterpreter`] reads an object's bytes once and walks its type
//! descriptor, producing a [`StructNode`] tree. Inline structs are decoded
//! from the enclosing block, pointers and arrays start new reads. Failures
//! are recorded on the failing leaf and never abort siblings.

mod edit;
mod tree;

pub use tree::{ArrayValue, FieldLocation, FieldNode, FieldValue, StructNode};

use crate::catalog::{BitRange, EnumId, FieldType, TypeCatalog, TypeId, ARRAY_HEADER_SIZE};
use crate::config::{InterpreterConfig, MAX_INTERPRETER_DEPTH};
use crate::core::types::{
    Address, MemoryError, MemoryResult, MemoryValue, OccurrenceKey, OccurrenceRoot, OffsetPath,
    PathStep, PrimitiveKind,
};
use crate::memory::{MemoryAccess, MemoryBlock};
use crate::resolver::RuntimeTypeResolver;
use tracing::{debug, trace, warn};

/// Recursive decoder over one memory access pass
pub struct FieldInterpreter<'a, 'm> {
    catalog: &'a TypeCatalog,
    memory: &'a mut MemoryAccess<'m>,
    resolver: &'a RuntimeTypeResolver,
    config: InterpreterConfig,
    root: Option<OccurrenceRoot>,
}

impl<'a, 'm> FieldInterpreter<'a, 'm> {
    pub fn new(
        catalog: &'a TypeCatalog,
        memory: &'a mut MemoryAccess<'m>,
        resolver: &'a RuntimeTypeResolver,
        config: &InterpreterConfig,
    ) -> Self {
        let mut config = config.clone();
        if config.max_depth > MAX_INTERPRETER_DEPTH {
            warn!(
                "Interpreter depth {} lowered to {}",
                config.max_depth, MAX_INTERPRETER_DEPTH
            );
            config.max_depth = MAX_INTERPRETER_DEPTH;
        }
        FieldInterpreter {
            catalog,
            memory,
            resolver,
            config,
            root: None,
        }
    }

    /// Identify occurrences by `root` instead of the interpreted address
    pub fn with_root(mut self, root: OccurrenceRoot) -> Self {
        self.root = Some(root);
        self
    }

    pub fn memory(&mut self) -> &mut MemoryAccess<'m> {
        self.memory
    }

    /// Decode `type_id` at `base`.
    ///
    /// Only a failure to read the object itself is an error; everything below
    /// it degrades to [`FieldValue::Unreadable`] leaves.
    pub fn interpret(
        &mut self,
        type_id: TypeId,
        base: Address,
        path: OffsetPath,
        depth: usize,
    ) -> MemoryResult<StructNode> {
        let root = self.root.unwrap_or(OccurrenceRoot::Address(base));
        self.interpret_object(root, type_id, base, path, depth)
    }

    fn interpret_object(
        &mut self,
        root: OccurrenceRoot,
        type_id: TypeId,
        base: Address,
        path: OffsetPath,
        depth: usize,
    ) -> MemoryResult<StructNode> {
        let catalog = self.catalog;
        let descriptor = catalog.try_get(type_id).ok_or_else(|| {
            MemoryError::CatalogLookupFailure(format!("type #{}", type_id.index()))
        })?;

        if depth >= self.config.max_depth {
            return Ok(self.truncated(root, type_id, base, path));
        }

        trace!("Interpreting {} at {} (depth {})", descriptor.name, base, depth);
        let block = if descriptor.size == 0 {
            MemoryBlock::from_vec(base, Vec::new())
        } else {
            self.memory.read(base, descriptor.size as usize)?
        };
        Ok(self.decode_struct(root, type_id, &block, 0, path, depth))
    }

    fn truncated(
        &self,
        root: OccurrenceRoot,
        type_id: TypeId,
        address: Address,
        path: OffsetPath,
    ) -> StructNode {
        let type_name = self.type_name(type_id);
        debug!("Depth limit reached at {} ({})", address, type_name);
        StructNode {
            type_id,
            key: OccurrenceKey::new(root, path.clone(), type_name.clone()),
            type_name,
            address,
            inner_offset: path.inner_offset(),
            parent: None,
            fields: Vec::new(),
            truncated: true,
        }
    }

    fn type_name(&self, type_id: TypeId) -> String {
        self.catalog
            .try_get(type_id)
            .map_or_else(|| format!("#{}", type_id.index()), |d| d.name.clone())
    }

    /// Decode a struct occupying `block` from byte `inner` onwards
    fn decode_struct(
        &mut self,
        root: OccurrenceRoot,
        type_id: TypeId,
        block: &MemoryBlock,
        inner: usize,
        path: OffsetPath,
        depth: usize,
    ) -> StructNode {
        let address = block.base().offset(inner as u64);
        if depth >= self.config.max_depth {
            return self.truncated(root, type_id, address, path);
        }

        let catalog = self.catalog;
        let Some(descriptor) = catalog.try_get(type_id) else {
            return self.truncated(root, type_id, address, path);
        };

        let parent = descriptor.parent.map(|parent| {
            Box::new(self.decode_struct(root, parent, block, inner, path.clone(), depth + 1))
        });

        let mut fields = Vec::with_capacity(descriptor.members.len());
        for member in &descriptor.members {
            fields.push(self.decode_member(
                root,
                member.name.clone(),
                &member.field_type,
                member.bitfield,
                block,
                inner + member.offset as usize,
                path.field(member.offset),
                depth,
            ));
        }

        StructNode {
            type_id,
            type_name: descriptor.name.clone(),
            address,
            inner_offset: path.inner_offset(),
            key: OccurrenceKey::new(root, path, descriptor.name.clone()),
            parent,
            fields,
            truncated: false,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn decode_member(
        &mut self,
        root: OccurrenceRoot,
        name: String,
        field_type: &FieldType,
        bitfield: Option<BitRange>,
        block: &MemoryBlock,
        at: usize,
        path: OffsetPath,
        depth: usize,
    ) -> FieldNode {
        let width = match (field_type, bitfield) {
            (FieldType::Primitive(_), Some(range)) => range.byte_span(),
            _ => self.catalog.field_size(field_type),
        };
        let location = FieldLocation {
            block: block.bounds(),
            offset: at,
            bit: bitfield,
            width,
        };
        let value = self.decode_value(root, field_type, bitfield, block, at, &path, depth);

        FieldNode {
            name,
            field_type: field_type.clone(),
            location,
            key: OccurrenceKey::new(root, path, self.catalog.type_label(field_type)),
            value,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn decode_value(
        &mut self,
        root: OccurrenceRoot,
        field_type: &FieldType,
        bitfield: Option<BitRange>,
        block: &MemoryBlock,
        at: usize,
        path: &OffsetPath,
        depth: usize,
    ) -> FieldValue {
        match field_type {
            FieldType::Primitive(kind) => match bitfield {
                Some(range) => decode_bits(*kind, range, block, at),
                None => block
                    .read_value(at, *kind)
                    .map(FieldValue::Primitive)
                    .unwrap_or_else(|| outside(block, at, kind.width())),
            },
            FieldType::InlineStruct(id) => FieldValue::Struct(Box::new(self.decode_struct(
                root,
                *id,
                block,
                at,
                path.clone(),
                depth + 1,
            ))),
            FieldType::ObjectPointer(id) => self.decode_pointer(root, *id, block, at, path, depth),
            FieldType::DynamicArray(element) => {
                self.decode_array(root, element, block, at, path, depth)
            }
            FieldType::Enum { id, width } => self.decode_enum(*id, *width as usize, block, at),
            FieldType::Opaque { size } => block
                .bytes(at, *size as usize)
                .map(|bytes| FieldValue::Opaque(hex::encode(bytes)))
                .unwrap_or_else(|| outside(block, at, *size as usize)),
        }
    }

    fn decode_pointer(
        &mut self,
        root: OccurrenceRoot,
        declared: TypeId,
        block: &MemoryBlock,
        at: usize,
        path: &OffsetPath,
        depth: usize,
    ) -> FieldValue {
        let Some(raw) = block.read_u64(at) else {
            return outside(block, at, 8);
        };
        let target = Address::new(raw);
        if target.is_null() {
            return FieldValue::Unset;
        }

        let path = path.child(PathStep::Deref);
        if depth + 1 >= self.config.max_depth {
            let node = self.truncated(root, declared, target, path);
            return FieldValue::Pointer {
                target,
                node: Box::new(node),
            };
        }

        let real = self.resolver.resolve_real_type(
            self.memory,
            self.catalog,
            target,
            declared,
            self.config.guess_real_class,
        );
        match self.interpret_object(root, real, target, path, depth + 1) {
            Ok(node) => FieldValue::Pointer {
                target,
                node: Box::new(node),
            },
            Err(err) => FieldValue::Unreadable(format!("{}: {}", target, err)),
        }
    }

    fn decode_array(
        &mut self,
        root: OccurrenceRoot,
        element: &FieldType,
        block: &MemoryBlock,
        at: usize,
        path: &OffsetPath,
        depth: usize,
    ) -> FieldValue {
        let header = (
            block.read_u64(at),
            block.read_i32(at + 8),
            block.read_i32(at + 12),
        );
        let (Some(data), Some(count), Some(capacity)) = header else {
            return outside(block, at, ARRAY_HEADER_SIZE);
        };

        let data = Address::new(data);
        let element_size = self.catalog.field_size(element);
        let (shown, clamped) = self.clamp_count(count, capacity, element_size);
        let mut array = ArrayValue {
            data,
            count,
            capacity,
            clamped,
            elements: Vec::new(),
            error: None,
        };
        if shown == 0 || element_size == 0 {
            return FieldValue::Array(array);
        }
        if data.is_null() {
            array.error = Some("non-empty array has no storage".to_string());
            return FieldValue::Array(array);
        }

        let storage = match self.memory.read(data, shown * element_size) {
            Ok(storage) => storage,
            Err(err) => {
                array.error = Some(err.to_string());
                return FieldValue::Array(array);
            }
        };

        for index in 0..shown {
            let Some(slot) = storage.sub_block(index * element_size, element_size) else {
                break;
            };
            let node = self.decode_member(
                root,
                format!("[{}]", index),
                element,
                None,
                &slot,
                0,
                path.child(PathStep::Index(index as u32)),
                depth + 1,
            );
            array.elements.push(node);
        }
        FieldValue::Array(array)
    }

    /// Elements worth decoding out of a header that may be garbage
    fn clamp_count(&self, count: i32, capacity: i32, element_size: usize) -> (usize, bool) {
        if count < 0 {
            warn!("Array count {} is negative, treating as empty", count);
            return (0, true);
        }

        let mut shown = count as usize;
        let mut clamped = false;
        if capacity >= 0 && count > capacity {
            warn!("Array count {} exceeds capacity {}", count, capacity);
            shown = capacity as usize;
            clamped = true;
        }
        if shown > self.config.max_array_elements {
            debug!(
                "Clamping array of {} elements to {}",
                shown, self.config.max_array_elements
            );
            shown = self.config.max_array_elements;
            clamped = true;
        }
        if element_size > 0 {
            let fits = self.memory.max_read_size() / element_size;
            if shown > fits {
                shown = fits;
                clamped = true;
            }
        }
        (shown, clamped)
    }

    fn decode_enum(&self, id: EnumId, width: usize, block: &MemoryBlock, at: usize) -> FieldValue {
        if width == 0 || width > 8 {
            return FieldValue::Unreadable(format!("unsupported enum width {}", width));
        }
        let Some(raw) = block.read_uint(at, width) else {
            return outside(block, at, width);
        };
        let name = self
            .catalog
            .enum_descriptor(id)
            .and_then(|descriptor| descriptor.name_of(raw, width))
            .map(str::to_string);
        if name.is_none() {
            trace!("No constant of enum #{} has value {}", id.index(), raw);
        }
        FieldValue::Enum { raw, name }
    }
}

fn decode_bits(kind: PrimitiveKind, range: BitRange, block: &MemoryBlock, at: usize) -> FieldValue {
    if !range.is_valid() {
        return FieldValue::Unreadable(format!("invalid bit range {:?}", range));
    }
    let Some(raw) = block.read_uint(at, range.byte_span()) else {
        return outside(block, at, range.byte_span());
    };
    let bits = (raw >> range.offset) & range.value_mask();
    if kind == PrimitiveKind::Bool && range.width == 1 {
        FieldValue::Primitive(MemoryValue::Bool(bits != 0))
    } else {
        FieldValue::Bits(bits)
    }
}

fn outside(block: &MemoryBlock, at: usize, len: usize) -> FieldValue {
    FieldValue::Unreadable(format!(
        "{} bytes at +0x{:X} lie outside the {} byte block at {}",
        len,
        at,
        block.len(),
        block.base()
    ))
}

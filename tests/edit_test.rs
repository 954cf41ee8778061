//! Integration tests for writing edited values back through decoded fields

use live_inspector::catalog::{BitRange, CatalogBuilder, FieldType, Member, TypeCatalog, TypeId};
use live_inspector::config::{Config, InterpreterConfig};
use live_inspector::interpreter::{FieldInterpreter, FieldValue, StructNode};
use live_inspector::memory::{MemoryAccess, SnapshotMemory};
use live_inspector::resolver::RuntimeTypeResolver;
use live_inspector::{Address, Inspector, MemoryError, MemoryValue, OffsetPath, PrimitiveKind};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::sync::Arc;

const BASE: u64 = 0x2_0000;

fn decode(catalog: &TypeCatalog, memory: &SnapshotMemory, type_id: TypeId) -> StructNode {
    let mut access = MemoryAccess::with_limits(memory, 4096, 16);
    let resolver = RuntimeTypeResolver::default();
    FieldInterpreter::new(catalog, &mut access, &resolver, &InterpreterConfig::default())
        .interpret(type_id, Address::new(BASE), OffsetPath::new(), 0)
        .unwrap()
}

fn flags_catalog() -> (TypeCatalog, TypeId) {
    let mut builder = CatalogBuilder::new();
    let flags = builder.declare_struct("FFlags", 1);
    for bit in 0..8u8 {
        builder.add_member(flags, Member::flag(format!("Flag{}", bit), 0, bit));
    }
    (builder.build(), flags)
}

#[test]
fn test_clearing_a_flag_preserves_neighbours() {
    let mut builder = CatalogBuilder::new();
    let settings = builder.declare_struct("FSettings", 1);
    builder.add_member(settings, Member::flag("Enabled", 0, 0));
    builder.add_member(settings, Member::flag("Visible", 0, 2));
    let catalog = builder.build();

    let memory = SnapshotMemory::new();
    memory.map(Address::new(BASE), vec![0b101]);

    let mut access = MemoryAccess::with_limits(&memory, 4096, 16);
    let resolver = RuntimeTypeResolver::default();
    let mut interpreter =
        FieldInterpreter::new(&catalog, &mut access, &resolver, &InterpreterConfig::default());
    let node = interpreter
        .interpret(settings, Address::new(BASE), OffsetPath::new(), 0)
        .unwrap();

    let enabled = node.field("Enabled").unwrap().clone();
    assert_eq!(enabled.value.as_primitive(), Some(MemoryValue::Bool(true)));
    assert_eq!(enabled.edit_kind(), Some(PrimitiveKind::Bool));

    interpreter
        .commit_field(&enabled, &MemoryValue::Bool(false))
        .unwrap();
    assert_eq!(memory.peek(Address::new(BASE), 1).unwrap(), vec![0b100]);

    let node = interpreter
        .interpret(settings, Address::new(BASE), OffsetPath::new(), 0)
        .unwrap();
    assert_eq!(
        node.field("Enabled").unwrap().value.as_primitive(),
        Some(MemoryValue::Bool(false))
    );
    assert_eq!(
        node.field("Visible").unwrap().value.as_primitive(),
        Some(MemoryValue::Bool(true))
    );
}

#[test]
fn test_every_other_flag_cleared() {
    let (catalog, flags) = flags_catalog();
    let memory = SnapshotMemory::new();
    memory.map(Address::new(BASE), vec![0xFF]);

    let node = decode(&catalog, &memory, flags);
    let mut access = MemoryAccess::with_limits(&memory, 4096, 16);
    let resolver = RuntimeTypeResolver::default();
    let mut interpreter =
        FieldInterpreter::new(&catalog, &mut access, &resolver, &InterpreterConfig::default());
    for field in node.fields.iter().step_by(2) {
        interpreter.commit_text(field, "false").unwrap();
    }

    assert_eq!(memory.peek(Address::new(BASE), 1).unwrap(), vec![0b1010_1010]);
    let node = decode(&catalog, &memory, flags);
    for (bit, field) in node.fields.iter().enumerate() {
        assert_eq!(
            field.value.as_primitive(),
            Some(MemoryValue::Bool(bit % 2 == 1)),
            "{}",
            field.name
        );
    }
}

#[test]
fn test_primitive_edit_is_read_back() {
    let mut builder = CatalogBuilder::new();
    let stats = builder.declare_struct("FStats", 16);
    builder.add_member(
        stats,
        Member::new("Health", 0, FieldType::Primitive(PrimitiveKind::F32)),
    );
    builder.add_member(
        stats,
        Member::new("Gold", 8, FieldType::Primitive(PrimitiveKind::I64)),
    );
    let catalog = builder.build();

    let memory = SnapshotMemory::new();
    memory.map(Address::new(BASE), vec![0; 16]);
    let node = decode(&catalog, &memory, stats);

    let mut access = MemoryAccess::with_limits(&memory, 4096, 16);
    let resolver = RuntimeTypeResolver::default();
    let mut interpreter =
        FieldInterpreter::new(&catalog, &mut access, &resolver, &InterpreterConfig::default());
    interpreter
        .commit_text(node.field("Health").unwrap(), "87.5")
        .unwrap();
    interpreter
        .commit_edit(
            &node.field("Gold").unwrap().location,
            PrimitiveKind::I64,
            &MemoryValue::I32(-250),
        )
        .unwrap();

    let node = decode(&catalog, &memory, stats);
    assert_eq!(
        node.field("Health").unwrap().value.as_primitive(),
        Some(MemoryValue::F32(87.5))
    );
    assert_eq!(
        node.field("Gold").unwrap().value.as_primitive(),
        Some(MemoryValue::I64(-250))
    );
}

#[test]
fn test_mismatched_width_is_rejected() {
    let mut builder = CatalogBuilder::new();
    let small = builder.declare_struct("FSmall", 4);
    builder.add_member(
        small,
        Member::new("Value", 0, FieldType::Primitive(PrimitiveKind::U32)),
    );
    let catalog = builder.build();

    let memory = SnapshotMemory::new();
    memory.map(Address::new(BASE), vec![1, 2, 3, 4]);
    let node = decode(&catalog, &memory, small);

    let mut access = MemoryAccess::with_limits(&memory, 4096, 16);
    let resolver = RuntimeTypeResolver::default();
    let mut interpreter =
        FieldInterpreter::new(&catalog, &mut access, &resolver, &InterpreterConfig::default());
    let result = interpreter.commit_edit(
        &node.field("Value").unwrap().location,
        PrimitiveKind::U64,
        &MemoryValue::U64(1),
    );
    assert!(matches!(result, Err(MemoryError::EncodeError(_))));
    assert_eq!(memory.write_count(), 0);
    assert_eq!(memory.peek(Address::new(BASE), 4).unwrap(), vec![1, 2, 3, 4]);
}

#[test]
fn test_edit_through_inspector_session() {
    let mut builder = CatalogBuilder::new();
    let stats = builder.declare_struct("FStats", 4);
    builder.add_member(
        stats,
        Member::new("Level", 0, FieldType::Primitive(PrimitiveKind::U16)),
    );
    builder.add_member(
        stats,
        Member::new("Mode", 2, FieldType::Primitive(PrimitiveKind::U8)).with_bitfield(BitRange {
            offset: 4,
            width: 4,
        }),
    );
    let catalog = Arc::new(builder.build());

    let memory = Arc::new(SnapshotMemory::new());
    memory.map(Address::new(BASE), vec![3, 0, 0x0F, 0xCC]);
    let mut inspector = Inspector::new(Box::new(Arc::clone(&memory)), catalog, Config::default());
    let session = inspector.open_session("FStats", Address::new(BASE)).unwrap();

    let mut pass = inspector.begin_pass();
    let node = pass.interpret(&session).unwrap();
    assert!(matches!(node.field("Mode").unwrap().value, FieldValue::Bits(0)));

    pass.commit_text(node.field("Level").unwrap(), "0x1234").unwrap();
    pass.commit_text(node.field("Mode").unwrap(), "9").unwrap();
    assert_eq!(
        memory.peek(Address::new(BASE), 4).unwrap(),
        vec![0x34, 0x12, 0x9F, 0xCC]
    );

    let node = pass.interpret(&session).unwrap();
    assert!(matches!(node.field("Mode").unwrap().value, FieldValue::Bits(9)));
}

fn primitive_kind() -> impl Strategy<Value = PrimitiveKind> {
    prop_oneof![
        Just(PrimitiveKind::Bool),
        Just(PrimitiveKind::I8),
        Just(PrimitiveKind::I16),
        Just(PrimitiveKind::I32),
        Just(PrimitiveKind::I64),
        Just(PrimitiveKind::U8),
        Just(PrimitiveKind::U16),
        Just(PrimitiveKind::U32),
        Just(PrimitiveKind::U64),
        Just(PrimitiveKind::F32),
        Just(PrimitiveKind::F64),
    ]
}

proptest! {
    #[test]
    fn prop_bitfield_write_touches_only_its_bits(
        initial in any::<u32>(),
        offset in 0u8..24,
        width in 1u8..=8,
        seed in any::<u64>(),
    ) {
        let range = BitRange { offset, width };
        let value = seed & range.value_mask();

        let mut builder = CatalogBuilder::new();
        let packed = builder.declare_struct("FPacked", 4);
        builder.add_member(
            packed,
            Member::new("Bits", 0, FieldType::Primitive(PrimitiveKind::U32)).with_bitfield(range),
        );
        let catalog = builder.build();

        let memory = SnapshotMemory::new();
        memory.map(Address::new(BASE), initial.to_le_bytes().to_vec());
        let node = decode(&catalog, &memory, packed);

        let mut access = MemoryAccess::with_limits(&memory, 4096, 16);
        let resolver = RuntimeTypeResolver::default();
        let mut interpreter =
            FieldInterpreter::new(&catalog, &mut access, &resolver, &InterpreterConfig::default());
        interpreter
            .commit_field(node.field("Bits").unwrap(), &MemoryValue::U64(value))
            .unwrap();

        let bytes = memory.peek(Address::new(BASE), 4).unwrap();
        let after = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let mask = (range.value_mask() as u32) << offset;
        prop_assert_eq!(after & !mask, initial & !mask);
        prop_assert_eq!(((after & mask) >> offset) as u64, value);

        let node = decode(&catalog, &memory, packed);
        let decoded = match node.field("Bits").unwrap().value {
            FieldValue::Bits(bits) => Some(bits),
            FieldValue::Primitive(MemoryValue::Bool(flag)) => Some(flag as u64),
            _ => None,
        };
        prop_assert_eq!(decoded, Some(value));
    }

    #[test]
    fn prop_primitive_write_leaves_neighbours(
        initial in proptest::collection::vec(any::<u8>(), 16),
        value in any::<u16>(),
    ) {
        let mut builder = CatalogBuilder::new();
        let record = builder.declare_struct("FRecord", 16);
        builder.add_member(
            record,
            Member::new("Word", 6, FieldType::Primitive(PrimitiveKind::U16)),
        );
        let catalog = builder.build();

        let memory = SnapshotMemory::new();
        memory.map(Address::new(BASE), initial.clone());
        let node = decode(&catalog, &memory, record);

        let mut access = MemoryAccess::with_limits(&memory, 4096, 16);
        let resolver = RuntimeTypeResolver::default();
        let mut interpreter =
            FieldInterpreter::new(&catalog, &mut access, &resolver, &InterpreterConfig::default());
        interpreter
            .commit_field(node.field("Word").unwrap(), &MemoryValue::U16(value))
            .unwrap();

        let bytes = memory.peek(Address::new(BASE), 16).unwrap();
        prop_assert_eq!(&bytes[..6], &initial[..6]);
        prop_assert_eq!(&bytes[8..], &initial[8..]);
        prop_assert_eq!(u16::from_le_bytes([bytes[6], bytes[7]]), value);
    }

    #[test]
    fn prop_every_primitive_reads_back_what_was_written(
        kind in primitive_kind(),
        initial in proptest::collection::vec(any::<u8>(), 16),
    ) {
        let mut builder = CatalogBuilder::new();
        let record = builder.declare_struct("FRecord", 16);
        builder.add_member(record, Member::new("Value", 4, FieldType::Primitive(kind)));
        let catalog = builder.build();

        let memory = SnapshotMemory::new();
        memory.map(Address::new(BASE), initial.clone());
        let node = decode(&catalog, &memory, record);
        let before = node.field("Value").unwrap().value.as_primitive().unwrap();

        let mut access = MemoryAccess::with_limits(&memory, 4096, 16);
        let resolver = RuntimeTypeResolver::default();
        let mut interpreter =
            FieldInterpreter::new(&catalog, &mut access, &resolver, &InterpreterConfig::default());
        interpreter
            .commit_field(node.field("Value").unwrap(), &before)
            .unwrap();

        // Byte-level comparison keeps NaN payloads honest
        let node = decode(&catalog, &memory, record);
        let after = node.field("Value").unwrap().value.as_primitive().unwrap();
        prop_assert_eq!(after.kind(), kind);
        prop_assert_eq!(after.to_bytes(), before.to_bytes());

        // Booleans normalise to 0/1; every other kind rewrites its own bytes
        if kind != PrimitiveKind::Bool {
            let bytes = memory.peek(Address::new(BASE), 16).unwrap();
            prop_assert_eq!(&bytes[..], &initial[..]);
        }
    }
}

//! Writing edited values back to live memory

use super::tree::{FieldLocation, FieldNode};
use super::FieldInterpreter;
use crate::catalog::FieldType;
use crate::core::types::{MemoryError, MemoryResult, MemoryValue, PrimitiveKind};
use tracing::debug;

impl<'a, 'm> FieldInterpreter<'a, 'm> {
    /// Encode `value` as `kind` and write it to `location`.
    ///
    /// Bitfields are merged into the current bytes so sibling bits survive.
    pub fn commit_edit(
        &mut self,
        location: &FieldLocation,
        kind: PrimitiveKind,
        value: &MemoryValue,
    ) -> MemoryResult<()> {
        debug!("Committing {} to {}", value, location.address());

        if let Some(range) = location.bit {
            let raw = value.as_integer().ok_or_else(|| {
                MemoryError::encode(format!("{} cannot be stored in a bitfield", value))
            })?;
            if raw < 0 || raw > range.value_mask() as i128 {
                return Err(MemoryError::encode(format!(
                    "{} does not fit a {} bit field",
                    raw, range.width
                )));
            }
            return self
                .memory
                .write_bits(&location.block, location.offset, range, raw as u64);
        }

        let bytes = value.encode_as(kind)?;
        if bytes.len() != location.width {
            return Err(MemoryError::encode(format!(
                "{:?} is {} bytes but the field is {}",
                kind,
                bytes.len(),
                location.width
            )));
        }
        self.memory.write(&location.block, location.offset, &bytes)
    }

    /// Write `value` into a decoded field
    pub fn commit_field(&mut self, field: &FieldNode, value: &MemoryValue) -> MemoryResult<()> {
        let kind = field
            .edit_kind()
            .ok_or_else(|| MemoryError::encode(format!("{} is not editable", field.name)))?;
        self.commit_edit(&field.location, kind, value)
    }

    /// Parse user text for a decoded field and write it.
    ///
    /// Enum fields also accept constant names.
    pub fn commit_text(&mut self, field: &FieldNode, text: &str) -> MemoryResult<()> {
        let kind = field
            .edit_kind()
            .ok_or_else(|| MemoryError::encode(format!("{} is not editable", field.name)))?;

        let value = match &field.field_type {
            FieldType::Enum { id, .. } => {
                let constant = self
                    .catalog
                    .enum_descriptor(*id)
                    .and_then(|descriptor| descriptor.value_of(text.trim()));
                match constant {
                    Some(value) => signed_into(kind, value)?,
                    None => MemoryValue::parse(kind, text)?,
                }
            }
            _ => MemoryValue::parse(kind, text)?,
        };
        self.commit_edit(&field.location, kind, &value)
    }
}

/// Enum constants are stored as signed values but written as raw unsigned
/// bits of the underlying width
fn signed_into(kind: PrimitiveKind, value: i64) -> MemoryResult<MemoryValue> {
    let bits = kind.width() * 8;
    let raw = if bits >= 64 {
        value as u64
    } else {
        (value as u64) & ((1u64 << bits) - 1)
    };
    MemoryValue::from_integer(kind, raw as i128)
}

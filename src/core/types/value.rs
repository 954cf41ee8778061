//! Primitive memory values and their little-endian codec

use super::error::{MemoryError, MemoryResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A decoded primitive value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum MemoryValue {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
}

/// Enum representing the kind of a primitive field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl PrimitiveKind {
    /// Returns the size in bytes for this kind
    pub const fn width(&self) -> usize {
        match self {
            PrimitiveKind::Bool | PrimitiveKind::I8 | PrimitiveKind::U8 => 1,
            PrimitiveKind::I16 | PrimitiveKind::U16 => 2,
            PrimitiveKind::I32 | PrimitiveKind::U32 | PrimitiveKind::F32 => 4,
            PrimitiveKind::I64 | PrimitiveKind::U64 | PrimitiveKind::F64 => 8,
        }
    }

    /// Unsigned integer kind of the given byte width, if one exists
    pub const fn unsigned_of_width(width: usize) -> Option<Self> {
        match width {
            1 => Some(PrimitiveKind::U8),
            2 => Some(PrimitiveKind::U16),
            4 => Some(PrimitiveKind::U32),
            8 => Some(PrimitiveKind::U64),
            _ => None,
        }
    }

    /// Inclusive value range for integer kinds
    fn integer_bounds(&self) -> Option<(i128, i128)> {
        match self {
            PrimitiveKind::Bool => Some((0, 1)),
            PrimitiveKind::I8 => Some((i8::MIN as i128, i8::MAX as i128)),
            PrimitiveKind::I16 => Some((i16::MIN as i128, i16::MAX as i128)),
            PrimitiveKind::I32 => Some((i32::MIN as i128, i32::MAX as i128)),
            PrimitiveKind::I64 => Some((i64::MIN as i128, i64::MAX as i128)),
            PrimitiveKind::U8 => Some((0, u8::MAX as i128)),
            PrimitiveKind::U16 => Some((0, u16::MAX as i128)),
            PrimitiveKind::U32 => Some((0, u32::MAX as i128)),
            PrimitiveKind::U64 => Some((0, u64::MAX as i128)),
            PrimitiveKind::F32 | PrimitiveKind::F64 => None,
        }
    }

    /// Parses a kind name such as `u32`, `float` or `bool`
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name.to_ascii_lowercase().as_str() {
            "bool" => PrimitiveKind::Bool,
            "i8" | "int8" => PrimitiveKind::I8,
            "i16" | "int16" => PrimitiveKind::I16,
            "i32" | "int32" | "int" => PrimitiveKind::I32,
            "i64" | "int64" => PrimitiveKind::I64,
            "u8" | "uint8" | "byte" => PrimitiveKind::U8,
            "u16" | "uint16" => PrimitiveKind::U16,
            "u32" | "uint32" => PrimitiveKind::U32,
            "u64" | "uint64" => PrimitiveKind::U64,
            "f32" | "float" => PrimitiveKind::F32,
            "f64" | "double" => PrimitiveKind::F64,
            _ => return None,
        };
        Some(kind)
    }
}

impl MemoryValue {
    /// Returns the size in bytes of the value
    pub fn size(&self) -> usize {
        self.kind().width()
    }

    /// Gets the primitive kind for this value
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            MemoryValue::Bool(_) => PrimitiveKind::Bool,
            MemoryValue::I8(_) => PrimitiveKind::I8,
            MemoryValue::I16(_) => PrimitiveKind::I16,
            MemoryValue::I32(_) => PrimitiveKind::I32,
            MemoryValue::I64(_) => PrimitiveKind::I64,
            MemoryValue::U8(_) => PrimitiveKind::U8,
            MemoryValue::U16(_) => PrimitiveKind::U16,
            MemoryValue::U32(_) => PrimitiveKind::U32,
            MemoryValue::U64(_) => PrimitiveKind::U64,
            MemoryValue::F32(_) => PrimitiveKind::F32,
            MemoryValue::F64(_) => PrimitiveKind::F64,
        }
    }

    /// Converts the value to its little-endian bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            MemoryValue::Bool(v) => vec![*v as u8],
            MemoryValue::I8(v) => v.to_le_bytes().to_vec(),
            MemoryValue::I16(v) => v.to_le_bytes().to_vec(),
            MemoryValue::I32(v) => v.to_le_bytes().to_vec(),
            MemoryValue::I64(v) => v.to_le_bytes().to_vec(),
            MemoryValue::U8(v) => v.to_le_bytes().to_vec(),
            MemoryValue::U16(v) => v.to_le_bytes().to_vec(),
            MemoryValue::U32(v) => v.to_le_bytes().to_vec(),
            MemoryValue::U64(v) => v.to_le_bytes().to_vec(),
            MemoryValue::F32(v) => v.to_le_bytes().to_vec(),
            MemoryValue::F64(v) => v.to_le_bytes().to_vec(),
        }
    }

    /// Decodes a value of `kind` from the start of `bytes`
    pub fn from_bytes(bytes: &[u8], kind: PrimitiveKind) -> Option<Self> {
        let raw = bytes.get(..kind.width())?;
        let value = match kind {
            PrimitiveKind::Bool => MemoryValue::Bool(raw[0] != 0),
            PrimitiveKind::I8 => MemoryValue::I8(raw[0] as i8),
            PrimitiveKind::U8 => MemoryValue::U8(raw[0]),
            PrimitiveKind::I16 => MemoryValue::I16(i16::from_le_bytes(raw.try_into().ok()?)),
            PrimitiveKind::U16 => MemoryValue::U16(u16::from_le_bytes(raw.try_into().ok()?)),
            PrimitiveKind::I32 => MemoryValue::I32(i32::from_le_bytes(raw.try_into().ok()?)),
            PrimitiveKind::U32 => MemoryValue::U32(u32::from_le_bytes(raw.try_into().ok()?)),
            PrimitiveKind::F32 => MemoryValue::F32(f32::from_le_bytes(raw.try_into().ok()?)),
            PrimitiveKind::I64 => MemoryValue::I64(i64::from_le_bytes(raw.try_into().ok()?)),
            PrimitiveKind::U64 => MemoryValue::U64(u64::from_le_bytes(raw.try_into().ok()?)),
            PrimitiveKind::F64 => MemoryValue::F64(f64::from_le_bytes(raw.try_into().ok()?)),
        };
        Some(value)
    }

    /// Integer view of the value; floats only when they are integral
    pub fn as_integer(&self) -> Option<i128> {
        match *self {
            MemoryValue::Bool(v) => Some(v as i128),
            MemoryValue::I8(v) => Some(v as i128),
            MemoryValue::I16(v) => Some(v as i128),
            MemoryValue::I32(v) => Some(v as i128),
            MemoryValue::I64(v) => Some(v as i128),
            MemoryValue::U8(v) => Some(v as i128),
            MemoryValue::U16(v) => Some(v as i128),
            MemoryValue::U32(v) => Some(v as i128),
            MemoryValue::U64(v) => Some(v as i128),
            MemoryValue::F32(v) => integral_float(v as f64),
            MemoryValue::F64(v) => integral_float(v),
        }
    }

    fn as_float(&self) -> f64 {
        match *self {
            MemoryValue::F32(v) => v as f64,
            MemoryValue::F64(v) => v,
            other => other.as_integer().unwrap_or_default() as f64,
        }
    }

    /// Builds an integer-kinded value, rejecting values outside the kind's range
    pub fn from_integer(kind: PrimitiveKind, value: i128) -> MemoryResult<Self> {
        let Some((min, max)) = kind.integer_bounds() else {
            return Ok(match kind {
                PrimitiveKind::F32 => MemoryValue::F32(value as f32),
                _ => MemoryValue::F64(value as f64),
            });
        };
        if value < min || value > max {
            return Err(MemoryError::encode(format!(
                "{} does not fit {:?} (range {}..={})",
                value, kind, min, max
            )));
        }
        let converted = match kind {
            PrimitiveKind::Bool => MemoryValue::Bool(value != 0),
            PrimitiveKind::I8 => MemoryValue::I8(value as i8),
            PrimitiveKind::I16 => MemoryValue::I16(value as i16),
            PrimitiveKind::I32 => MemoryValue::I32(value as i32),
            PrimitiveKind::I64 => MemoryValue::I64(value as i64),
            PrimitiveKind::U8 => MemoryValue::U8(value as u8),
            PrimitiveKind::U16 => MemoryValue::U16(value as u16),
            PrimitiveKind::U32 => MemoryValue::U32(value as u32),
            PrimitiveKind::U64 => MemoryValue::U64(value as u64),
            PrimitiveKind::F32 => MemoryValue::F32(value as f32),
            PrimitiveKind::F64 => MemoryValue::F64(value as f64),
        };
        Ok(converted)
    }

    /// Converts the value into `kind`, failing when it does not fit
    pub fn convert_to(&self, kind: PrimitiveKind) -> MemoryResult<Self> {
        if self.kind() == kind {
            return Ok(*self);
        }
        match kind {
            PrimitiveKind::F64 => Ok(MemoryValue::F64(self.as_float())),
            PrimitiveKind::F32 => {
                let value = self.as_float();
                if value.is_finite() && value.abs() > f32::MAX as f64 {
                    return Err(MemoryError::encode(format!("{} does not fit f32", value)));
                }
                Ok(MemoryValue::F32(value as f32))
            }
            _ => {
                let value = self.as_integer().ok_or_else(|| {
                    MemoryError::encode(format!("{} is not an integer value", self))
                })?;
                Self::from_integer(kind, value)
            }
        }
    }

    /// Encodes the value into exactly `kind.width()` little-endian bytes
    pub fn encode_as(&self, kind: PrimitiveKind) -> MemoryResult<Vec<u8>> {
        Ok(self.convert_to(kind)?.to_bytes())
    }

    /// Parses user-entered text as a value of `kind`.
    ///
    /// Integers accept decimal or `0x` hex with an optional sign, booleans
    /// accept `true`/`false`/`1`/`0`.
    pub fn parse(kind: PrimitiveKind, text: &str) -> MemoryResult<Self> {
        let text = text.trim();
        match kind {
            PrimitiveKind::Bool => match text.to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(MemoryValue::Bool(true)),
                "false" | "0" => Ok(MemoryValue::Bool(false)),
                _ => Err(MemoryError::encode(format!("'{}' is not a boolean", text))),
            },
            PrimitiveKind::F32 => text
                .parse::<f32>()
                .map(MemoryValue::F32)
                .map_err(|_| MemoryError::encode(format!("'{}' is not a float", text))),
            PrimitiveKind::F64 => text
                .parse::<f64>()
                .map(MemoryValue::F64)
                .map_err(|_| MemoryError::encode(format!("'{}' is not a float", text))),
            _ => {
                let value = parse_integer(text)
                    .ok_or_else(|| MemoryError::encode(format!("'{}' is not an integer", text)))?;
                Self::from_integer(kind, value)
            }
        }
    }
}

fn integral_float(value: f64) -> Option<i128> {
    if value.is_finite() && value.fract() == 0.0 {
        Some(value as i128)
    } else {
        None
    }
}

fn parse_integer(text: &str) -> Option<i128> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let magnitude = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i128::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i128>().ok()?,
    };
    Some(if negative { -magnitude } else { magnitude })
}

impl fmt::Display for MemoryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryValue::Bool(v) => write!(f, "{}", v),
            MemoryValue::I8(v) => write!(f, "{}", v),
            MemoryValue::I16(v) => write!(f, "{}", v),
            MemoryValue::I32(v) => write!(f, "{}", v),
            MemoryValue::I64(v) => write!(f, "{}", v),
            MemoryValue::U8(v) => write!(f, "{}", v),
            MemoryValue::U16(v) => write!(f, "{}", v),
            MemoryValue::U32(v) => write!(f, "{}", v),
            MemoryValue::U64(v) => write!(f, "{}", v),
            MemoryValue::F32(v) => write!(f, "{}", v),
            MemoryValue::F64(v) => write!(f, "{}", v),
        }
    }
}

//! Materialized snapshots of foreign memory

use crate::core::types::{Address, MemoryValue, PrimitiveKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The range a block was read from. Writes through a block are checked
/// against these bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockBounds {
    pub base: Address,
    pub size: usize,
}

impl BlockBounds {
    /// Whether `[offset, offset + len)` lies inside the block
    pub fn contains(&self, offset: usize, len: usize) -> bool {
        offset
            .checked_add(len)
            .map_or(false, |end| end <= self.size)
    }
}

/// `size` bytes read from foreign address `base`.
///
/// Cloning and slicing share the underlying buffer.
#[derive(Clone)]
pub struct MemoryBlock {
    base: Address,
    data: Arc<[u8]>,
    start: usize,
    len: usize,
}

impl MemoryBlock {
    pub fn new(base: Address, data: Arc<[u8]>) -> Self {
        let len = data.len();
        MemoryBlock {
            base,
            data,
            start: 0,
            len,
        }
    }

    /// Builds a block from owned bytes
    pub fn from_vec(base: Address, bytes: Vec<u8>) -> Self {
        Self::new(base, Arc::from(bytes))
    }

    /// Narrows a shared buffer to its first `len` bytes
    pub(crate) fn with_len(base: Address, data: Arc<[u8]>, len: usize) -> Self {
        let len = len.min(data.len());
        MemoryBlock {
            base,
            data,
            start: 0,
            len,
        }
    }

    pub fn base(&self) -> Address {
        self.base
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bounds(&self) -> BlockBounds {
        BlockBounds {
            base: self.base,
            size: self.len,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[self.start..self.start + self.len]
    }

    /// Bytes `[offset, offset + len)`, or `None` when out of bounds
    pub fn bytes(&self, offset: usize, len: usize) -> Option<&[u8]> {
        if !self.bounds().contains(offset, len) {
            return None;
        }
        Some(&self.as_bytes()[offset..offset + len])
    }

    /// A view of `[offset, offset + len)` as its own block based at
    /// `base + offset`
    pub fn sub_block(&self, offset: usize, len: usize) -> Option<MemoryBlock> {
        if !self.bounds().contains(offset, len) {
            return None;
        }
        Some(MemoryBlock {
            base: self.base.offset(offset as u64),
            data: self.data.clone(),
            start: self.start + offset,
            len,
        })
    }

    /// Decodes a little-endian primitive at `offset`
    pub fn read_value(&self, offset: usize, kind: PrimitiveKind) -> Option<MemoryValue> {
        MemoryValue::from_bytes(self.bytes(offset, kind.width())?, kind)
    }

    /// Little-endian unsigned integer of `width` (1..=8) bytes at `offset`
    pub fn read_uint(&self, offset: usize, width: usize) -> Option<u64> {
        if width == 0 || width > 8 {
            return None;
        }
        let raw = self.bytes(offset, width)?;
        let mut buffer = [0u8; 8];
        buffer[..width].copy_from_slice(raw);
        Some(u64::from_le_bytes(buffer))
    }

    pub fn read_u64(&self, offset: usize) -> Option<u64> {
        self.read_uint(offset, 8)
    }

    pub fn read_i32(&self, offset: usize) -> Option<i32> {
        let raw = self.bytes(offset, 4)?;
        Some(i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }
}

impl fmt::Debug for MemoryBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryBlock")
            .field("base", &self.base)
            .field("len", &self.len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block() -> MemoryBlock {
        MemoryBlock::from_vec(
            Address::new(0x1000),
            vec![0, 0, 128, 63, 0, 0, 0, 64, 0x10, 0x20, 0x30, 0x40],
        )
    }

    #[test]
    fn test_read_values() {
        let block = block();
        assert_eq!(
            block.read_value(0, PrimitiveKind::F32),
            Some(MemoryValue::F32(1.0))
        );
        assert_eq!(
            block.read_value(4, PrimitiveKind::F32),
            Some(MemoryValue::F32(2.0))
        );
        assert_eq!(block.read_uint(8, 2), Some(0x2010));
        assert_eq!(block.read_value(10, PrimitiveKind::U32), None);
    }

    #[test]
    fn test_sub_block() {
        let block = block();
        let sub = block.sub_block(8, 4).unwrap();
        assert_eq!(sub.base(), Address::new(0x1008));
        assert_eq!(sub.as_bytes(), &[0x10, 0x20, 0x30, 0x40]);
        assert_eq!(sub.read_uint(1, 1), Some(0x20));
        assert!(block.sub_block(10, 4).is_none());
        assert!(sub.sub_block(0, 5).is_none());
    }

    #[test]
    fn test_bounds() {
        let bounds = block().bounds();
        assert!(bounds.contains(0, 12));
        assert!(bounds.contains(11, 1));
        assert!(!bounds.contains(11, 2));
        assert!(!bounds.contains(usize::MAX, 2));
    }
}

//! Bounds-checked write path
//!
//! Writes are addressed relative to a block that was read earlier, and must
//! stay inside the bounds established by that read.

use super::block::BlockBounds;
use super::MemoryAccess;
use crate::catalog::BitRange;
use crate::core::types::{MemoryError, MemoryResult};
use tracing::debug;

impl<'a> MemoryAccess<'a> {
    /// Write `data` at `offset` inside a previously read block
    pub fn write(&mut self, block: &BlockBounds, offset: usize, data: &[u8]) -> MemoryResult<()> {
        if data.is_empty() {
            return Ok(());
        }

        if !block.contains(offset, data.len()) {
            return Err(MemoryError::out_of_range(
                block.base,
                offset.saturating_add(data.len()),
                format!(
                    "write of {} bytes at +0x{:X} exceeds the {} byte block",
                    data.len(),
                    offset,
                    block.size
                ),
            ));
        }

        let address = block.base.offset(offset as u64);
        address.check_range(data.len(), self.max_read_size())?;

        debug!("Writing {} bytes at {}", data.len(), address);
        self.target.write(address, data)?;

        // Anything cached this pass may now be stale
        self.end_pass();
        Ok(())
    }

    /// Replace the bits of `range` at `offset` with `value`, preserving every
    /// other bit of the touched bytes.
    ///
    /// The current bytes are re-read from the target rather than taken from
    /// a snapshot, so concurrent changes to sibling bits are not reverted.
    pub fn write_bits(
        &mut self,
        block: &BlockBounds,
        offset: usize,
        range: BitRange,
        value: u64,
    ) -> MemoryResult<()> {
        if !range.is_valid() {
            return Err(MemoryError::encode(format!("invalid bit range {:?}", range)));
        }
        if value & !range.value_mask() != 0 {
            return Err(MemoryError::encode(format!(
                "{} does not fit a {} bit field",
                value, range.width
            )));
        }

        let span = range.byte_span();
        if !block.contains(offset, span) {
            return Err(MemoryError::out_of_range(
                block.base,
                offset.saturating_add(span),
                format!("bitfield at +0x{:X} exceeds the {} byte block", offset, block.size),
            ));
        }

        let address = block.base.offset(offset as u64);
        let current = self.read_uncached(address, span)?;

        let mut word = [0u8; 8];
        word[..span].copy_from_slice(&current);
        let mask = range.value_mask() << range.offset;
        let merged = (u64::from_le_bytes(word) & !mask) | ((value << range.offset) & mask);

        self.write(block, offset, &merged.to_le_bytes()[..span])
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::BitRange;
    use crate::core::types::{Address, MemoryError};
    use crate::memory::{BlockBounds, MemoryAccess, SnapshotMemory};

    fn setup(bytes: Vec<u8>) -> (SnapshotMemory, BlockBounds) {
        let memory = SnapshotMemory::new();
        let size = bytes.len();
        memory.map(Address::new(0x1000), bytes);
        (
            memory,
            BlockBounds {
                base: Address::new(0x1000),
                size,
            },
        )
    }

    #[test]
    fn test_write_within_bounds() {
        let (memory, block) = setup(vec![0; 8]);
        let mut access = MemoryAccess::with_limits(&memory, 1024, 16);

        access.write(&block, 4, &[1, 2, 3, 4]).unwrap();
        assert_eq!(
            memory.peek(Address::new(0x1000), 8).unwrap(),
            vec![0, 0, 0, 0, 1, 2, 3, 4]
        );
    }

    #[test]
    fn test_write_past_block_is_rejected() {
        let (memory, block) = setup(vec![0; 8]);
        let mut access = MemoryAccess::with_limits(&memory, 1024, 16);

        assert!(matches!(
            access.write(&block, 6, &[1, 2, 3]),
            Err(MemoryError::OutOfRange { .. })
        ));
        assert_eq!(memory.peek(Address::new(0x1000), 8).unwrap(), vec![0; 8]);
    }

    #[test]
    fn test_write_invalidates_pass_cache() {
        let (memory, block) = setup(vec![0; 8]);
        let mut access = MemoryAccess::with_limits(&memory, 1024, 16);

        access.read(Address::new(0x1000), 8).unwrap();
        assert_eq!(access.cache_size(), 1);
        access.write(&block, 0, &[9]).unwrap();
        assert_eq!(access.cache_size(), 0);

        let fresh = access.read(Address::new(0x1000), 8).unwrap();
        assert_eq!(fresh.as_bytes()[0], 9);
    }

    #[test]
    fn test_write_bits_preserves_siblings() {
        let (memory, block) = setup(vec![0b1111_1111, 0b0000_0000]);
        let mut access = MemoryAccess::with_limits(&memory, 1024, 16);

        access.write_bits(&block, 0, BitRange::single(3), 0).unwrap();
        assert_eq!(
            memory.peek(Address::new(0x1000), 2).unwrap(),
            vec![0b1111_0111, 0]
        );

        // A 4 bit field straddling the byte boundary
        let range = BitRange {
            offset: 6,
            width: 4,
        };
        access.write_bits(&block, 0, range, 0b1010).unwrap();
        assert_eq!(
            memory.peek(Address::new(0x1000), 2).unwrap(),
            vec![0b1011_0111, 0b0000_0010]
        );
    }

    #[test]
    fn test_write_bits_rejects_oversized_values() {
        let (memory, block) = setup(vec![0]);
        let mut access = MemoryAccess::with_limits(&memory, 1024, 16);

        assert!(matches!(
            access.write_bits(&block, 0, BitRange::single(0), 2),
            Err(MemoryError::EncodeError(_))
        ));
    }
}

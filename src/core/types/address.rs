//! Foreign address wrapper type with hex parsing and validation

use super::error::{MemoryError, MemoryResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An address in the target process's address space.
///
/// Always 64 bits wide regardless of the host, since the inspected process
/// is not necessarily the same architecture as the inspector.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Address(pub u64);

impl Address {
    /// Creates a new address from a raw value
    pub const fn new(value: u64) -> Self {
        Address(value)
    }

    /// Creates a null address (0x0)
    pub const fn null() -> Self {
        Address(0)
    }

    /// Checks if the address is null
    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the address is aligned to the specified boundary
    pub const fn is_aligned(&self, alignment: u64) -> bool {
        alignment != 0 && self.0 % alignment == 0
    }

    /// Adds a byte offset, wrapping on overflow
    pub const fn offset(&self, offset: u64) -> Self {
        Address(self.0.wrapping_add(offset))
    }

    /// Adds a byte offset, returning `None` on overflow
    pub const fn checked_offset(&self, offset: u64) -> Option<Self> {
        match self.0.checked_add(offset) {
            Some(value) => Some(Address(value)),
            None => None,
        }
    }

    /// Returns the raw value
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Validates that `[self, self + size)` is a sane range to read or write.
    ///
    /// Rejects null addresses, empty ranges, ranges longer than `max_size`
    /// and ranges that wrap around the end of the address space.
    pub fn check_range(&self, size: usize, max_size: usize) -> MemoryResult<()> {
        if self.is_null() {
            return Err(MemoryError::out_of_range(*self, size, "null address"));
        }
        if size == 0 {
            return Err(MemoryError::out_of_range(*self, size, "empty range"));
        }
        if size > max_size {
            return Err(MemoryError::out_of_range(
                *self,
                size,
                format!("size exceeds the {} byte limit", max_size),
            ));
        }
        if self.checked_offset(size as u64).is_none() {
            return Err(MemoryError::out_of_range(*self, size, "address overflow"));
        }
        Ok(())
    }
}

impl FromStr for Address {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let value = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            u64::from_str_radix(hex, 16)
        } else if let Some(hex) = s.strip_prefix('$') {
            u64::from_str_radix(hex, 16)
        } else if s.chars().any(|c| c.is_ascii_alphabetic()) {
            // Assume hex if contains letters
            u64::from_str_radix(s, 16)
        } else {
            s.parse::<u64>().or_else(|_| u64::from_str_radix(s, 16))
        };

        value
            .map(Address::new)
            .map_err(|_| MemoryError::InvalidAddress(s.to_string()))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.0)
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

impl fmt::UpperHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.0)
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Self {
        Address::new(value)
    }
}

impl From<Address> for u64 {
    fn from(address: Address) -> Self {
        address.0
    }
}

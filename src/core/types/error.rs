//! Custom error types for Live-Inspector

use super::address::Address;
use std::fmt;
use thiserror::Error;

/// Main error type for interpretation, resolution and edit operations
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Out of range: {size} bytes at {address}: {reason}")]
    OutOfRange {
        address: String,
        size: usize,
        reason: String,
    },

    #[error("Failed to read memory at {address}: {reason}")]
    ForeignReadFailure { address: String, reason: String },

    #[error("Failed to write memory at {address}: {reason}")]
    ForeignWriteFailure { address: String, reason: String },

    #[error("Cannot encode value: {0}")]
    EncodeError(String),

    #[error("Runtime type resolution failed: {0}")]
    ResolutionFailure(String),

    #[error("Catalog lookup failed: {0}")]
    CatalogLookupFailure(String),

    #[error("Invalid memory address: {0}")]
    InvalidAddress(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for memory operations
pub type MemoryResult<T> = Result<T, MemoryError>;

impl MemoryError {
    /// Creates an out of range error for a rejected address/size pair
    pub fn out_of_range(address: Address, size: usize, reason: impl Into<String>) -> Self {
        MemoryError::OutOfRange {
            address: address.to_string(),
            size,
            reason: reason.into(),
        }
    }

    /// Creates a read failed error
    pub fn read_failed(address: impl fmt::Display, reason: impl Into<String>) -> Self {
        MemoryError::ForeignReadFailure {
            address: address.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates a write failed error
    pub fn write_failed(address: impl fmt::Display, reason: impl Into<String>) -> Self {
        MemoryError::ForeignWriteFailure {
            address: address.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates an encode error
    pub fn encode(reason: impl Into<String>) -> Self {
        MemoryError::EncodeError(reason.into())
    }

    /// Whether the failure is recovered locally with a fallback
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MemoryError::ResolutionFailure(_) | MemoryError::CatalogLookupFailure(_)
        )
    }
}

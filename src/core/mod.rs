//! Core module containing fundamental types for Live-Inspector
//!
//! This module provides the foundational building blocks used throughout
//! the crate, including address handling, primitive values, occurrence
//! identity and error types.

pub mod types;

// Re-export commonly used types for convenience
pub use types::{
    Address, MemoryError, MemoryResult, MemoryValue, OccurrenceKey, OffsetPath, PrimitiveKind,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

#[cfg(not(target_pointer_width = "64"))]
compile_error!("Live-Inspector requires a 64-bit host");

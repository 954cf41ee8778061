//! Core type definitions for Live-Inspector
//!
//! This module contains the fundamental types used throughout the crate:
//! foreign addresses, primitive values, occurrence identity and errors.

mod address;
mod error;
mod occurrence;
mod value;

// Re-export all public types
pub use address::Address;
pub use error::{MemoryError, MemoryResult};
pub use occurrence::{OccurrenceKey, OccurrenceRoot, OffsetPath, PathStep};
pub use value::{MemoryValue, PrimitiveKind};


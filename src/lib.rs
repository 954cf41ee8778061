//! Live-Inspector: type-directed interpretation and editing of live memory
//!
//! Given a catalog of recovered type layouts and an attached target process,
//! the crate decodes objects into typed trees, resolves polymorphic pointers
//! to their runtime types, writes edits back, and searches the type graph
//! for member paths.

pub mod catalog;
pub mod config;
pub mod core;
pub mod interpreter;
pub mod logging;
pub mod memory;
pub mod resolver;
pub mod search;
pub mod session;

#[cfg(windows)]
pub mod process;
#[cfg(windows)]
pub mod windows;

// Re-export main types from core module
pub use crate::core::types::{
    Address, MemoryError, MemoryResult, MemoryValue, OccurrenceKey, OccurrenceRoot, OffsetPath,
    PathStep, PrimitiveKind,
};

pub use catalog::{FieldType, Member, TypeCatalog, TypeDescriptor, TypeId};
pub use interpreter::{FieldInterpreter, FieldLocation, FieldNode, FieldValue, StructNode};
pub use memory::{ForeignMemory, MemoryAccess, SnapshotMemory};
pub use resolver::RuntimeTypeResolver;
pub use search::{PathResult, PathSearch, SearchController, SearchOutcome};
pub use session::{InspectionPass, InspectionSession, Inspector};

// Re-export core directly for full access
pub use crate::core::{AUTHORS, VERSION};

//! Offset paths and occurrence identity
//!
//! The same type descriptor can be reached through many routes during a
//! traversal. An [`OccurrenceKey`] names one concrete visit: the root it was
//! reached from, the full path of steps taken, and the type seen there.

use super::address::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One step on the way from an inspection root to a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathStep {
    /// Move into a member at this byte offset of the current object
    Field(u32),
    /// Follow the pointer stored at the current location into a new object
    Deref,
    /// Enter element `n` of a dynamic array
    Index(u32),
}

/// Full path from an inspection root.
///
/// Offsets accumulate until a [`PathStep::Deref`] or [`PathStep::Index`],
/// which start a new object with its own offset space.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OffsetPath {
    steps: Vec<PathStep>,
}

impl OffsetPath {
    /// Creates an empty path (the root itself)
    pub fn new() -> Self {
        OffsetPath { steps: Vec::new() }
    }

    /// Returns the steps of the path
    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the path is the root
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Returns a new path extended by `step`
    pub fn child(&self, step: PathStep) -> Self {
        let mut steps = Vec::with_capacity(self.steps.len() + 1);
        steps.extend_from_slice(&self.steps);
        steps.push(step);
        OffsetPath { steps }
    }

    /// Returns a new path extended into the member at `offset`
    pub fn field(&self, offset: u32) -> Self {
        self.child(PathStep::Field(offset))
    }

    /// Byte offset inside the current object, i.e. the sum of field steps
    /// taken since the last pointer or array hop
    pub fn inner_offset(&self) -> u32 {
        self.steps
            .iter()
            .rev()
            .take_while(|step| matches!(step, PathStep::Field(_)))
            .map(|step| match step {
                PathStep::Field(offset) => *offset,
                _ => 0,
            })
            .fold(0u32, |acc, offset| acc.saturating_add(offset))
    }
}

impl fmt::Display for OffsetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            match step {
                PathStep::Field(offset) => write!(f, "/+0x{:X}", offset)?,
                PathStep::Deref => write!(f, "/*")?,
                PathStep::Index(index) => write!(f, "/[{}]", index)?,
            }
        }
        Ok(())
    }
}

/// Where a traversal started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OccurrenceRoot {
    Address(Address),
    Session(u64),
}

impl fmt::Display for OccurrenceRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OccurrenceRoot::Address(address) => write!(f, "{}", address),
            OccurrenceRoot::Session(id) => write!(f, "session#{}", id),
        }
    }
}

/// Identity of one concrete visit of a type during a traversal
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OccurrenceKey {
    pub root: OccurrenceRoot,
    pub path: OffsetPath,
    pub type_name: String,
}

impl OccurrenceKey {
    pub fn new(root: OccurrenceRoot, path: OffsetPath, type_name: impl Into<String>) -> Self {
        OccurrenceKey {
            root,
            path,
            type_name: type_name.into(),
        }
    }
}

impl fmt::Display for OccurrenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}:{}", self.root, self.path, self.type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_inner_offset_resets_on_hops() {
        let path = OffsetPath::new().field(0x10).field(0x8);
        assert_eq!(path.inner_offset(), 0x18);

        let deref = path.child(PathStep::Deref);
        assert_eq!(deref.inner_offset(), 0);
        assert_eq!(deref.field(0x4).inner_offset(), 0x4);

        let element = deref.child(PathStep::Index(3)).field(0x2);
        assert_eq!(element.inner_offset(), 0x2);
    }

    #[test]
    fn test_path_display() {
        let path = OffsetPath::new()
            .field(0x10)
            .child(PathStep::Deref)
            .child(PathStep::Index(2));
        assert_eq!(path.to_string(), "/+0x10/*/[2]");
    }

    #[test]
    fn test_keys_distinguish_paths_not_types() {
        let root = OccurrenceRoot::Address(Address::new(0x1000));
        let a = OccurrenceKey::new(root, OffsetPath::new().field(0x0), "FVector");
        let b = OccurrenceKey::new(root, OffsetPath::new().field(0xC), "FVector");
        let c = OccurrenceKey::new(
            OccurrenceRoot::Address(Address::new(0x2000)),
            OffsetPath::new().field(0x0),
            "FVector",
        );

        let keys: HashSet<_> = [a.clone(), b, c, a].into_iter().collect();
        assert_eq!(keys.len(), 3);
    }
}

//! Member path search over the type graph
//!
//! A depth-first walk from a root type through inline structs, object
//! pointers, array elements and inherited members, collecting every path to
//! a member whose name contains the query. The graph may be cyclic, so the
//! walk is bounded by depth and by a node budget: results are sound but may
//! be incomplete, and the outcome says so.

mod controller;

pub use controller::{spawn_search, SearchController, SearchTicket};

use crate::catalog::{FieldType, Member, TypeCatalog, TypeId};
use crate::config::SearchConfig;
use serde::Serialize;
use tracing::{debug, trace};

/// One member traversed on the way to a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathHop {
    /// Type declaring the member (an ancestor for inherited members)
    pub owner: TypeId,
    pub owner_name: String,
    pub member: String,
    /// Offset of the member inside its owner
    pub offset: u32,
    /// Offset inside the enclosing object, summed across inline structs
    pub object_offset: u32,
}

/// Route from the search root to a matching member
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathResult {
    pub hops: Vec<PathHop>,
}

impl PathResult {
    /// The matched member
    pub fn target(&self) -> Option<&PathHop> {
        self.hops.last()
    }

    /// `(owner, object offset)` of every hop leading to the match; the nodes
    /// a viewer expands to reveal it
    pub fn expansion_offsets(&self) -> Vec<(TypeId, u32)> {
        let leading = self.hops.len().saturating_sub(1);
        self.hops[..leading]
            .iter()
            .map(|hop| (hop.owner, hop.object_offset))
            .collect()
    }

    /// Dotted member path, e.g. `Pawn.Controller.Health`
    pub fn display_path(&self) -> String {
        self.hops
            .iter()
            .map(|hop| hop.member.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Results plus why the walk stopped
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchOutcome {
    pub results: Vec<PathResult>,
    /// Members examined
    pub visited: usize,
    /// Some branch reached the depth guard
    pub depth_limited: bool,
    pub budget_exhausted: bool,
    pub cancelled: bool,
}

impl SearchOutcome {
    /// True when every reachable path was explored
    pub fn is_complete(&self) -> bool {
        !self.depth_limited && !self.budget_exhausted && !self.cancelled
    }
}

/// Depth-first member search over a catalog
pub struct PathSearch<'a> {
    catalog: &'a TypeCatalog,
    max_visited: usize,
}

struct Walk<'t> {
    needle: String,
    max_depth: usize,
    ticket: Option<&'t SearchTicket>,
    path: Vec<PathHop>,
    outcome: SearchOutcome,
}

/// One type being walked: its inheritance chain and a cursor into it
struct Frame {
    chain: Vec<TypeId>,
    owner: usize,
    member: usize,
    base_offset: u32,
    depth: usize,
}

impl<'a> PathSearch<'a> {
    pub fn new(catalog: &'a TypeCatalog, config: &SearchConfig) -> Self {
        PathSearch {
            catalog,
            max_visited: config.max_visited,
        }
    }

    /// Every path from `root` to a member whose name contains `query`,
    /// case-insensitively, in depth-first declaration order
    pub fn search(&self, root: TypeId, query: &str, max_depth: usize) -> SearchOutcome {
        self.search_with(root, query, max_depth, None)
    }

    /// As [`search`](Self::search), stopping early once `ticket` is
    /// superseded
    pub fn search_with(
        &self,
        root: TypeId,
        query: &str,
        max_depth: usize,
        ticket: Option<&SearchTicket>,
    ) -> SearchOutcome {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return SearchOutcome::default();
        }

        let mut walk = Walk {
            needle,
            max_depth,
            ticket,
            path: Vec::new(),
            outcome: SearchOutcome::default(),
        };
        self.walk(&mut walk, root);

        debug!(
            "Search for '{}' found {} paths after {} members{}",
            query,
            walk.outcome.results.len(),
            walk.outcome.visited,
            if walk.outcome.cancelled {
                " (cancelled)"
            } else {
                ""
            }
        );
        walk.outcome
    }

    /// Depth-first over an explicit frame stack; cyclic graphs can run as
    /// deep as the node budget allows
    fn walk(&self, walk: &mut Walk<'_>, root: TypeId) {
        let mut stack: Vec<Frame> = Vec::new();
        stack.extend(self.enter(walk, root, 0, 0));

        while let Some(frame) = stack.last_mut() {
            let (base_offset, depth) = (frame.base_offset, frame.depth);
            let Some((owner, owner_name, member)) = self.next_member(frame) else {
                stack.pop();
                // Leaving a nested type drops the hop that led into it
                if !stack.is_empty() {
                    walk.path.pop();
                }
                continue;
            };

            if walk.ticket.map_or(false, |t| t.is_superseded()) {
                walk.outcome.cancelled = true;
                return;
            }
            if walk.outcome.visited >= self.max_visited {
                walk.outcome.budget_exhausted = true;
                return;
            }
            walk.outcome.visited += 1;

            let object_offset = base_offset.saturating_add(member.offset);
            walk.path.push(PathHop {
                owner,
                owner_name: owner_name.to_string(),
                member: member.name.clone(),
                offset: member.offset,
                object_offset,
            });

            if member.name.to_lowercase().contains(&walk.needle) {
                trace!("Match at depth {}: {}", depth, member.name);
                walk.outcome.results.push(PathResult {
                    hops: walk.path.clone(),
                });
            }

            match self.descend(walk, member, object_offset, depth) {
                Some(child) => stack.push(child),
                None => {
                    walk.path.pop();
                }
            }
        }
    }

    fn enter(
        &self,
        walk: &mut Walk<'_>,
        type_id: TypeId,
        base_offset: u32,
        depth: usize,
    ) -> Option<Frame> {
        if depth >= walk.max_depth {
            walk.outcome.depth_limited = true;
            return None;
        }

        // Inherited members come first, root-most ancestor leading
        let mut chain = self.catalog.ancestors(type_id);
        chain.reverse();
        chain.push(type_id);

        Some(Frame {
            chain,
            owner: 0,
            member: 0,
            base_offset,
            depth,
        })
    }

    fn next_member(&self, frame: &mut Frame) -> Option<(TypeId, &'a str, &'a Member)> {
        let catalog = self.catalog;
        while let Some(&owner) = frame.chain.get(frame.owner) {
            if let Some(descriptor) = catalog.try_get(owner) {
                if let Some(member) = descriptor.members.get(frame.member) {
                    frame.member += 1;
                    return Some((owner, descriptor.name.as_str(), member));
                }
            }
            frame.owner += 1;
            frame.member = 0;
        }
        None
    }

    fn descend(
        &self,
        walk: &mut Walk<'_>,
        member: &Member,
        object_offset: u32,
        depth: usize,
    ) -> Option<Frame> {
        let mut field_type = &member.field_type;
        // Nested arrays search their innermost element type
        while let FieldType::DynamicArray(element) = field_type {
            field_type = element;
        }

        match field_type {
            FieldType::InlineStruct(id) => self.enter(walk, *id, object_offset, depth + 1),
            FieldType::ObjectPointer(id) => self.enter(walk, *id, 0, depth + 1),
            _ => None,
        }
    }
}

//! Inspection sessions over an attached target
//!
//! [`Inspector`] ties one target, one catalog and the session-scoped caches
//! together. Each interpretation runs inside an [`InspectionPass`], whose
//! read cache lives exactly as long as the pass.

use crate::catalog::{TypeCatalog, TypeId};
use crate::config::Config;
use crate::core::types::{
    Address, MemoryResult, MemoryValue, OccurrenceRoot, OffsetPath, PrimitiveKind,
};
use crate::interpreter::{FieldInterpreter, FieldLocation, FieldNode, StructNode};
use crate::memory::{ForeignMemory, MemoryAccess};
use crate::resolver::{MetadataLayout, RuntimeTypeResolver};
use crate::search::{spawn_search, PathSearch, SearchController, SearchOutcome};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Foreign memory an inspector can hold across threads
pub type SharedTarget = Box<dyn ForeignMemory + Send + Sync>;

/// A root type at a root address, as opened by a viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionSession {
    pub id: u64,
    pub root_type: TypeId,
    pub root_address: Address,
}

/// Entry point for interpretation, editing, resolution and search
pub struct Inspector {
    target: SharedTarget,
    catalog: Arc<TypeCatalog>,
    resolver: RuntimeTypeResolver,
    config: Config,
    searches: Arc<SearchController>,
    next_session: u64,
}

impl Inspector {
    pub fn new(target: SharedTarget, catalog: Arc<TypeCatalog>, config: Config) -> Self {
        let resolver = RuntimeTypeResolver::new(MetadataLayout::from(&config.resolver));
        Inspector {
            target,
            catalog,
            resolver,
            config,
            searches: Arc::new(SearchController::new()),
            next_session: 1,
        }
    }

    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn resolver(&self) -> &RuntimeTypeResolver {
        &self.resolver
    }

    /// Open a session on the type named `root_type` at `address`
    pub fn open_session(&mut self, root_type: &str, address: Address) -> MemoryResult<InspectionSession> {
        let root_type = self.catalog.lookup_struct(root_type)?;
        let session = InspectionSession {
            id: self.next_session,
            root_type,
            root_address: address,
        };
        self.next_session += 1;
        info!(
            "Opened session {} on {} at {}",
            session.id,
            self.catalog.get(root_type).name,
            address
        );
        Ok(session)
    }

    /// Start a traversal pass with a fresh read cache
    pub fn begin_pass(&self) -> InspectionPass<'_> {
        InspectionPass {
            inspector: self,
            memory: MemoryAccess::new(&*self.target, &self.config.memory),
        }
    }

    /// Decode a session's root in a pass of its own
    pub fn interpret(&self, session: &InspectionSession) -> MemoryResult<StructNode> {
        self.begin_pass().interpret(session)
    }

    /// Write an edited value in a pass of its own
    pub fn commit_edit(
        &self,
        location: &FieldLocation,
        kind: PrimitiveKind,
        value: &MemoryValue,
    ) -> MemoryResult<()> {
        self.begin_pass().commit_edit(location, kind, value)
    }

    /// Most-derived type of `object`, falling back to `static_type`
    pub fn resolve_real_type(&self, object: Address, static_type: TypeId) -> TypeId {
        let mut pass = self.begin_pass();
        pass.resolve_real_type(object, static_type)
    }

    /// Synchronous search bounded by the configured depth
    pub fn search(&self, root: TypeId, query: &str) -> SearchOutcome {
        let ticket = self.searches.begin();
        PathSearch::new(&self.catalog, &self.config.search).search_with(
            root,
            query,
            self.config.search.max_depth,
            Some(&ticket),
        )
    }

    /// Search on the blocking pool; supersedes any running search
    pub fn spawn_search(&self, root: TypeId, query: impl Into<String>) -> JoinHandle<SearchOutcome> {
        spawn_search(
            &self.searches,
            Arc::clone(&self.catalog),
            self.config.search.clone(),
            root,
            query.into(),
        )
    }

    pub fn cancel_search(&self) {
        self.searches.cancel();
    }

    pub fn search_in_progress(&self) -> bool {
        self.searches.in_progress()
    }

    /// Swap in a new target. Runtime types resolved against the old one are
    /// forgotten and running searches are cancelled.
    pub fn reattach(&mut self, target: SharedTarget) {
        info!("Reattaching inspector to a new target");
        self.target = target;
        self.resolver.clear();
        self.searches.cancel();
    }
}

/// One traversal pass: reads are cached until the pass ends or is refreshed
pub struct InspectionPass<'i> {
    inspector: &'i Inspector,
    memory: MemoryAccess<'i>,
}

impl<'i> InspectionPass<'i> {
    fn interpreter(&mut self) -> FieldInterpreter<'_, 'i> {
        FieldInterpreter::new(
            &self.inspector.catalog,
            &mut self.memory,
            &self.inspector.resolver,
            &self.inspector.config.interpreter,
        )
    }

    pub fn interpret(&mut self, session: &InspectionSession) -> MemoryResult<StructNode> {
        self.interpreter()
            .with_root(OccurrenceRoot::Session(session.id))
            .interpret(session.root_type, session.root_address, OffsetPath::new(), 0)
    }

    /// Decode `type_id` at an arbitrary address
    pub fn interpret_at(&mut self, type_id: TypeId, address: Address) -> MemoryResult<StructNode> {
        self.interpreter()
            .interpret(type_id, address, OffsetPath::new(), 0)
    }

    pub fn commit_edit(
        &mut self,
        location: &FieldLocation,
        kind: PrimitiveKind,
        value: &MemoryValue,
    ) -> MemoryResult<()> {
        self.interpreter().commit_edit(location, kind, value)
    }

    pub fn commit_field(&mut self, field: &FieldNode, value: &MemoryValue) -> MemoryResult<()> {
        self.interpreter().commit_field(field, value)
    }

    pub fn commit_text(&mut self, field: &FieldNode, text: &str) -> MemoryResult<()> {
        self.interpreter().commit_text(field, text)
    }

    pub fn resolve_real_type(&mut self, object: Address, static_type: TypeId) -> TypeId {
        self.inspector.resolver.resolve_real_type(
            &mut self.memory,
            &self.inspector.catalog,
            object,
            static_type,
            self.inspector.config.interpreter.guess_real_class,
        )
    }

    /// Forget cached reads so the next decode sees live memory
    pub fn refresh(&mut self) {
        self.memory.end_pass();
    }

    /// Reads this pass issued to the target
    pub fn foreign_reads(&self) -> u64 {
        self.memory.foreign_reads()
    }
}

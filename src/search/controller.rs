//! Last-query-wins coordination for background searches

use super::{PathSearch, SearchOutcome};
use crate::catalog::{TypeCatalog, TypeId};
use crate::config::SearchConfig;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Tracks the newest search. Starting a search supersedes every older one.
#[derive(Debug, Default)]
pub struct SearchController {
    generation: AtomicU64,
    /// Generation of the running search, 0 when idle
    active: AtomicU64,
}

impl SearchController {
    pub fn new() -> Self {
        SearchController::default()
    }

    /// Start a new search, superseding any running one
    pub fn begin(self: &Arc<Self>) -> SearchTicket {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.active.store(generation, Ordering::SeqCst);
        debug!("Search generation {} started", generation);
        SearchTicket {
            controller: Arc::clone(self),
            generation,
        }
    }

    /// Short-circuit the running search, if any
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.active.store(0, Ordering::SeqCst);
    }

    pub fn in_progress(&self) -> bool {
        self.active.load(Ordering::SeqCst) != 0
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

/// Handle held by one running search
#[derive(Debug)]
pub struct SearchTicket {
    controller: Arc<SearchController>,
    generation: u64,
}

impl SearchTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a newer search or a cancel has replaced this one
    pub fn is_superseded(&self) -> bool {
        self.controller.generation() != self.generation
    }
}

impl Drop for SearchTicket {
    fn drop(&mut self) {
        // Only the running generation may mark the controller idle
        let _ = self.controller.active.compare_exchange(
            self.generation,
            0,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }
}

/// Run a search on the blocking pool so the caller's loop keeps going.
///
/// Any search started earlier through `controller` is superseded and stops
/// at its next step.
pub fn spawn_search(
    controller: &Arc<SearchController>,
    catalog: Arc<TypeCatalog>,
    config: SearchConfig,
    root: TypeId,
    query: String,
) -> JoinHandle<SearchOutcome> {
    let ticket = controller.begin();
    tokio::task::spawn_blocking(move || {
        let search = PathSearch::new(&catalog, &config);
        search.search_with(root, &query, config.max_depth, Some(&ticket))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_search_supersedes_older() {
        let controller = Arc::new(SearchController::new());
        let first = controller.begin();
        assert!(controller.in_progress());
        assert!(!first.is_superseded());

        let second = controller.begin();
        assert!(first.is_superseded());
        assert!(!second.is_superseded());

        // The stale ticket finishing must not clear the flag
        drop(first);
        assert!(controller.in_progress());
        drop(second);
        assert!(!controller.in_progress());
    }

    #[test]
    fn test_cancel() {
        let controller = Arc::new(SearchController::new());
        let ticket = controller.begin();
        controller.cancel();
        assert!(ticket.is_superseded());
        assert!(!controller.in_progress());
    }

    #[test]
    fn test_stale_ticket_cannot_clear_newer_search() {
        let controller = Arc::new(SearchController::new());
        let stale = controller.begin();
        let generation = stale.generation();

        // A newer search starts after the stale one has finished its work
        // but before its ticket is released
        let fresh = controller.begin();
        assert!(stale.is_superseded());
        drop(stale);
        assert!(controller.in_progress());
        assert_eq!(controller.active.load(Ordering::SeqCst), generation + 1);

        drop(fresh);
        assert!(!controller.in_progress());
    }

    #[test]
    fn test_tickets_released_across_threads() {
        let controller = Arc::new(SearchController::new());
        for _ in 0..200 {
            let stale = controller.begin();
            let releaser = std::thread::spawn(move || drop(stale));
            let fresh = controller.begin();
            releaser.join().unwrap();
            assert!(controller.in_progress());
            drop(fresh);
            assert!(!controller.in_progress());
        }
    }
}

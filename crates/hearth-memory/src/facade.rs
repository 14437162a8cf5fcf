//! [`MemoryFacade`] – the shared access point to agent memory.
//!
//! One facade is built per process and handed to every tool adapter, so all
//! of them observe the same [`PersistentStore`] without bootstrapping it
//! repeatedly.  [`LazyMemory`] defers that construction until the first
//! caller actually needs memory.
//!
//! # Example
//!
//! ```rust
//! use hearth_memory::MemoryFacade;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let memory = MemoryFacade::open(dir.path()).unwrap();
//!
//! memory.save_memory("buy milk", &["errands"]).unwrap();
//! let ctx = memory.get_context().unwrap();
//! assert_eq!(ctx.recent_long_term, vec!["buy milk".to_string()]);
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use hearth_types::{
    DEFAULT_CONTEXT_WINDOW, DocumentKind, LongTermEntry, MemoryContext, WriteMode,
};
use tracing::info;

use crate::search::lexical_search;
use crate::store::{PersistentStore, StoreError};

/// Aggregation and convenience layer over a [`PersistentStore`].
pub struct MemoryFacade {
    store: PersistentStore,
    /// Number of recent long-term entries folded into a context.
    window: usize,
}

impl MemoryFacade {
    /// Open (bootstrapping if necessary) the store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self::new(PersistentStore::open(dir)?))
    }

    pub fn new(store: PersistentStore) -> Self {
        Self {
            store,
            window: DEFAULT_CONTEXT_WINDOW,
        }
    }

    /// Override the recent-entry window (default 5).
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn store(&self) -> &PersistentStore {
        &self.store
    }

    /// Snapshot identity, user facts and the most recent long-term entries.
    ///
    /// Failing to read either document is an error, not an empty context.
    pub fn get_context(&self) -> Result<MemoryContext, StoreError> {
        let identity = self.store.read_identity()?;
        let user_facts = self.store.read_user_facts()?;
        let recent_long_term = self
            .store
            .query_recent_long_term(self.window)?
            .into_iter()
            .map(|e| e.content)
            .collect();
        Ok(MemoryContext {
            identity,
            user_facts,
            recent_long_term,
        })
    }

    /// Append a long-term entry.  The assigned id is not surfaced.
    pub fn save_memory<S: AsRef<str>>(&self, content: &str, tags: &[S]) -> Result<(), StoreError> {
        self.store.append_long_term_entry(content, tags).map(|_| ())
    }

    /// Rewrite the soul or user document.
    pub fn update_document(
        &self,
        kind: DocumentKind,
        content: &str,
        mode: WriteMode,
    ) -> Result<(), StoreError> {
        self.store.write_document(kind, content, mode)
    }

    /// Lexical search over the context window only.
    ///
    /// Entries older than the window are never considered; use
    /// [`search_history`][Self::search_history] to scan the whole log.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        let context = self.get_context()?;
        Ok(lexical_search(context.recent_long_term, query, limit))
    }

    /// Lexical search across the entire long-term log.
    pub fn search_history(&self, query: &str, limit: usize) -> Result<Vec<LongTermEntry>, StoreError> {
        self.store.search_long_term(query, limit)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// LazyMemory
// ─────────────────────────────────────────────────────────────────────────────

/// Lazily constructed, process-lifetime [`MemoryFacade`].
///
/// The first successful [`get`][LazyMemory::get] bootstraps the store; later
/// calls hand out the same instance.  A failed bootstrap leaves the slot empty
/// so the next call retries.
pub struct LazyMemory {
    dir: PathBuf,
    window: usize,
    slot: Mutex<Option<Arc<MemoryFacade>>>,
}

impl LazyMemory {
    pub fn new(dir: impl Into<PathBuf>, window: usize) -> Self {
        Self {
            dir: dir.into(),
            window,
            slot: Mutex::new(None),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn get(&self) -> Result<Arc<MemoryFacade>, StoreError> {
        let mut slot = self.slot.lock().map_err(|_| StoreError::Unavailable)?;
        if let Some(facade) = slot.as_ref() {
            return Ok(Arc::clone(facade));
        }
        let facade = Arc::new(MemoryFacade::open(&self.dir)?.with_window(self.window));
        info!(dir = %self.dir.display(), window = self.window, "memory initialised");
        *slot = Some(Arc::clone(&facade));
        Ok(facade)
    }

    pub fn is_initialized(&self) -> bool {
        self.slot.lock().map(|s| s.is_some()).unwrap_or(false)
    }
}

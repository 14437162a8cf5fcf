//! Persistent Store.
//!
//! Owns every on-disk memory resource inside the global configuration
//! directory and is the only component that writes to them:
//!
//! | file        | contents                                            |
//! |-------------|-----------------------------------------------------|
//! | `soul.md`   | identity document (agent persona), free text        |
//! | `user.md`   | user-facts document, free text                      |
//! | `memory.db` | SQLite database holding the long-term entry log     |
//!
//! # Storage layout
//!
//! A single table `memory_entries` is created (if it does not already exist)
//! together with the index `idx_timestamp`:
//!
//! | column    | type     | description                                   |
//! |-----------|----------|-----------------------------------------------|
//! | id        | INTEGER  | auto-increment primary key                    |
//! | content   | TEXT     | entry text (required)                         |
//! | timestamp | DATETIME | UTC insertion time, `YYYY-MM-DD HH:MM:SS.sss` |
//! | tags      | TEXT     | comma-joined tag list, NULL when untagged     |
//! | metadata  | TEXT     | JSON-encoded opaque payload, nullable         |
//!
//! Document writes replace the whole file through a temporary file and a
//! rename, so readers observe either the old or the new content.  Concurrent
//! document writers race and the last rename wins.
//!
//! # Example
//!
//! ```rust
//! use hearth_memory::store::PersistentStore;
//! use hearth_types::WriteMode;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let store = PersistentStore::open(dir.path()).unwrap();
//!
//! store.write_identity("I am Ada.", WriteMode::Replace).unwrap();
//! let id = store.append_long_term_entry("User prefers tea", &["drinks"]).unwrap();
//!
//! let recent = store.query_recent_long_term(5).unwrap();
//! assert_eq!(recent[0].id, id);
//! ```

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use hearth_types::{DocumentKind, LongTermEntry, WriteMode};
use rusqlite::{Connection, TransactionBehavior, params};
use thiserror::Error;
use tracing::{debug, info};

use crate::search;

/// Default persona written to `soul.md` on first run.
pub const SOUL_TEMPLATE: &str = "# SOUL.md - Who You Are

_You're not a chatbot. You're becoming someone._

## Core Truths
- Be genuinely helpful, not performatively helpful.
- Have opinions.
- Be resourceful before asking.
- Earn trust through competence.
- Remember you're a guest.

## Vibe
Concise when needed, thorough when it matters. Not a corporate drone.";

/// Default user profile written to `user.md` on first run.
pub const USER_TEMPLATE: &str = "# USER.md - About Your Human

- **Name:**
- **What to call them:**
- **Timezone:**

## Context
(Update this as you learn about your human.)";

/// File name of the long-term memory database.
pub const DATABASE_FILE: &str = "memory.db";

const TAG_DELIMITER: char = ',';
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// ─────────────────────────────────────────────────────────────────────────────
// Error type
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can arise from persistent store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A default resource could not be created at construction time.
    #[error("Failed to bootstrap {path}: {source}")]
    Bootstrap {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The database could not be opened or its schema created.
    #[error("Failed to initialise memory database: {0}")]
    Schema(#[source] rusqlite::Error),
    /// A read or write of a text document failed after bootstrap.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("SQLite error: {0}")]
    Storage(#[from] rusqlite::Error),
    /// The database handle was poisoned by a panicking writer.
    #[error("Memory database handle is unavailable")]
    Unavailable,
    #[error("Tag must not contain '{TAG_DELIMITER}': {0:?}")]
    InvalidTag(String),
    #[error("Metadata serialization error: {0}")]
    Metadata(#[from] serde_json::Error),
}

impl StoreError {
    /// `true` for failures that happen while constructing the store.
    pub fn is_bootstrap(&self) -> bool {
        matches!(self, StoreError::Bootstrap { .. } | StoreError::Schema(_))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PersistentStore
// ─────────────────────────────────────────────────────────────────────────────

/// File- and SQLite-backed owner of identity, user facts and long-term memory.
pub struct PersistentStore {
    dir: PathBuf,
    soul_path: PathBuf,
    user_path: PathBuf,
    conn: Mutex<Connection>,
}

impl PersistentStore {
    /// Open the store rooted at `dir`, bootstrapping any missing resource.
    ///
    /// Creates `dir` (with parents), seeds `soul.md` and `user.md` with their
    /// templates when absent, and opens `memory.db` in WAL mode with an
    /// idempotent schema.  Existing files are never overwritten.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Bootstrap {
            path: dir.clone(),
            source,
        })?;

        let soul_path = dir.join(DocumentKind::Soul.file_name());
        let user_path = dir.join(DocumentKind::User.file_name());
        seed_file(&soul_path, SOUL_TEMPLATE)?;
        seed_file(&user_path, USER_TEMPLATE)?;

        let conn = open_database(&dir.join(DATABASE_FILE))?;

        Ok(Self {
            dir,
            soul_path,
            user_path,
            conn: Mutex::new(conn),
        })
    }

    /// The global configuration directory this store is rooted at.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `kind`.
    pub fn document_path(&self, kind: DocumentKind) -> &Path {
        match kind {
            DocumentKind::Soul => &self.soul_path,
            DocumentKind::User => &self.user_path,
        }
    }

    // ── Text documents ───────────────────────────────────────────────────────

    /// Return the current contents of `kind` verbatim.
    pub fn read_document(&self, kind: DocumentKind) -> Result<String, StoreError> {
        let path = self.document_path(kind);
        fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Rewrite `kind` according to `mode`.
    ///
    /// [`WriteMode::Append`] joins the existing content and `text` with a
    /// blank line.  Both modes rewrite the whole file.
    pub fn write_document(
        &self,
        kind: DocumentKind,
        text: &str,
        mode: WriteMode,
    ) -> Result<(), StoreError> {
        let contents = match mode {
            WriteMode::Replace => text.to_string(),
            WriteMode::Append => format!("{}\n\n{}", self.read_document(kind)?, text),
        };
        let path = self.document_path(kind);
        replace_file(&self.dir, path, &contents).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(document = %kind, ?mode, bytes = contents.len(), "document written");
        Ok(())
    }

    pub fn read_identity(&self) -> Result<String, StoreError> {
        self.read_document(DocumentKind::Soul)
    }

    pub fn write_identity(&self, text: &str, mode: WriteMode) -> Result<(), StoreError> {
        self.write_document(DocumentKind::Soul, text, mode)
    }

    pub fn read_user_facts(&self) -> Result<String, StoreError> {
        self.read_document(DocumentKind::User)
    }

    pub fn write_user_facts(&self, text: &str, mode: WriteMode) -> Result<(), StoreError> {
        self.write_document(DocumentKind::User, text, mode)
    }

    // ── Long-term log ────────────────────────────────────────────────────────

    /// Append an entry without metadata and return its assigned id.
    pub fn append_long_term_entry<S: AsRef<str>>(
        &self,
        content: &str,
        tags: &[S],
    ) -> Result<i64, StoreError> {
        self.append_long_term_entry_with_metadata(content, tags, None)
    }

    /// Append an entry carrying an opaque `metadata` payload.
    ///
    /// Tags are trimmed, blanks dropped and duplicates removed keeping the
    /// first occurrence.  A tag containing `,` is rejected with
    /// [`StoreError::InvalidTag`].
    pub fn append_long_term_entry_with_metadata<S: AsRef<str>>(
        &self,
        content: &str,
        tags: &[S],
        metadata: Option<&serde_json::Value>,
    ) -> Result<i64, StoreError> {
        let tags = normalize_tags(tags)?;
        let joined = (!tags.is_empty()).then(|| tags.join(","));
        let metadata = metadata.map(serde_json::to_string).transpose()?;

        let mut conn = self.lock()?;
        // IMMEDIATE takes the write lock up front, so the newest timestamp
        // cannot change between the read and the insert, even across
        // connections.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let newest: Option<String> =
            tx.query_row("SELECT MAX(timestamp) FROM memory_entries", [], |row| row.get(0))?;
        let timestamp = next_timestamp(newest.as_deref().and_then(parse_timestamp), Utc::now())
            .format(TIMESTAMP_FORMAT)
            .to_string();
        tx.execute(
            "INSERT INTO memory_entries (content, timestamp, tags, metadata)
             VALUES (?1, ?2, ?3, ?4)",
            params![content, timestamp, joined, metadata],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        debug!(id, tags = ?tags, "long-term entry appended");
        Ok(id)
    }

    /// Return up to `limit` entries, most recent first.
    ///
    /// Ties on the timestamp are broken by descending id.  An empty log (or a
    /// `limit` of zero) yields an empty vector.
    pub fn query_recent_long_term(&self, limit: usize) -> Result<Vec<LongTermEntry>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, content, timestamp, tags, metadata
             FROM memory_entries
             ORDER BY timestamp DESC, id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], row_to_entry)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::Storage)
    }

    /// Case-insensitive substring search across the whole log, most recent
    /// first, truncated to `limit`.
    pub fn search_long_term(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<LongTermEntry>, StoreError> {
        if limit == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let needle = query.to_lowercase();
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, content, timestamp, tags, metadata
             FROM memory_entries
             ORDER BY timestamp DESC, id DESC",
        )?;
        let mut found = Vec::new();
        for row in stmt.query_map([], row_to_entry)? {
            let entry = row?;
            if search::contains_folded(&entry.content, &needle) {
                found.push(entry);
                if found.len() == limit {
                    break;
                }
            }
        }
        Ok(found)
    }

    /// Number of entries in the long-term log.
    pub fn count_long_term(&self) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM memory_entries", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Unavailable)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Bootstrap helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Create `path` with `template` unless it already exists.
fn seed_file(path: &Path, template: &str) -> Result<(), StoreError> {
    let created = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .and_then(|mut f| f.write_all(template.as_bytes()).map(|()| true));
    match created {
        Ok(_) => {
            info!(path = %path.display(), "created default memory document");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(source) => Err(StoreError::Bootstrap {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn open_database(path: &Path) -> Result<Connection, StoreError> {
    let conn = Connection::open(path).map_err(StoreError::Schema)?;
    conn.busy_timeout(BUSY_TIMEOUT).map_err(StoreError::Schema)?;
    let mode: String = conn
        .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
        .map_err(StoreError::Schema)?;
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS memory_entries (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            content   TEXT NOT NULL,
            timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
            tags      TEXT,
            metadata  TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_timestamp ON memory_entries(timestamp);",
    )
    .map_err(StoreError::Schema)?;
    debug!(path = %path.display(), journal_mode = %mode, "memory database ready");
    Ok(conn)
}

/// Write `contents` to a sibling temp file and rename it over `path`.
fn replace_file(dir: &Path, path: &Path, contents: &str) -> io::Result<()> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Row mapping
// ─────────────────────────────────────────────────────────────────────────────

fn normalize_tags<S: AsRef<str>>(tags: &[S]) -> Result<Vec<String>, StoreError> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.as_ref().trim();
        if tag.is_empty() {
            continue;
        }
        if tag.contains(TAG_DELIMITER) {
            return Err(StoreError::InvalidTag(tag.to_string()));
        }
        if !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    Ok(out)
}

fn split_tags(raw: Option<String>) -> Vec<String> {
    raw.map(|s| {
        s.split(TAG_DELIMITER)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Parse both the store's own format and SQLite's `CURRENT_TIMESTAMP`.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .map(|naive| naive.and_utc())
        .ok()
        .or_else(|| raw.parse::<DateTime<Utc>>().ok())
}

/// Timestamps never decrease, even if the wall clock steps backwards.
fn next_timestamp(newest: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    newest.map_or(now, |newest| newest.max(now))
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<LongTermEntry> {
    let id: i64 = row.get(0)?;
    let content: String = row.get(1)?;
    let ts_str: String = row.get(2)?;
    let tags: Option<String> = row.get(3)?;
    let metadata: Option<String> = row.get(4)?;

    let created_at = parse_timestamp(&ts_str).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(2, ts_str.clone(), rusqlite::types::Type::Text)
    })?;
    let metadata = metadata
        .map(|raw| serde_json::from_str(&raw))
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e)))?;

    Ok(LongTermEntry {
        id,
        content,
        created_at,
        tags: split_tags(tags),
        metadata,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NO_TAGS: &[&str] = &[];

    fn make_store() -> (tempfile::TempDir, PersistentStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = PersistentStore::open(dir.path()).unwrap();
        (dir, store)
    }

    // ── bootstrap ────────────────────────────────────────────────────────────

    #[test]
    fn open_seeds_templates_and_database() {
        let (dir, store) = make_store();
        assert_eq!(store.read_identity().unwrap(), SOUL_TEMPLATE);
        assert_eq!(store.read_user_facts().unwrap(), USER_TEMPLATE);
        assert!(dir.path().join(DATABASE_FILE).exists());
    }

    #[test]
    fn open_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join(".hearth");
        let store = PersistentStore::open(&nested).unwrap();
        assert!(nested.join("soul.md").exists());
        assert_eq!(store.dir(), nested.as_path());
    }

    #[test]
    fn reopening_preserves_existing_documents_and_entries() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = PersistentStore::open(dir.path()).unwrap();
            store.write_identity("custom soul", WriteMode::Replace).unwrap();
            store.write_user_facts("custom user", WriteMode::Replace).unwrap();
            store.append_long_term_entry("kept", NO_TAGS).unwrap();
        }
        let store = PersistentStore::open(dir.path()).unwrap();
        assert_eq!(store.read_identity().unwrap(), "custom soul");
        assert_eq!(store.read_user_facts().unwrap(), "custom user");
        assert_eq!(store.count_long_term().unwrap(), 1);
    }

    #[test]
    fn open_fails_when_directory_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "x").unwrap();
        let err = PersistentStore::open(&blocker).err().unwrap();
        assert!(err.is_bootstrap(), "unexpected error: {err}");
    }

    #[test]
    fn database_runs_in_wal_mode() {
        let (_dir, store) = make_store();
        let conn = store.lock().unwrap();
        let mode: String = conn.query_row("PRAGMA journal_mode", [], |r| r.get(0)).unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    // ── documents ────────────────────────────────────────────────────────────

    #[test]
    fn replace_then_read_returns_exact_text() {
        let (_dir, store) = make_store();
        store.write_identity("X", WriteMode::Replace).unwrap();
        assert_eq!(store.read_identity().unwrap(), "X");
    }

    #[test]
    fn append_joins_with_blank_line() {
        let (_dir, store) = make_store();
        store.write_identity("X", WriteMode::Replace).unwrap();
        store.write_identity("Y", WriteMode::Append).unwrap();
        assert_eq!(store.read_identity().unwrap(), "X\n\nY");
    }

    #[test]
    fn documents_are_independent() {
        let (_dir, store) = make_store();
        store.write_user_facts("Name: Sam", WriteMode::Replace).unwrap();
        assert_eq!(store.read_user_facts().unwrap(), "Name: Sam");
        assert_eq!(store.read_identity().unwrap(), SOUL_TEMPLATE);
    }

    #[test]
    fn replace_leaves_no_temp_files_behind() {
        let (dir, store) = make_store();
        store.write_identity("one", WriteMode::Replace).unwrap();
        store.write_identity("two", WriteMode::Append).unwrap();
        let mut names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| !n.starts_with("memory.db"))
            .collect();
        names.sort();
        assert_eq!(names, vec!["soul.md".to_string(), "user.md".to_string()]);
    }

    #[test]
    fn read_of_deleted_document_is_io_error() {
        let (dir, store) = make_store();
        fs::remove_file(dir.path().join("user.md")).unwrap();
        let err = store.read_user_facts().unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    // ── long-term log ────────────────────────────────────────────────────────

    #[test]
    fn empty_log_query_returns_empty_vec() {
        let (_dir, store) = make_store();
        assert!(store.query_recent_long_term(5).unwrap().is_empty());
    }

    #[test]
    fn append_assigns_increasing_ids() {
        let (_dir, store) = make_store();
        let a = store.append_long_term_entry("a", NO_TAGS).unwrap();
        let b = store.append_long_term_entry("b", NO_TAGS).unwrap();
        assert!(b > a);
    }

    #[test]
    fn query_is_most_recent_first_and_bounded() {
        let (_dir, store) = make_store();
        for i in 0..8 {
            store.append_long_term_entry(&format!("entry {i}"), NO_TAGS).unwrap();
        }
        let recent = store.query_recent_long_term(3).unwrap();
        let contents: Vec<&str> = recent.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["entry 7", "entry 6", "entry 5"]);
    }

    #[test]
    fn query_never_returns_unknown_entries() {
        let (_dir, store) = make_store();
        let ids: Vec<i64> = (0..4)
            .map(|i| store.append_long_term_entry(&format!("m{i}"), NO_TAGS).unwrap())
            .collect();
        let recent = store.query_recent_long_term(10).unwrap();
        assert_eq!(recent.len(), 4);
        assert!(recent.iter().all(|e| ids.contains(&e.id)));
    }

    #[test]
    fn query_with_zero_limit_is_empty() {
        let (_dir, store) = make_store();
        store.append_long_term_entry("x", NO_TAGS).unwrap();
        assert!(store.query_recent_long_term(0).unwrap().is_empty());
    }

    #[test]
    fn ties_on_timestamp_break_by_id_descending() {
        let (_dir, store) = make_store();
        {
            let conn = store.lock().unwrap();
            conn.execute_batch(
                "INSERT INTO memory_entries (content, timestamp) VALUES ('first', '2026-01-01 10:00:00');
                 INSERT INTO memory_entries (content, timestamp) VALUES ('second', '2026-01-01 10:00:00');",
            )
            .unwrap();
        }
        let recent = store.query_recent_long_term(2).unwrap();
        assert_eq!(recent[0].content, "second");
        assert_eq!(recent[1].content, "first");
    }

    #[test]
    fn legacy_default_timestamp_rows_parse() {
        let (_dir, store) = make_store();
        {
            let conn = store.lock().unwrap();
            conn.execute("INSERT INTO memory_entries (content) VALUES ('legacy')", [])
                .unwrap();
        }
        let recent = store.query_recent_long_term(1).unwrap();
        assert_eq!(recent[0].content, "legacy");
        assert!(recent[0].tags.is_empty());
        assert!(recent[0].metadata.is_none());
    }

    #[test]
    fn tags_are_normalized_and_round_trip_in_order() {
        let (_dir, store) = make_store();
        store
            .append_long_term_entry("tagged", &[" food ", "", "drinks", "food"])
            .unwrap();
        let entry = &store.query_recent_long_term(1).unwrap()[0];
        assert_eq!(entry.tags, vec!["food".to_string(), "drinks".to_string()]);
    }

    #[test]
    fn tag_with_delimiter_is_rejected() {
        let (_dir, store) = make_store();
        let err = store.append_long_term_entry("x", &["a,b"]).unwrap_err();
        assert!(matches!(err, StoreError::InvalidTag(_)));
        assert_eq!(store.count_long_term().unwrap(), 0);
    }

    #[test]
    fn metadata_round_trips() {
        let (_dir, store) = make_store();
        let meta = json!({ "source": "chat", "turn": 4 });
        store
            .append_long_term_entry_with_metadata("with meta", NO_TAGS, Some(&meta))
            .unwrap();
        let entry = &store.query_recent_long_term(1).unwrap()[0];
        assert_eq!(entry.metadata.as_ref(), Some(&meta));
    }

    #[test]
    fn full_log_search_reaches_past_context_window() {
        let (_dir, store) = make_store();
        store.append_long_term_entry("old milk note", NO_TAGS).unwrap();
        for i in 0..10 {
            store.append_long_term_entry(&format!("filler {i}"), NO_TAGS).unwrap();
        }
        let hits = store.search_long_term("MILK", 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content, "old milk note");
    }

    #[test]
    fn full_log_search_truncates_and_keeps_recency() {
        let (_dir, store) = make_store();
        for i in 0..4 {
            store.append_long_term_entry(&format!("tea {i}"), NO_TAGS).unwrap();
        }
        let hits = store.search_long_term("tea", 2).unwrap();
        let contents: Vec<&str> = hits.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["tea 3", "tea 2"]);
        assert!(store.search_long_term("  ", 5).unwrap().is_empty());
    }

    // ── concurrency and ordering ─────────────────────────────────────────────

    const THREADS: usize = 8;
    const PER_THREAD: usize = 25;

    fn expected_contents() -> Vec<String> {
        let mut all: Vec<String> = (0..THREADS)
            .flat_map(|t| (0..PER_THREAD).map(move |i| format!("t{t} e{i}")))
            .collect();
        all.sort();
        all
    }

    fn assert_log_complete(store: &PersistentStore, ids: &[i64]) {
        let total = THREADS * PER_THREAD;
        assert_eq!(store.count_long_term().unwrap(), total);

        let unique: std::collections::HashSet<i64> = ids.iter().copied().collect();
        assert_eq!(unique.len(), total);

        let recent = store.query_recent_long_term(total).unwrap();
        assert!(recent.windows(2).all(|w| w[0].id > w[1].id));
        let mut contents: Vec<String> = recent.into_iter().map(|e| e.content).collect();
        contents.sort();
        assert_eq!(contents, expected_contents());
    }

    #[test]
    fn concurrent_appends_are_all_visible() {
        let (_dir, store) = make_store();
        let ids: Vec<i64> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|t| {
                    let store = &store;
                    s.spawn(move || {
                        (0..PER_THREAD)
                            .map(|i| {
                                store
                                    .append_long_term_entry(&format!("t{t} e{i}"), NO_TAGS)
                                    .unwrap()
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
        });
        assert_log_complete(&store, &ids);
    }

    #[test]
    fn concurrent_appends_through_two_connections() {
        let dir = tempfile::tempdir().unwrap();
        let stores = [
            PersistentStore::open(dir.path()).unwrap(),
            PersistentStore::open(dir.path()).unwrap(),
        ];
        let ids: Vec<i64> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|t| {
                    let store = &stores[t % 2];
                    s.spawn(move || {
                        (0..PER_THREAD)
                            .map(|i| {
                                store
                                    .append_long_term_entry(&format!("t{t} e{i}"), NO_TAGS)
                                    .unwrap()
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
        });
        assert_log_complete(&stores[0], &ids);
        assert_eq!(stores[1].count_long_term().unwrap(), THREADS * PER_THREAD);
    }

    #[test]
    fn clock_stepping_back_keeps_newest_entry_first() {
        let (_dir, store) = make_store();
        {
            let conn = store.lock().unwrap();
            conn.execute(
                "INSERT INTO memory_entries (content, timestamp) VALUES ('ahead', '2999-01-01 00:00:00.000')",
                [],
            )
            .unwrap();
        }
        let id = store.append_long_term_entry("after", NO_TAGS).unwrap();

        let recent = store.query_recent_long_term(2).unwrap();
        assert_eq!(recent[0].id, id);
        assert_eq!(recent[0].content, "after");
        assert!(recent[0].created_at >= recent[1].created_at);
    }

    #[test]
    fn next_timestamp_never_goes_backwards() {
        let now = Utc::now();
        let later = now + chrono::Duration::seconds(5);
        assert_eq!(next_timestamp(None, now), now);
        assert_eq!(next_timestamp(Some(later), now), later);
        assert_eq!(next_timestamp(Some(now), later), later);
    }
}

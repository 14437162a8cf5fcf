//! The heartbeat task file (`heartbeat.md`).
//!
//! Line-oriented UTF-8 text.  A line is *active* when, after trimming, it is
//! non-empty and does not start with [`COMMENT_MARKER`].  A file with no
//! active lines opts out of proactive turns.  This module only ever creates
//! the file; it never edits it afterwards.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

/// File name of the task file inside the global configuration directory.
pub const TASK_FILE: &str = "heartbeat.md";

/// Leading marker of a comment line.
pub const COMMENT_MARKER: char = '#';

/// Seed written on first run.  Comment-only, so it is inactive.
pub const TASK_FILE_TEMPLATE: &str = "\
# Keep this file empty (or comments only) to skip heartbeat checks.
# Add tasks below when you want the agent to check something periodically.
";

/// Errors that can arise from task file access.
#[derive(Error, Debug)]
pub enum TaskFileError {
    #[error("Failed to bootstrap task file {path}: {source}")]
    Bootstrap {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to read task file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Iterate over the active lines of `content`, trimmed.
pub fn active_lines(content: &str) -> impl Iterator<Item = &str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(COMMENT_MARKER))
}

pub fn has_active_lines(content: &str) -> bool {
    active_lines(content).next().is_some()
}

/// Handle on `heartbeat.md`.
#[derive(Debug, Clone)]
pub struct TaskFile {
    path: PathBuf,
}

impl TaskFile {
    /// Locate the task file in `dir`, creating `dir` and seeding the file
    /// with [`TASK_FILE_TEMPLATE`] if either is missing.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, TaskFileError> {
        let dir = dir.as_ref();
        let path = dir.join(TASK_FILE);
        let bootstrap = |source: io::Error| TaskFileError::Bootstrap {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(dir).map_err(bootstrap)?;

        let created = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .and_then(|mut f| f.write_all(TASK_FILE_TEMPLATE.as_bytes()));
        match created {
            Ok(()) => info!(path = %path.display(), "created heartbeat task file"),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(bootstrap(e)),
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw file contents.
    pub fn read(&self) -> Result<String, TaskFileError> {
        fs::read_to_string(&self.path).map_err(|source| TaskFileError::Read {
            path: self.path.clone(),
            source,
        })
    }

    /// The trimmed file contents when at least one line is active.
    pub fn pending(&self) -> Result<Option<String>, TaskFileError> {
        let content = self.read()?;
        let trimmed = content.trim();
        Ok(has_active_lines(trimmed).then(|| trimmed.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_is_inactive() {
        assert!(!has_active_lines(TASK_FILE_TEMPLATE));
        assert_eq!(TASK_FILE_TEMPLATE.lines().count(), 2);
    }

    #[test]
    fn comments_and_blanks_are_inactive() {
        assert!(!has_active_lines("# note\n\n"));
        assert!(!has_active_lines("   \n\t\n  # indented comment\n"));
        assert!(!has_active_lines(""));
    }

    #[test]
    fn task_lines_are_active() {
        let content = "# note\nping the user\n\n  water plants  \n";
        let lines: Vec<&str> = active_lines(content).collect();
        assert_eq!(lines, vec!["ping the user", "water plants"]);
    }

    #[test]
    fn open_seeds_template_once() {
        let dir = tempfile::tempdir().unwrap();
        let file = TaskFile::open(dir.path()).unwrap();
        assert_eq!(file.read().unwrap(), TASK_FILE_TEMPLATE);

        fs::write(file.path(), "my task").unwrap();
        let again = TaskFile::open(dir.path()).unwrap();
        assert_eq!(again.read().unwrap(), "my task");
    }

    #[test]
    fn open_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("x").join("y");
        let file = TaskFile::open(&nested).unwrap();
        assert!(file.path().exists());
    }

    #[test]
    fn pending_returns_trimmed_content_when_active() {
        let dir = tempfile::tempdir().unwrap();
        let file = TaskFile::open(dir.path()).unwrap();
        assert_eq!(file.pending().unwrap(), None);

        fs::write(file.path(), "\n# note\nping the user\n\n").unwrap();
        assert_eq!(file.pending().unwrap().as_deref(), Some("# note\nping the user"));
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = TaskFile::open(dir.path()).unwrap();
        fs::remove_file(file.path()).unwrap();
        assert!(matches!(file.pending(), Err(TaskFileError::Read { .. })));
    }
}

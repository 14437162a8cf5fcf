//! `hearth-types` – shared vocabulary of the hearth memory core.
//!
//! Every other crate in the workspace speaks in these types: the persistent
//! store hands out [`LongTermEntry`] records, the facade aggregates them into a
//! [`MemoryContext`], tool adapters exchange [`ManageMemoryRequest`] /
//! [`SearchMemoryRequest`] payloads, and the heartbeat scheduler emits
//! [`ProactivePrompt`]s.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Default number of long-term entries folded into a [`MemoryContext`].
pub const DEFAULT_CONTEXT_WINDOW: usize = 5;

/// Default result count for lexical memory search.
pub const DEFAULT_SEARCH_LIMIT: usize = 5;

// ─────────────────────────────────────────────────────────────────────────────
// Documents
// ─────────────────────────────────────────────────────────────────────────────

/// The two whole-file text documents owned by the persistent store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// The agent's persona ("soul").
    Soul,
    /// Accumulated facts about the human user.
    User,
}

impl DocumentKind {
    /// File name of the document inside the global configuration directory.
    pub fn file_name(self) -> &'static str {
        match self {
            DocumentKind::Soul => "soul.md",
            DocumentKind::User => "user.md",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Soul => write!(f, "soul"),
            DocumentKind::User => write!(f, "user"),
        }
    }
}

/// How a document write combines with the existing content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Overwrite the whole document.
    Replace,
    /// Concatenate after the existing content, separated by a blank line.
    Append,
}

/// Error returned when parsing one of the string-keyed enums fails.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {what}: {value:?}")]
pub struct ParseKindError {
    what: &'static str,
    value: String,
}

impl FromStr for DocumentKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "soul" => Ok(DocumentKind::Soul),
            "user" => Ok(DocumentKind::User),
            other => Err(ParseKindError {
                what: "document",
                value: other.to_string(),
            }),
        }
    }
}

impl FromStr for WriteMode {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(WriteMode::Replace),
            "append" => Ok(WriteMode::Append),
            other => Err(ParseKindError {
                what: "write mode",
                value: other.to_string(),
            }),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Long-term memory
// ─────────────────────────────────────────────────────────────────────────────

/// A single append-only long-term memory record.
///
/// `id` and `created_at` are assigned by the store, never by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongTermEntry {
    pub id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Ordered, duplicate-free tag list.
    pub tags: Vec<String>,
    /// Opaque structured payload supplied at append time.
    pub metadata: Option<serde_json::Value>,
}

/// Read-only projection of identity, user facts and the most recent
/// long-term entries (most recent first).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MemoryContext {
    pub identity: String,
    pub user_facts: String,
    pub recent_long_term: Vec<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool-facing contract
// ─────────────────────────────────────────────────────────────────────────────

/// Memory area addressed by a "manage memory" request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    Soul,
    User,
    LongTerm,
}

impl MemoryKind {
    /// The whole-file document this kind maps to, if any.
    pub fn document(self) -> Option<DocumentKind> {
        match self {
            MemoryKind::Soul => Some(DocumentKind::Soul),
            MemoryKind::User => Some(DocumentKind::User),
            MemoryKind::LongTerm => None,
        }
    }
}

/// Operation requested by a "manage memory" call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryOperation {
    Append,
    Replace,
    /// Only meaningful for [`MemoryKind::LongTerm`].
    AddEntry,
}

/// Arguments of the "manage memory" tool.
///
/// Deserializes from `{ "type": "soul", "operation": "append", "content": "…" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManageMemoryRequest {
    #[serde(rename = "type")]
    pub kind: MemoryKind,
    pub operation: MemoryOperation,
    pub content: String,
}

/// Arguments of the "search memory" tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMemoryRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// Result of a "manage memory" call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub success: bool,
    /// Human-readable summary shown to the user.
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolOutcome {
    pub fn ok(summary: impl Into<String>) -> Self {
        Self {
            success: true,
            summary: summary.into(),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            success: false,
            summary: format!("Error updating agent memory: {error}"),
            error: Some(error),
        }
    }
}

/// Result of a "search memory" call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub success: bool,
    pub results: Vec<String>,
    pub count: usize,
    /// Human-readable summary shown to the user.
    #[serde(skip)]
    pub display: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Heartbeat
// ─────────────────────────────────────────────────────────────────────────────

/// A proactive-turn request raised by the heartbeat scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProactivePrompt {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    /// Trimmed content of the task file that triggered the turn.
    pub payload: String,
    /// Agent-facing instruction built from `payload`.
    pub prompt: String,
}

impl ProactivePrompt {
    /// Wrap `payload` in a fresh prompt with the standard heartbeat framing.
    pub fn new(payload: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            payload: payload.to_string(),
            prompt: render_heartbeat_prompt(payload),
        }
    }
}

/// Render the agent-facing instruction for a set of heartbeat tasks.
pub fn render_heartbeat_prompt(tasks: &str) -> String {
    format!(
        "[HEARTBEAT] The following tasks are scheduled in heartbeat.md:\n\n\
         {tasks}\n\n\
         Please analyze and perform any necessary actions. If a task is \
         completed, suggest removing it from heartbeat.md or inform the user."
    )
}

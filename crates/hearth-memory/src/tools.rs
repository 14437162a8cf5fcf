//! Tool-facing memory contract.
//!
//! Tool adapters deserialize the model's arguments into
//! [`ManageMemoryRequest`] / [`SearchMemoryRequest`] and call the functions
//! here.  Store failures never escape as errors: they come back as an outcome
//! with `success: false` and a readable summary for the model.

use hearth_types::{
    DEFAULT_SEARCH_LIMIT, ManageMemoryRequest, MemoryOperation, SearchMemoryRequest, SearchOutcome,
    ToolOutcome, WriteMode,
};
use tracing::warn;

use crate::facade::MemoryFacade;

/// Tool name of the "manage memory" operation.
pub const MANAGE_MEMORY_TOOL: &str = "manage_agent_memory";
/// Tool name of the "search memory" operation.
pub const SEARCH_MEMORY_TOOL: &str = "search_agent_memory";

/// Apply a "manage memory" request.
///
/// `long_term` appends an entry whatever the operation.  The soul and user
/// documents accept `append` and `replace`; `add_entry` is refused for them.
pub fn manage_memory(memory: &MemoryFacade, request: &ManageMemoryRequest) -> ToolOutcome {
    let Some(document) = request.kind.document() else {
        return match memory.save_memory::<&str>(&request.content, &[]) {
            Ok(()) => ToolOutcome::ok("Saved to long-term memory"),
            Err(e) => {
                warn!(tool = MANAGE_MEMORY_TOOL, error = %e, "long-term save failed");
                ToolOutcome::failed(e.to_string())
            }
        };
    };

    let mode = match request.operation {
        MemoryOperation::Append => WriteMode::Append,
        MemoryOperation::Replace => WriteMode::Replace,
        MemoryOperation::AddEntry => {
            return ToolOutcome::failed(format!(
                "add_entry is only valid for long_term, not {document}"
            ));
        }
    };

    match memory.update_document(document, &request.content, mode) {
        Ok(()) => ToolOutcome::ok(format!("Updated {}", document.file_name())),
        Err(e) => {
            warn!(tool = MANAGE_MEMORY_TOOL, %document, error = %e, "document update failed");
            ToolOutcome::failed(e.to_string())
        }
    }
}

/// Apply a "search memory" request against the context window.
pub fn search_memory(memory: &MemoryFacade, request: &SearchMemoryRequest) -> SearchOutcome {
    let limit = request.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    match memory.search(&request.query, limit) {
        Ok(results) => {
            let count = results.len();
            SearchOutcome {
                success: true,
                results,
                count,
                display: format!("Found {count} memories matching \"{}\".", request.query),
            }
        }
        Err(e) => {
            warn!(tool = SEARCH_MEMORY_TOOL, error = %e, "memory search failed");
            SearchOutcome {
                success: false,
                results: Vec::new(),
                count: 0,
                display: format!("Error searching agent memory: {e}"),
            }
        }
    }
}

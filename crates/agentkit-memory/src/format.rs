//! Rendering working memory into system instructions.

use crate::types::WorkingMemory;

/// Starting structure suggested to the model for its working memory.
pub const DEFAULT_TEMPLATE: &str = "# Working Memory

## User Preferences
- [List user preferences here]

## Important Facts
- [List important facts to remember]

## Context
- [List relevant context]";

/// Wrap `memory` in a `<working-memory>` block with its last update time.
pub fn format_working_memory(memory: &WorkingMemory) -> String {
    format!(
        "<working-memory>\n{}\n</working-memory>\n\nLast updated: {}",
        memory.content.trim(),
        memory.updated_at.to_rfc3339()
    )
}

/// Guidance telling the model how to maintain its working memory with the
/// update tool, following `template`.
pub fn working_memory_instructions(template: &str) -> String {
    format!(
        "You have access to a working memory system that persists across conversations.\n\
         Use the {} tool to save important information about the user,\n\
         their preferences, or context that should be remembered.\n\n\
         Template structure:\n{}",
        crate::tool::UPDATE_WORKING_MEMORY_TOOL,
        template.trim()
    )
}

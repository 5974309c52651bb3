//! Working memory wired into an agent: an instructions resolver that injects
//! the current document and a tool the model uses to rewrite it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use agentkit_core::{tool::Tool, Instructions};

use crate::{
    format::{format_working_memory, working_memory_instructions},
    store::MemoryStore,
    types::MemoryScope,
};

pub const UPDATE_WORKING_MEMORY_TOOL: &str = "update_working_memory";

/// Instructions that append the working memory for `scope` (when one exists)
/// to `base` on every turn.
pub fn memory_instructions(
    base: impl Into<String>,
    store: Arc<dyn MemoryStore>,
    scope: MemoryScope,
) -> Instructions {
    build_instructions(base.into(), store, scope, None)
}

/// Like `memory_instructions`, and also tells the model how to keep the
/// document current with the update tool, following `template`.
pub fn memory_instructions_with_guide(
    base: impl Into<String>,
    store: Arc<dyn MemoryStore>,
    scope: MemoryScope,
    template: &str,
) -> Instructions {
    build_instructions(base.into(), store, scope, Some(working_memory_instructions(template)))
}

fn build_instructions(
    base: String,
    store: Arc<dyn MemoryStore>,
    scope: MemoryScope,
    guide: Option<String>,
) -> Instructions {
    Instructions::dynamic(move |ctx| {
        let store = Arc::clone(&store);
        let mut sections = vec![base.clone()];
        if let Some(guide) = &guide {
            sections.push(guide.clone());
        }
        async move {
            if let Some(memory) = store.working_memory(scope, &ctx).await? {
                sections.push(format_working_memory(&memory));
            }
            Ok(sections
                .into_iter()
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("\n\n"))
        }
    })
}

#[derive(Debug, Deserialize)]
struct UpdateArgs {
    content: String,
}

#[derive(Debug, Serialize)]
struct UpdateOutcome {
    success: bool,
    scope: MemoryScope,
}

/// A tool that replaces the working memory for `scope` with the model's
/// `content` argument.
pub fn update_working_memory_tool(store: Arc<dyn MemoryStore>, scope: MemoryScope) -> Tool {
    Tool::typed(
        UPDATE_WORKING_MEMORY_TOOL,
        "Replace the working memory with an updated markdown document. \
         Include everything that should still be remembered.",
        json!({
            "type": "object",
            "properties": {
                "content": {
                    "type": "string",
                    "description": "The complete updated working memory"
                }
            },
            "required": ["content"],
            "additionalProperties": false
        }),
        move |args: UpdateArgs, ctx, _meta| {
            let store = Arc::clone(&store);
            async move {
                store
                    .update_working_memory(scope, &ctx, &args.content)
                    .await?;
                Ok(UpdateOutcome {
                    success: true,
                    scope,
                })
            }
        },
    )
}

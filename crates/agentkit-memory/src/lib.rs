//! # agentkit-memory
//!
//! Persistent context for agents.
//!
//! - Working memory: a markdown document per chat or per user that the
//!   model reads in its system instructions and rewrites with
//!   `update_working_memory`.
//! - Message history and chat sessions, for applications that keep
//!   transcripts.
//!
//! `MemoryStore` is the storage seam; `InMemoryStore` keeps everything in
//! process.
//!
//! ```rust,ignore
//! let store: Arc<dyn MemoryStore> = Arc::new(InMemoryStore::new());
//! let agent = Agent::builder("Assistant", engine)
//!     .instructions(memory_instructions("You are helpful.", Arc::clone(&store), MemoryScope::Chat))
//!     .tool(update_working_memory_tool(store, MemoryScope::Chat))
//!     .build()?;
//! ```

pub mod format;
pub mod store;
pub mod tool;
pub mod types;

pub use format::{format_working_memory, working_memory_instructions, DEFAULT_TEMPLATE};
pub use store::{InMemoryStore, MemoryStore};
pub use tool::{
    memory_instructions, memory_instructions_with_guide, update_working_memory_tool,
    UPDATE_WORKING_MEMORY_TOOL,
};
pub use types::{ChatSession, ConversationMessage, MemoryScope, MemoryStats, WorkingMemory};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use agentkit_contracts::{agent::RunContext, message::Role};
    use agentkit_core::{
        engine::{ChatResponse, ScriptedModel},
        tool::ToolCallMeta,
        Agent, GenerateOptions, ToolLoopEngine,
    };

    use super::*;

    fn chat(id: &str) -> RunContext {
        RunContext::new().with_chat_id(id)
    }

    // ── 1. scope keys ─────────────────────────────────────────────────────────

    #[test]
    fn scope_keys_fall_back_when_ids_are_missing() {
        let ctx = RunContext::new();
        assert_eq!(MemoryScope::Chat.key(&ctx), "chat:default");
        assert_eq!(MemoryScope::User.key(&ctx), "user:anonymous");

        let ctx = ctx.with_chat_id("c-1").with_user_id("u-1");
        assert_eq!(MemoryScope::Chat.key(&ctx), "chat:c-1");
        assert_eq!(MemoryScope::User.key(&ctx), "user:u-1");
    }

    // ── 2. working memory ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn working_memory_is_isolated_per_scope_key() {
        let store = InMemoryStore::new();
        store
            .update_working_memory(MemoryScope::Chat, &chat("a"), "- likes tea")
            .await
            .unwrap();

        let a = store.working_memory(MemoryScope::Chat, &chat("a")).await.unwrap();
        let b = store.working_memory(MemoryScope::Chat, &chat("b")).await.unwrap();
        let user = store.working_memory(MemoryScope::User, &chat("a")).await.unwrap();

        assert_eq!(a.unwrap().content, "- likes tea");
        assert!(b.is_none());
        assert!(user.is_none());
    }

    #[test]
    fn formatting_wraps_content_and_timestamp() {
        let memory = WorkingMemory {
            content: "- prefers Celsius\n".to_string(),
            updated_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        };

        assert_eq!(
            format_working_memory(&memory),
            "<working-memory>\n- prefers Celsius\n</working-memory>\n\nLast updated: 2024-05-01T12:00:00+00:00"
        );
    }

    #[test]
    fn guide_mentions_the_tool_and_template() {
        let guide = working_memory_instructions(DEFAULT_TEMPLATE);
        assert!(guide.contains(UPDATE_WORKING_MEMORY_TOOL));
        assert!(guide.ends_with("- [List relevant context]"));
    }

    // ── 3. history and sessions ───────────────────────────────────────────────

    #[tokio::test]
    async fn messages_return_the_most_recent_in_order() {
        let store = InMemoryStore::new();
        for text in ["one", "two", "three"] {
            store
                .save_message(ConversationMessage::new("c", Role::User, text))
                .await
                .unwrap();
        }

        let last_two: Vec<String> = store
            .messages("c", Some(2))
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(last_two, vec!["two", "three"]);
        assert_eq!(store.messages("c", None).await.unwrap().len(), 3);
        assert_eq!(store.messages("c", Some(10)).await.unwrap().len(), 3);
        assert!(store.messages("other", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn chats_filter_by_user_and_track_messages() {
        let store = InMemoryStore::new();
        store.save_chat(ChatSession::new("c-1").with_user_id("ada")).await.unwrap();
        store.save_chat(ChatSession::new("c-2").with_user_id("bob")).await.unwrap();
        store
            .save_message(ConversationMessage::new("c-1", Role::User, "hi").with_user_id("ada"))
            .await
            .unwrap();

        let ada = store.chats(Some("ada")).await.unwrap();
        assert_eq!(ada.len(), 1);
        assert_eq!(ada[0].message_count, 1);
        assert_eq!(store.chats(None).await.unwrap().len(), 2);

        store.update_chat_title("c-1", "Weather talk").await.unwrap();
        store.update_chat_title("missing", "ignored").await.unwrap();
        assert_eq!(
            store.chat("c-1").await.unwrap().unwrap().title.as_deref(),
            Some("Weather talk")
        );
        assert!(store.chat("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stats_and_clear() {
        let store = InMemoryStore::new();
        store
            .update_working_memory(MemoryScope::User, &RunContext::new(), "x")
            .await
            .unwrap();
        store
            .save_message(ConversationMessage::new("c", Role::Assistant, "y"))
            .await
            .unwrap();
        store.save_chat(ChatSession::new("c")).await.unwrap();

        assert_eq!(
            store.stats().unwrap(),
            MemoryStats {
                working_memory_count: 1,
                message_count: 1,
                chat_count: 1
            }
        );

        store.clear().unwrap();
        assert_eq!(store.stats().unwrap(), MemoryStats::default());
    }

    // ── 4. agent wiring ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn instructions_inject_memory_only_when_present() {
        let store: Arc<dyn MemoryStore> = Arc::new(InMemoryStore::new());
        let instructions = memory_instructions("You are helpful.", Arc::clone(&store), MemoryScope::Chat);
        let ctx = chat("c-9");

        assert_eq!(instructions.resolve(&ctx).await.unwrap(), "You are helpful.");

        store
            .update_working_memory(MemoryScope::Chat, &ctx, "- name: Ada")
            .await
            .unwrap();
        let resolved = instructions.resolve(&ctx).await.unwrap();

        assert!(resolved.starts_with("You are helpful.\n\n<working-memory>\n- name: Ada\n</working-memory>"));
    }

    #[tokio::test]
    async fn update_tool_writes_the_scoped_document() {
        let store: Arc<dyn MemoryStore> = Arc::new(InMemoryStore::new());
        let tool = update_working_memory_tool(Arc::clone(&store), MemoryScope::User);
        let ctx = RunContext::new().with_user_id("ada");

        let result = tool
            .invoke(json!({ "content": "- allergic to nuts" }), &ctx, ToolCallMeta::default())
            .await
            .unwrap();

        assert_eq!(result, json!({ "success": true, "scope": "user" }));
        let memory = store.working_memory(MemoryScope::User, &ctx).await.unwrap();
        assert_eq!(memory.unwrap().content, "- allergic to nuts");
    }

    #[tokio::test]
    async fn agent_learns_then_recalls_on_the_next_turn() {
        let store: Arc<dyn MemoryStore> = Arc::new(InMemoryStore::new());
        let model = Arc::new(ScriptedModel::new([
            ChatResponse::tool_call(UPDATE_WORKING_MEMORY_TOOL, json!({ "content": "- prefers Celsius" })),
            ChatResponse::text("Noted."),
            ChatResponse::text("It is 22°C."),
        ]));
        let agent = Agent::builder("Assistant", Arc::new(ToolLoopEngine::new(Arc::clone(&model))))
            .instructions(memory_instructions_with_guide(
                "You are a weather assistant.",
                Arc::clone(&store),
                MemoryScope::Chat,
                DEFAULT_TEMPLATE,
            ))
            .tool(update_working_memory_tool(Arc::clone(&store), MemoryScope::Chat))
            .build()
            .unwrap();
        let ctx = chat("c-1");

        agent
            .generate(GenerateOptions::new("I prefer Celsius").with_context(ctx.clone()))
            .await
            .unwrap();
        agent
            .generate(GenerateOptions::new("Weather in Oslo?").with_context(ctx))
            .await
            .unwrap();

        let requests = model.requests();
        assert!(!requests[0].system_message().unwrap().contains("<working-memory>"));
        assert!(requests[2]
            .system_message()
            .unwrap()
            .contains("<working-memory>\n- prefers Celsius\n</working-memory>"));
    }
}

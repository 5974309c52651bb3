//! The `MemoryStore` seam and its in-process implementation.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use agentkit_contracts::{
    agent::RunContext,
    error::{ToolkitError, ToolkitResult},
};

use crate::types::{ChatSession, ConversationMessage, MemoryScope, MemoryStats, WorkingMemory};

/// Storage for working memory, message history, and chat sessions.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// The working-memory document for `scope` under `ctx`, if any.
    async fn working_memory(
        &self,
        scope: MemoryScope,
        ctx: &RunContext,
    ) -> ToolkitResult<Option<WorkingMemory>>;

    /// Replace the working-memory document for `scope` under `ctx`.
    async fn update_working_memory(
        &self,
        scope: MemoryScope,
        ctx: &RunContext,
        content: &str,
    ) -> ToolkitResult<()>;

    async fn save_message(&self, message: ConversationMessage) -> ToolkitResult<()>;

    /// The most recent `limit` messages of a chat, oldest first. `None`
    /// returns the whole history.
    async fn messages(
        &self,
        chat_id: &str,
        limit: Option<usize>,
    ) -> ToolkitResult<Vec<ConversationMessage>>;

    /// Insert or replace a chat session.
    async fn save_chat(&self, chat: ChatSession) -> ToolkitResult<()>;

    /// All sessions, or only those owned by `user_id`.
    async fn chats(&self, user_id: Option<&str>) -> ToolkitResult<Vec<ChatSession>>;

    async fn chat(&self, chat_id: &str) -> ToolkitResult<Option<ChatSession>>;

    /// Set a session's title. Unknown chats are left untouched.
    async fn update_chat_title(&self, chat_id: &str, title: &str) -> ToolkitResult<()>;
}

#[derive(Default)]
struct MemoryState {
    working: HashMap<String, WorkingMemory>,
    messages: HashMap<String, Vec<ConversationMessage>>,
    chats: BTreeMap<String, ChatSession>,
}

/// Process-local store. Share it between agents with `Arc`.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> ToolkitResult<MemoryStats> {
        let state = self.lock()?;
        Ok(MemoryStats {
            working_memory_count: state.working.len(),
            message_count: state.messages.values().map(Vec::len).sum(),
            chat_count: state.chats.len(),
        })
    }

    /// Drop every stored record.
    pub fn clear(&self) -> ToolkitResult<()> {
        let mut state = self.lock()?;
        state.working.clear();
        state.messages.clear();
        state.chats.clear();
        Ok(())
    }

    fn lock(&self) -> ToolkitResult<MutexGuard<'_, MemoryState>> {
        self.state.lock().map_err(|_| ToolkitError::Storage {
            reason: "memory store lock poisoned".to_string(),
        })
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn working_memory(
        &self,
        scope: MemoryScope,
        ctx: &RunContext,
    ) -> ToolkitResult<Option<WorkingMemory>> {
        Ok(self.lock()?.working.get(&scope.key(ctx)).cloned())
    }

    async fn update_working_memory(
        &self,
        scope: MemoryScope,
        ctx: &RunContext,
        content: &str,
    ) -> ToolkitResult<()> {
        let key = scope.key(ctx);
        debug!(key = %key, bytes = content.len(), "working memory updated");
        self.lock()?.working.insert(
            key,
            WorkingMemory {
                content: content.to_string(),
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn save_message(&self, message: ConversationMessage) -> ToolkitResult<()> {
        let mut state = self.lock()?;
        if let Some(chat) = state.chats.get_mut(&message.chat_id) {
            chat.message_count += 1;
            chat.updated_at = message.timestamp;
        }
        state
            .messages
            .entry(message.chat_id.clone())
            .or_default()
            .push(message);
        Ok(())
    }

    async fn messages(
        &self,
        chat_id: &str,
        limit: Option<usize>,
    ) -> ToolkitResult<Vec<ConversationMessage>> {
        let state = self.lock()?;
        let history = state.messages.get(chat_id).map(Vec::as_slice).unwrap_or(&[]);
        let start = limit.map_or(0, |n| history.len().saturating_sub(n));
        Ok(history[start..].to_vec())
    }

    async fn save_chat(&self, chat: ChatSession) -> ToolkitResult<()> {
        self.lock()?.chats.insert(chat.chat_id.clone(), chat);
        Ok(())
    }

    async fn chats(&self, user_id: Option<&str>) -> ToolkitResult<Vec<ChatSession>> {
        let state = self.lock()?;
        Ok(state
            .chats
            .values()
            .filter(|chat| user_id.is_none() || chat.user_id.as_deref() == user_id)
            .cloned()
            .collect())
    }

    async fn chat(&self, chat_id: &str) -> ToolkitResult<Option<ChatSession>> {
        Ok(self.lock()?.chats.get(chat_id).cloned())
    }

    async fn update_chat_title(&self, chat_id: &str, title: &str) -> ToolkitResult<()> {
        if let Some(chat) = self.lock()?.chats.get_mut(chat_id) {
            chat.title = Some(title.to_string());
            chat.updated_at = Utc::now();
        }
        Ok(())
    }
}

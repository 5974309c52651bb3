//! Memory records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agentkit_contracts::{agent::RunContext, message::Role};

/// Which identity a working-memory document is attached to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryScope {
    /// One document per conversation.
    #[default]
    Chat,
    /// One document per end user, shared by all their conversations.
    User,
}

impl MemoryScope {
    /// Storage key for `ctx`: `chat:{chat_id}` or `user:{user_id}`, with
    /// `default` / `anonymous` standing in for a missing id.
    pub fn key(self, ctx: &RunContext) -> String {
        match self {
            Self::Chat => format!("chat:{}", ctx.chat_id.as_deref().unwrap_or("default")),
            Self::User => format!("user:{}", ctx.user_id.as_deref().unwrap_or("anonymous")),
        }
    }
}

impl fmt::Display for MemoryScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chat => f.write_str("chat"),
            Self::User => f.write_str("user"),
        }
    }
}

/// Persistent facts the agent has learned, as free-form markdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingMemory {
    pub content: String,
    pub updated_at: DateTime<Utc>,
}

/// One message of a stored conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub chat_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationMessage {
    pub fn new(chat_id: impl Into<String>, role: Role, content: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            user_id: None,
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// Metadata for one conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub chat_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: usize,
}

impl ChatSession {
    pub fn new(chat_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            chat_id: chat_id.into(),
            user_id: None,
            title: None,
            created_at: now,
            updated_at: now,
            message_count: 0,
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Entry counts of an `InMemoryStore`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemoryStats {
    pub working_memory_count: usize,
    pub message_count: usize,
    pub chat_count: usize,
}

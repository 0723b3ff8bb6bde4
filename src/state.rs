//! UI-agnostic conversation state types
//!
//! These are shared between the terminal UI and the one-shot CLI commands
//! and don't depend on any specific UI framework.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::persona::Persona;

/// A chat message in the conversation log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety: Option<Safety>,
    #[serde(default, rename = "isError", skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// Safety label the backend attaches to a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Safety {
    Safe,
    Unsafe,
    /// Any other label, including the backend's own "Unknown" fallback
    #[serde(other)]
    Unknown,
}

/// One entry of `conversation_history` as sent to the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: ChatRole,
    pub content: String,
}

/// Current UTC time in the same shape a browser's `toISOString` produces.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            timestamp: now_timestamp(),
            safety: None,
            is_error: false,
        }
    }

    pub fn assistant(content: impl Into<String>, safety: Option<Safety>, timestamp: String) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            timestamp,
            safety,
            is_error: false,
        }
    }

    /// Assistant-role entry explaining a failed send.
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            timestamp: now_timestamp(),
            safety: None,
            is_error: true,
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == ChatRole::User
    }

    /// Local wall-clock time of the message as `HH:MM`, if the timestamp parses.
    pub fn short_time(&self) -> Option<String> {
        if let Ok(at) = chrono::DateTime::parse_from_rfc3339(&self.timestamp) {
            return Some(at.with_timezone(&chrono::Local).format("%H:%M").to_string());
        }
        // Backend timestamps carry no offset
        chrono::NaiveDateTime::parse_from_str(&self.timestamp, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|at| at.format("%H:%M").to_string())
    }
}

/// Projects a log onto the `{role, content}` pairs the backend expects.
pub fn history_of(messages: &[ChatMessage]) -> Vec<HistoryEntry> {
    messages
        .iter()
        .map(|msg| HistoryEntry {
            role: msg.role,
            content: msg.content.clone(),
        })
        .collect()
}

/// Everything the presentation layer renders for one conversation.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub messages: Vec<ChatMessage>,
    pub pending_input: String,
    pub is_loading: bool,
    pub last_error: Option<String>,
    pub backend_ready: bool,
    pub persona: Persona,
}

//! Session event types

use serde::Serialize;

use crate::state::ChatMessage;

/// Events emitted as session state changes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A fresh conversation became active
    ConversationCreated { conversation_id: String },

    /// A stored conversation became active and its messages replaced the view
    ConversationLoaded {
        conversation_id: String,
        message_count: usize,
    },

    /// The active conversation was adopted from a chat response
    ConversationAdopted { conversation_id: String },

    /// No conversation is active any more
    ConversationCleared,

    /// A turn was appended to the active conversation
    MessageAppended { message: ChatMessage },

    /// An optimistic user turn was removed after the gateway rejected it
    MessageRolledBack { message_id: String },

    /// The conversation catalog was replaced
    CatalogRefreshed { count: usize },

    /// A completion arrived after the view moved on and was dropped
    CompletionDiscarded { operation: &'static str },

    /// An operation failed
    Error { message: String },
}

impl SessionEvent {
    /// Check if this event reports a failure
    pub fn is_error(&self) -> bool {
        matches!(self, SessionEvent::Error { .. })
    }
}

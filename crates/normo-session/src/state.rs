//! Conversation state: active conversation, messages, catalog and status.

use chrono::{DateTime, NaiveDateTime, Utc};
use normo_api::{ChatResponse, ConversationListItem, ConversationMessage, Role, SourceCitation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

/// A single turn as shown to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub content: String,
    pub role: Role,
    pub timestamp: DateTime<Utc>,
    /// Sources used for an assistant answer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<SourceCitation>>,
    /// Query-classification attributes (country, state, legal domain, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
}

impl ChatMessage {
    /// Create a user turn stamped with the current time
    pub fn user(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            role: Role::User,
            timestamp: Utc::now(),
            citations: None,
            metadata: None,
        }
    }

    /// Create an assistant turn from a chat response
    pub fn from_reply(id: impl Into<String>, response: &ChatResponse) -> Self {
        Self {
            id: id.into(),
            content: response.message.content.clone(),
            role: Role::Assistant,
            timestamp: parse_timestamp(&response.message.timestamp).unwrap_or_else(Utc::now),
            citations: response.source_citations.clone(),
            metadata: None,
        }
    }

    /// Map a stored turn of `conversation_id` at position `index`.
    ///
    /// Missing fields are defaulted: role to user, content to empty, timestamp to
    /// now, citations and metadata to empty collections.
    pub fn from_stored(conversation_id: &str, index: usize, message: &ConversationMessage) -> Self {
        Self {
            id: format!("{}-{}", conversation_id, index),
            content: message.content.clone().unwrap_or_default(),
            role: message.role.unwrap_or_default(),
            timestamp: message
                .timestamp
                .as_deref()
                .and_then(parse_timestamp)
                .unwrap_or_else(Utc::now),
            citations: Some(message.source_citations.clone().unwrap_or_default()),
            metadata: Some(message.meta_data.clone().unwrap_or_default()),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }

    /// Citations attached to this turn, empty if none
    pub fn citations(&self) -> &[SourceCitation] {
        self.citations.as_deref().unwrap_or_default()
    }
}

/// Parse a gateway timestamp.
///
/// Accepts RFC 3339 and naive ISO-8601 values (interpreted as UTC).
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Read-only snapshot of the session
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConversationState {
    /// Active conversation, if any
    pub current_conversation_id: Option<String>,
    /// Catalog of known conversations
    pub conversations: Vec<ConversationListItem>,
    /// Messages of the active conversation, oldest first
    pub messages: Vec<ChatMessage>,
    /// Whether a create, switch or send is outstanding
    pub is_loading: bool,
    /// Most recent failure, cleared when the next operation starts
    pub error: Option<String>,
}

impl ConversationState {
    /// The most recent assistant turn
    pub fn last_assistant_message(&self) -> Option<&ChatMessage> {
        self.messages.iter().rev().find(|m| m.is_assistant())
    }

    /// Metadata of the most recent turn that carries any
    pub fn latest_metadata(&self) -> Option<&HashMap<String, String>> {
        self.messages
            .iter()
            .rev()
            .filter_map(|m| m.metadata.as_ref())
            .find(|meta| !meta.is_empty())
    }
}

/// Generates locally unique message ids of the form `<role>-<millis>`.
///
/// The millisecond component is strictly increasing per generator, so two turns
/// created within the same millisecond still get distinct ids.
#[derive(Debug, Default)]
pub struct MessageIds {
    last_ms: AtomicI64,
}

impl MessageIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id for a turn with the given role
    pub fn next(&self, role: Role) -> String {
        let now = Utc::now().timestamp_millis();
        let prev = self
            .last_ms
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |prev| {
                Some(now.max(prev + 1))
            })
            .unwrap_or_else(|prev| prev);
        format!("{}-{}", role.as_str(), now.max(prev + 1))
    }
}

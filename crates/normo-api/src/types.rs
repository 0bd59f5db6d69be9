//! Wire types for the chat gateway

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Assistant,
}

impl Role {
    /// Get the role as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Parse a wire role; anything but `user`/`assistant` is unrecognized
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

/// A reference into a source document used to answer a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCitation {
    pub pdf_name: String,
    pub page: i64,
    pub paragraph: i64,
    pub chunk_id: String,
    pub file_path: String,
    /// Excerpt of the cited passage
    pub relevant_content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculations: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_measurements: Option<Vec<String>>,
}

/// A turn as stored by the gateway. Every field may be missing or null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Empty or unrecognized roles read as absent
    #[serde(default, deserialize_with = "lenient_role")]
    pub role: Option<Role>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_steps: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_citations: Option<Vec<SourceCitation>>,
    /// Null values are dropped; numbers and booleans are kept as text
    #[serde(
        default,
        deserialize_with = "lenient_metadata",
        skip_serializing_if = "Option::is_none"
    )]
    pub meta_data: Option<HashMap<String, String>>,
}

/// Full conversation record returned by `GET /conversations/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub conversation_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub messages: Vec<ConversationMessage>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub updated_at: String,
    /// Free-form server-side context, passed through untouched
    #[serde(default, deserialize_with = "null_as_default")]
    pub context: serde_json::Map<String, serde_json::Value>,
}

/// Catalog entry returned by `GET /conversations`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationListItem {
    pub conversation_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub updated_at: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message_count: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub first_message: String,
}

/// A single turn in a chat request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Body of `POST /chat`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatTurn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub stream: bool,
}

impl ChatRequest {
    /// Build a non-streaming request carrying a single turn
    pub fn single(
        turn: ChatTurn,
        conversation_id: Option<String>,
        user_id: Option<String>,
    ) -> Self {
        Self {
            messages: vec![turn],
            conversation_id,
            user_id,
            stream: false,
        }
    }
}

/// Assistant turn inside a chat response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantReply {
    #[serde(default = "assistant_role")]
    pub role: Role,
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: String,
}

/// Response of `POST /chat`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: AssistantReply,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_citations: Option<Vec<SourceCitation>>,
}

/// Response of `POST /conversations`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedConversation {
    pub conversation_id: String,
}

/// Response of `GET /health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

/// Request and response shape of the legacy `POST /chat/legacy` endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyExchange {
    pub user_query: String,
    pub next_action: String,
    pub steps: Vec<String>,
    pub meta_data: HashMap<String, String>,
    pub pdf_names: Vec<String>,
    pub summary: String,
    pub memory: Vec<serde_json::Value>,
    pub source_citations: Vec<SourceCitation>,
}

impl LegacyExchange {
    /// Initial legacy request for a query, routed to the planner
    pub fn for_query(query: impl Into<String>) -> Self {
        Self {
            user_query: query.into(),
            next_action: "planner".to_string(),
            ..Default::default()
        }
    }
}

fn assistant_role() -> Role {
    Role::Assistant
}

/// Treat an explicit `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_role<'de, D>(deserializer: D) -> Result<Option<Role>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(|v| v.as_str()).and_then(Role::parse))
}

fn lenient_metadata<'de, D>(
    deserializer: D,
) -> Result<Option<HashMap<String, String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<HashMap<String, serde_json::Value>>::deserialize(deserializer)?;
    Ok(raw.map(|entries| {
        entries
            .into_iter()
            .filter_map(|(key, value)| {
                let text = match value {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Number(n) => n.to_string(),
                    serde_json::Value::Bool(b) => b.to_string(),
                    _ => return None,
                };
                Some((key, text))
            })
            .collect()
    }))
}

//! HTTP client for the chat gateway

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::{
    error::{Error, Result},
    types::{
        ChatRequest, ChatResponse, ChatTurn, Conversation, ConversationListItem,
        CreatedConversation, HealthStatus, LegacyExchange,
    },
};

/// Gateway location used when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Environment variable overriding the gateway location
pub const API_URL_ENV: &str = "NORMO_API_URL";

/// Conversation operations the session layer depends on
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Send a single user turn, optionally continuing an existing conversation
    async fn send_message(
        &self,
        turn: ChatTurn,
        conversation_id: Option<&str>,
    ) -> Result<ChatResponse>;

    /// Ask the gateway for a fresh conversation identifier
    async fn create_conversation(&self) -> Result<String>;

    /// Fetch a full conversation record
    async fn get_conversation(&self, conversation_id: &str) -> Result<Conversation>;

    /// Fetch the conversation catalog
    async fn list_conversations(&self) -> Result<Vec<ConversationListItem>>;
}

/// Connection settings for [`HttpGateway`]
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL without a trailing slash
    pub base_url: String,
    /// User the conversations belong to; omitted from requests when unset
    pub user_id: Option<String>,
    /// Request timeout; the transport default applies when unset
    pub timeout: Option<Duration>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_id: None,
            timeout: None,
        }
    }
}

impl GatewayConfig {
    /// Create a config for the given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(&base_url.into()),
            ..Default::default()
        }
    }

    /// Create from the `NORMO_API_URL` environment variable, falling back to the default
    pub fn from_env() -> Self {
        match std::env::var(API_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => Self::new(url),
            _ => Self::default(),
        }
    }

    pub fn with_user_id(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id.filter(|u| !u.is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// reqwest-backed gateway client
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    user_id: Option<String>,
}

impl HttpGateway {
    /// Create a new client from a config
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let base_url = normalize_base_url(&config.base_url);
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(Error::InvalidConfig(format!(
                "gateway URL must start with http:// or https://, got '{}'",
                base_url
            )));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base_url,
            user_id: config.user_id,
        })
    }

    /// Create from environment variable
    pub fn from_env() -> Result<Self> {
        Self::new(GatewayConfig::from_env())
    }

    /// The base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The user id attached to requests, if any
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Query parameters carrying the user id, empty when unset
    fn user_query(&self) -> Vec<(&'static str, &str)> {
        self.user_id
            .as_deref()
            .map(|u| vec![("user_id", u)])
            .unwrap_or_default()
    }

    /// Check that the gateway is up
    pub async fn check_health(&self) -> Result<HealthStatus> {
        let url = self.url("/health");
        tracing::debug!("GET {}", url);
        let response = self.client.get(&url).send().await?;
        decode(response).await
    }

    /// Send a query through the legacy single-shot endpoint
    pub async fn send_legacy(&self, query: &str) -> Result<LegacyExchange> {
        let url = self.url("/chat/legacy");
        tracing::debug!("POST {}", url);
        let request = LegacyExchange::for_query(query);
        let response = self.client.post(&url).json(&request).send().await?;
        decode(response).await
    }

    /// URL under which a cited document can be viewed
    pub fn pdf_url(&self, pdf_name: &str) -> String {
        self.url(&format!("/pdf/{}", urlencoding::encode(pdf_name)))
    }

    /// Download a cited document
    pub async fn fetch_pdf(&self, pdf_name: &str) -> Result<Vec<u8>> {
        let url = self.pdf_url(pdf_name);
        tracing::debug!("GET {}", url);
        let response = ensure_success(self.client.get(&url).send().await?).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl ChatGateway for HttpGateway {
    async fn send_message(
        &self,
        turn: ChatTurn,
        conversation_id: Option<&str>,
    ) -> Result<ChatResponse> {
        let url = self.url("/chat");
        tracing::debug!("POST {} (conversation: {:?})", url, conversation_id);
        let request = ChatRequest::single(
            turn,
            conversation_id.map(str::to_string),
            self.user_id.clone(),
        );
        let response = self.client.post(&url).json(&request).send().await?;
        decode(response).await
    }

    async fn create_conversation(&self) -> Result<String> {
        let url = self.url("/conversations");
        tracing::debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .query(&self.user_query())
            .json(&serde_json::json!({}))
            .send()
            .await?;
        let created: CreatedConversation = decode(response).await?;
        if created.conversation_id.is_empty() {
            return Err(Error::UnexpectedResponse(
                "gateway returned an empty conversation id".to_string(),
            ));
        }
        Ok(created.conversation_id)
    }

    async fn get_conversation(&self, conversation_id: &str) -> Result<Conversation> {
        let url = self.url(&format!(
            "/conversations/{}",
            urlencoding::encode(conversation_id)
        ));
        tracing::debug!("GET {}", url);
        let response = self.client.get(&url).send().await?;
        decode(response).await
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationListItem>> {
        let url = self.url("/conversations");
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .query(&self.user_query())
            .send()
            .await?;
        let value: serde_json::Value = decode(response).await?;
        parse_catalog(value)
    }
}

/// A catalog payload that is not an array is treated as empty
fn parse_catalog(value: serde_json::Value) -> Result<Vec<ConversationListItem>> {
    if value.is_array() {
        Ok(serde_json::from_value(value)?)
    } else {
        tracing::warn!("Conversation list is not an array, treating as empty");
        Ok(vec![])
    }
}

/// Turn non-2xx responses into `Error::Api`
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let message = if text.trim().is_empty() {
        status.canonical_reason().unwrap_or("request failed").to_string()
    } else {
        text
    };
    Err(Error::api(status.as_u16(), message))
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let response = ensure_success(response).await?;
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_trims_trailing_slash() {
        let config = GatewayConfig::new("https://api.example.at/ ");
        assert_eq!(config.base_url, "https://api.example.at");
    }

    #[test]
    fn test_config_drops_empty_user_id() {
        let config = GatewayConfig::default().with_user_id(Some(String::new()));
        assert_eq!(config.user_id, None);
        let config = GatewayConfig::default().with_user_id(Some("alice".into()));
        assert_eq!(config.user_id.as_deref(), Some("alice"));
    }

    #[test]
    fn test_default_base_url() {
        let gateway = HttpGateway::new(GatewayConfig::default()).unwrap();
        assert_eq!(gateway.base_url(), "http://localhost:8000");
        assert_eq!(gateway.user_id(), None);
    }

    #[test]
    fn test_rejects_non_http_url() {
        let err = HttpGateway::new(GatewayConfig::new("localhost:8000")).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_pdf_url_is_encoded() {
        let gateway = HttpGateway::new(GatewayConfig::new("http://localhost:8000/")).unwrap();
        assert_eq!(
            gateway.pdf_url("laws/1_AT_OOE_0_GE_Bauordnung 1994.pdf"),
            "http://localhost:8000/pdf/laws%2F1_AT_OOE_0_GE_Bauordnung%201994.pdf"
        );
    }

    #[test]
    fn test_user_query() {
        let gateway = HttpGateway::new(GatewayConfig::default()).unwrap();
        assert!(gateway.user_query().is_empty());

        let gateway = HttpGateway::new(
            GatewayConfig::default().with_user_id(Some("alice".into())),
        )
        .unwrap();
        assert_eq!(gateway.user_query(), vec![("user_id", "alice")]);
    }

    #[test]
    fn test_parse_catalog_array() {
        let items = parse_catalog(json!([{
            "conversation_id": "c1",
            "created_at": "2024-05-01T10:00:00",
            "updated_at": "2024-05-01T10:05:00",
            "message_count": 2,
            "first_message": "Abstand zur Grundgrenze?"
        }]))
        .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].first_message, "Abstand zur Grundgrenze?");
    }

    #[test]
    fn test_parse_catalog_non_array_is_empty() {
        assert!(parse_catalog(json!({"detail": "oops"})).unwrap().is_empty());
        assert!(parse_catalog(json!(null)).unwrap().is_empty());
    }

    #[test]
    fn test_parse_catalog_bad_item_is_error() {
        let err = parse_catalog(json!([{"message_count": 1}])).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_http_error() {
        // Nothing listens on port 1 locally, so the connection is refused.
        let gateway = HttpGateway::new(GatewayConfig::new("http://127.0.0.1:1")).unwrap();
        let err = gateway.list_conversations().await.unwrap_err();
        assert!(matches!(err, Error::Http(_)));
        assert!(err.is_retryable());
    }
}

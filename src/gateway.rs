use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GatewayError;
use crate::persona::Persona;
use crate::state::{HistoryEntry, Safety};

/// Backend used by release builds.
pub const PRODUCTION_API_URL: &str = "https://nlp-project-06lg.onrender.com/api";

/// Local backend used by development builds.
pub const DEVELOPMENT_API_URL: &str = "http://localhost:8000/api";

pub const REQUEST_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Built-in base URL, fixed at compile time by the build profile.
pub const DEFAULT_API_URL: &str = if cfg!(debug_assertions) {
    DEVELOPMENT_API_URL
} else {
    PRODUCTION_API_URL
};

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    conversation_history: &'a [HistoryEntry],
    #[serde(skip_serializing_if = "Option::is_none")]
    persona: Option<Persona>,
}

/// Successful reply to a chat message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(default)]
    pub safety: Option<Safety>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Reported by `GET /model-status`.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelStatus {
    pub status: String,
    #[serde(default)]
    pub model: serde_json::Value,
}

/// The remote operations the chat session depends on.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send_chat_message(
        &self,
        message: &str,
        history: &[HistoryEntry],
        persona: Persona,
    ) -> Result<ChatReply, GatewayError>;

    /// Ok on any 2xx from the health endpoint.
    async fn health_check(&self) -> Result<(), GatewayError>;
}

#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: &str) -> Result<Self, GatewayError> {
        Self::with_timeout(base_url, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn model_status(&self) -> Result<ModelStatus, GatewayError> {
        let url = self.url("/model-status");
        debug!(%url, "GET");

        let response = self.client.get(&url).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ChatBackend for HttpGateway {
    async fn send_chat_message(
        &self,
        message: &str,
        history: &[HistoryEntry],
        persona: Persona,
    ) -> Result<ChatReply, GatewayError> {
        let url = self.url("/chat");
        let request = ChatRequest {
            message,
            conversation_history: history,
            persona: Some(persona),
        };
        debug!(%url, %persona, history_len = history.len(), "POST");

        let response = self.client.post(&url).json(&request).send().await?;
        let response = check_status(response).await?;

        let reply: ChatReply = response.json().await?;
        debug!(safety = ?reply.safety, chars = reply.response.len(), "chat reply");
        Ok(reply)
    }

    async fn health_check(&self) -> Result<(), GatewayError> {
        let url = self.url("/health");
        debug!(%url, "GET");

        let response = self.client.get(&url).send().await?;
        check_status(response).await?;
        Ok(())
    }
}

/// Turns a non-2xx response into `GatewayError::Server`, keeping the body's
/// `message` field when there is one.
async fn check_status(response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    debug!(%status, "response");
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|body| body.message);

    Err(GatewayError::Server { status, message })
}

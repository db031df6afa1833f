//! REST client for the widget API
//!
//! One method per remote operation, no retry logic; retries are a caller
//! concern. Visitor identity travels in request headers, not message
//! bodies.

use std::collections::HashMap;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use widget_core::constants::{endpoints, headers};
use widget_core::{
    ChatMessage, ChatSession, FeedbackRequest, FeedbackResponse, SdkConfig, StartChatResult,
    WidgetConfig,
};

use crate::error::{ApiError, Result};
use crate::gateway::ChatGateway;

/// Body of a start-chat request. The widget id travels in the path.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartChatRequest {
    pub visitor_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub visitor_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub visitor_email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    #[serde(skip_serializing_if = "HashMap::is_empty", default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ServerErrorBody {
    message: Option<String>,
}

// Lenient recovery payload: the server answers the active-session lookup
// with either a full result or an empty object.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActiveSessionBody {
    session: Option<ChatSession>,
    room_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesBody {
    #[serde(default)]
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AvailabilityBody {
    #[serde(default)]
    is_available: bool,
}

#[derive(Debug, Serialize)]
struct SendMessageBody<'a> {
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct RateSessionBody<'a> {
    rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    feedback: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct HandoffBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
}

/// Stateless request/response wrapper over the widget API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    widget_id: String,
}

impl ApiClient {
    pub fn new(config: &SdkConfig) -> Self {
        let http = Client::builder()
            .default_headers(Self::default_headers())
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: config.api_base_url.clone(),
            widget_id: config.widget_id.clone(),
        }
    }

    fn default_headers() -> HeaderMap {
        let mut header = HeaderMap::new();
        header.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        header
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn visitor_headers(visitor_id: &str, visitor_name: Option<&str>) -> HeaderMap {
        let mut header = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(visitor_id) {
            header.insert(headers::VISITOR_ID, value);
        }
        if let Some(name) = visitor_name {
            if let Ok(value) = HeaderValue::from_str(name) {
                header.insert(headers::VISITOR_NAME, value);
            }
        }
        header
    }

    /// Send a request, enforce the status contract, and hand back the raw
    /// body. Non-2xx becomes `ApiError::Server` carrying the server message
    /// when one is present.
    async fn execute(&self, builder: RequestBuilder) -> Result<String> {
        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ServerErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| format!("request failed with status {}", status.as_u16()));
            return Err(ApiError::Server {
                status: status.as_u16(),
                message,
            });
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(String::new());
        }
        Ok(response.text().await?)
    }

    async fn fetch_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let body = self.execute(builder).await?;
        Ok(serde_json::from_str(&body)?)
    }

    // ==================== Widget API ====================

    pub async fn get_widget_config(&self) -> Result<WidgetConfig> {
        let url = self.url(&endpoints::widget_config(&self.widget_id));
        self.fetch_json(self.http.get(url)).await
    }

    /// Empty contact fields are dropped client-side so the server's
    /// optional-field validation never sees empty strings.
    pub async fn submit_feedback(&self, feedback: FeedbackRequest) -> Result<FeedbackResponse> {
        let url = self.url(&endpoints::submit_feedback(&self.widget_id));
        let body = self
            .execute(self.http.post(url).json(&feedback.normalized()))
            .await?;
        if body.trim().is_empty() {
            return Ok(FeedbackResponse::default());
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Transient/recoverable: any failure collapses to "not available".
    pub async fn check_availability(&self) -> bool {
        let url = self.url(&endpoints::check_availability(&self.widget_id));
        match self.fetch_json::<AvailabilityBody>(self.http.get(url)).await {
            Ok(body) => body.is_available,
            Err(e) => {
                debug!("availability check failed: {e}");
                false
            }
        }
    }

    // ==================== Chat API ====================

    async fn recover_session_inner(&self, visitor_id: &str) -> Result<Option<StartChatResult>> {
        let url = self.url(&endpoints::active_session(&self.widget_id));
        let request = self.http.get(url).query(&[("visitorId", visitor_id)]);

        let body = match self.execute(request).await {
            Ok(body) => body,
            // "No active session" is an answer, not a fault
            Err(ApiError::Server { status: 404, .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        if body.trim().is_empty() {
            return Ok(None);
        }
        let parsed: ActiveSessionBody = serde_json::from_str(&body)?;
        match (parsed.session, parsed.room_id) {
            (Some(session), room_id) => {
                let room_id = room_id.unwrap_or_else(|| session.room_id.clone());
                Ok(Some(StartChatResult { session, room_id }))
            }
            _ => Ok(None),
        }
    }

    async fn start_chat_inner(&self, request: StartChatRequest) -> Result<StartChatResult> {
        let url = self.url(&endpoints::start_chat(&self.widget_id));
        self.fetch_json(self.http.post(url).json(&request)).await
    }

    async fn get_messages_inner(&self, session_id: &str) -> Result<Vec<ChatMessage>> {
        let url = self.url(&endpoints::session_messages(&self.widget_id, session_id));
        let body: MessagesBody = self.fetch_json(self.http.get(url)).await?;
        Ok(body.messages)
    }

    async fn send_message_inner(
        &self,
        session_id: &str,
        content: &str,
        visitor_id: &str,
        visitor_name: Option<&str>,
    ) -> Result<ChatMessage> {
        let url = self.url(&endpoints::session_messages(&self.widget_id, session_id));
        let request = self
            .http
            .post(url)
            .headers(Self::visitor_headers(visitor_id, visitor_name))
            .json(&SendMessageBody { content });
        self.fetch_json(request).await
    }

    async fn rate_session_inner(
        &self,
        session_id: &str,
        rating: u8,
        feedback: Option<&str>,
    ) -> Result<()> {
        let url = self.url(&endpoints::rate_session(&self.widget_id, session_id));
        self.execute(self.http.post(url).json(&RateSessionBody { rating, feedback }))
            .await?;
        Ok(())
    }

    pub async fn request_handoff(&self, session_id: &str, reason: Option<&str>) -> Result<()> {
        let url = self.url(&endpoints::request_handoff(&self.widget_id, session_id));
        self.execute(self.http.post(url).json(&HandoffBody { reason }))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ChatGateway for ApiClient {
    async fn recover_session(&self, visitor_id: &str) -> Result<Option<StartChatResult>> {
        match self.recover_session_inner(visitor_id).await {
            Ok(result) => Ok(result),
            Err(e) => {
                // Distinguishable from "no session" for callers that care
                warn!("session recovery lookup failed: {e}");
                Err(e)
            }
        }
    }

    async fn start_chat(&self, request: StartChatRequest) -> Result<StartChatResult> {
        self.start_chat_inner(request).await
    }

    async fn get_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>> {
        self.get_messages_inner(session_id).await
    }

    async fn send_message(
        &self,
        session_id: &str,
        content: &str,
        visitor_id: &str,
        visitor_name: Option<&str>,
    ) -> Result<ChatMessage> {
        self.send_message_inner(session_id, content, visitor_id, visitor_name)
            .await
    }

    async fn rate_session(
        &self,
        session_id: &str,
        rating: u8,
        feedback: Option<&str>,
    ) -> Result<()> {
        self.rate_session_inner(session_id, rating, feedback).await
    }
}

//! reqwest-backed chat backend

use super::types::{
    CreateSessionRequest, HistoryResponse, SendMessageRequest, SendMessageResponse, SessionGrant,
};
use super::ApiError;
use crate::identity::PlayerId;
use crate::runtime::ChatBackend;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};

/// HTTP client for the `/api/session` and `/api/messages` endpoints
pub struct HttpChatBackend {
    client: Client,
    base_url: Url,
}

impl HttpChatBackend {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::network(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::network(format!("Invalid endpoint {path}: {e}")))
    }

    /// History endpoint with the token as a percent-encoded query parameter
    fn history_url(&self, session_token: &str) -> Result<Url, ApiError> {
        let mut url = self.endpoint("api/messages")?;
        url.query_pairs_mut()
            .append_pair("session_token", session_token);
        Ok(url)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let start = Instant::now();
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::network(format!("Request timeout: {e}"))
            } else if e.is_connect() {
                ApiError::network(format!("Connection failed: {e}"))
            } else {
                ApiError::network(format!("Request failed: {e}"))
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::network(format!("Failed to read response: {e}")))?;

        tracing::debug!(
            endpoint,
            status = status.as_u16(),
            duration_ms = %start.elapsed().as_millis(),
            "Backend request completed"
        );

        if !status.is_success() {
            return Err(ApiError::status(
                status.as_u16(),
                format!("HTTP {status}: {body}"),
            ));
        }

        serde_json::from_str(&body)
            .map_err(|e| ApiError::decode(format!("Failed to parse response: {e} - body: {body}")))
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn create_session(&self, player: &PlayerId) -> Result<SessionGrant, ApiError> {
        let url = self.endpoint("api/session")?;
        let request = self.client.post(url).json(&CreateSessionRequest {
            player: player.as_str(),
        });
        self.execute("session", request).await
    }

    async fn fetch_history(&self, session_token: &str) -> Result<HistoryResponse, ApiError> {
        let url = self.history_url(session_token)?;
        self.execute("history", self.client.get(url)).await
    }

    async fn send_message(
        &self,
        request: &SendMessageRequest,
    ) -> Result<SendMessageResponse, ApiError> {
        let url = self.endpoint("api/messages")?;
        self.execute("send", self.client.post(url).json(request)).await
    }
}

//! Sync API client for the Mindhaven cloud service.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;

use mindhaven_core::errors::RemoteError;
use mindhaven_core::sync::{
    MemoryEntry, MoodEntry, QueuedRequest, RemoteResult, SyncTransport, REMOTE_CALL_TIMEOUT_SECS,
};

use crate::error::{Result, SyncApiError};
use crate::types::{ApiErrorResponse, MemoryEntryPayload, MoodEntryPayload};

const MOOD_ENDPOINT: &str = "/api/v1/mood-entries";
const MEMORY_ENDPOINT: &str = "/api/v1/memories";
const MAX_LOG_BODY_CHARS: usize = 512;

/// Client for the Mindhaven sync API.
///
/// Every request carries the engine-wide per-call timeout so one stalled
/// request cannot stall the whole pass.
#[derive(Debug, Clone)]
pub struct SyncApiClient {
    client: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

impl SyncApiClient {
    /// Create a new sync API client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the API (e.g., "https://api.mindhaven.app")
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REMOTE_CALL_TIMEOUT_SECS))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: None,
        }
    }

    /// Attach the bearer token obtained from the auth collaborator.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Build a client from `MINDHAVEN_API_URL` and, when set,
    /// `MINDHAVEN_API_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("MINDHAVEN_API_URL")
            .ok()
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                SyncApiError::invalid_request(
                    "MINDHAVEN_API_URL not configured. Sync API operations are disabled.",
                )
            })?;
        let mut client = Self::new(&base_url);
        if let Ok(token) = std::env::var("MINDHAVEN_API_TOKEN") {
            if !token.trim().is_empty() {
                client = client.with_token(token.trim().to_string());
            }
        }
        Ok(client)
    }

    /// Create headers for an API request.
    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = &self.access_token {
            let auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| SyncApiError::invalid_request("Invalid access token format"))?;
            headers.insert(AUTHORIZATION, auth_value);
        }

        Ok(headers)
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn log_response(status: reqwest::StatusCode, body: &str) {
        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("API response error ({}): {}", status, preview);
    }

    /// Check a response for success, mapping error bodies into `Api` errors.
    async fn ensure_success(response: reqwest::Response) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            debug!("API response status: {}", status);
            return Ok(());
        }

        let body = response.text().await?;
        Self::log_response(status, &body);
        if let Ok(error) = serde_json::from_str::<ApiErrorResponse>(&body) {
            return Err(SyncApiError::api(
                status.as_u16(),
                format!("{}: {}", error.code, error.message),
            ));
        }
        Err(SyncApiError::api(
            status.as_u16(),
            format!("Request failed: {}", body),
        ))
    }

    /// Write one mood entry.
    ///
    /// POST /api/v1/mood-entries
    pub async fn post_mood(&self, entry: &MoodEntry) -> Result<()> {
        let url = self.endpoint_url(MOOD_ENDPOINT);
        let response = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .json(&MoodEntryPayload::from(entry))
            .send()
            .await?;
        Self::ensure_success(response).await
    }

    /// Write one memory entry.
    ///
    /// POST /api/v1/memories
    pub async fn post_memory(&self, entry: &MemoryEntry) -> Result<()> {
        let url = self.endpoint_url(MEMORY_ENDPOINT);
        let response = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .json(&MemoryEntryPayload::from(entry))
            .send()
            .await?;
        Self::ensure_success(response).await
    }

    /// Replay a queued request verbatim against the API.
    pub async fn send_queued(&self, request: &QueuedRequest) -> Result<()> {
        let method = match request.method.as_str() {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "PATCH" => Method::PATCH,
            "DELETE" => Method::DELETE,
            other => {
                return Err(SyncApiError::invalid_request(format!(
                    "Unsupported method '{}'",
                    other
                )))
            }
        };
        let url = self.endpoint_url(&request.endpoint);
        let mut builder = self.client.request(method, &url).headers(self.headers()?);
        if !request.payload.is_null() {
            builder = builder.json(&request.payload);
        }
        let response = builder.send().await?;
        Self::ensure_success(response).await
    }
}

#[async_trait]
impl SyncTransport for SyncApiClient {
    async fn push_mood(&self, entry: &MoodEntry) -> RemoteResult<()> {
        self.post_mood(entry).await.map_err(RemoteError::from)
    }

    async fn push_memory(&self, entry: &MemoryEntry) -> RemoteResult<()> {
        self.post_memory(entry).await.map_err(RemoteError::from)
    }

    async fn execute_request(&self, request: &QueuedRequest) -> RemoteResult<()> {
        self.send_queued(request).await.map_err(RemoteError::from)
    }
}

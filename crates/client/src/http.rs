//! HTTP remote service.
//!
//! Talks to the extraction/agent backend:
//! - `POST {base}/fileUpload` (multipart `file` + `openai_api_key`)
//! - `POST {base}/agent/message`
//! - `POST {base}/updatePlaceholders`

use std::time::Duration;

use async_trait::async_trait;
use docfill_config::AppConfig;
use docfill_core::credential::CREDENTIAL_KEY;
use docfill_core::error::SyncError;
use docfill_core::placeholder::NamedValue;
use docfill_core::service::*;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// A [`RemoteService`] over HTTP.
pub struct HttpRemoteService {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRemoteService {
    /// Create a client for the service rooted at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, SyncError> {
        Self::new(&config.service.base_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// Map transport errors, then status codes, then decode the body.
    async fn finish<T: DeserializeOwned>(
        sent: Result<reqwest::Response, reqwest::Error>,
        operation: &str,
    ) -> Result<T, SyncError> {
        let response = sent.map_err(transport_error)?;
        let status = response.status().as_u16();

        if status == 401 || status == 403 {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::AuthenticationFailed(error_message(&body, status)));
        }

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status, operation, body = %body, "Remote service returned error");
            return Err(SyncError::ApiError {
                status_code: status,
                message: error_message(&body, status),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| SyncError::InvalidResponse(format!("Failed to parse {operation} response: {e}")))
    }
}

#[async_trait]
impl RemoteService for HttpRemoteService {
    fn name(&self) -> &str {
        "http"
    }

    async fn upload(&self, request: UploadRequest) -> Result<UploadResponse, SyncError> {
        debug!(
            filename = %request.filename,
            bytes = request.bytes.len(),
            content_type = %request.content_type,
            "Uploading document"
        );

        let part = reqwest::multipart::Part::bytes(request.bytes)
            .file_name(request.filename)
            .mime_str(&request.content_type)
            .map_err(|e| SyncError::InvalidResponse(format!("Invalid content type: {e}")))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text(CREDENTIAL_KEY, request.credential);

        let sent = self
            .client
            .post(self.url("fileUpload"))
            .multipart(form)
            .send()
            .await;
        Self::finish(sent, "upload").await
    }

    async fn send_message(&self, request: AgentRequest) -> Result<AgentReply, SyncError> {
        debug!(session = %request.session_id, "Sending agent message");

        let body = serde_json::json!({
            "id": request.session_id.as_str(),
            "message": request.message,
            "openai_api_key": request.credential,
        });

        let sent = self
            .client
            .post(self.url("agent/message"))
            .json(&body)
            .send()
            .await;
        Self::finish(sent, "agent message").await
    }

    async fn update_placeholders(
        &self,
        session: &SessionId,
        updates: Vec<NamedValue>,
    ) -> Result<BulkUpdateAck, SyncError> {
        debug!(session = %session, count = updates.len(), "Sending bulk update");

        let body = serde_json::json!({
            "id": session.as_str(),
            "updates": updates,
        });

        let sent = self
            .client
            .post(self.url("updatePlaceholders"))
            .json(&body)
            .send()
            .await;
        Self::finish(sent, "bulk update").await
    }
}

fn transport_error(e: reqwest::Error) -> SyncError {
    if e.is_timeout() {
        SyncError::Timeout(e.to_string())
    } else {
        SyncError::Network(e.to_string())
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// The `{error}` field of an error body, or the raw body.
fn error_message(body: &str, status: u16) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error,
        Err(_) if body.trim().is_empty() => format!("HTTP {status}"),
        Err(_) => body.to_string(),
    }
}

/// MIME type sent with an upload, from the file extension.
pub fn content_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "docx" => DOCX_MIME,
        "txt" | "md" | "text" => "text/plain",
        _ => "application/octet-stream",
    }
}

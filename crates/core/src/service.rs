//! Remote service trait: the extraction + conversational-agent backend.
//!
//! The service assigns a session id to every uploaded document, names its
//! placeholders, answers chat messages with value updates, and accepts bulk
//! value updates.
//!
//! Implementations: HTTP (`docfill-client`), scripted mocks in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SyncError;
use crate::placeholder::{CanonicalPlaceholder, NamedValue, PlaceholderSpec, UpdateRecord};

/// Identifier of one document session, assigned by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// A locally generated id, for offline sessions and tests.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A document upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub credential: String,
}

/// The service's answer to an upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(rename = "document_id")]
    pub session_id: SessionId,

    #[serde(default)]
    pub filename: String,

    /// Names in occurrence order (sorted by `order` before binding).
    #[serde(default)]
    pub placeholders: Vec<PlaceholderSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A chat message sent to the agent.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    pub session_id: SessionId,
    pub message: String,
    pub credential: String,
}

/// The agent's reply: free text plus zero or more value updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentReply {
    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub updates: Vec<UpdateRecord>,
}

/// Acknowledgement of a bulk update, echoing the stored placeholders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkUpdateAck {
    #[serde(rename = "document_id")]
    pub session_id: SessionId,

    #[serde(default)]
    pub filename: String,

    #[serde(default)]
    pub placeholders: Vec<CanonicalPlaceholder>,
}

impl BulkUpdateAck {
    /// Names the service reports as stored.
    pub fn names(&self) -> Vec<&str> {
        self.placeholders.iter().map(|p| p.name.as_str()).collect()
    }
}

/// The core RemoteService trait.
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// The service name (e.g., "http").
    fn name(&self) -> &str;

    /// Upload a document and receive its session id and placeholder names.
    async fn upload(&self, request: UploadRequest) -> Result<UploadResponse, SyncError>;

    /// Send a chat message and receive the agent's reply.
    async fn send_message(&self, request: AgentRequest) -> Result<AgentReply, SyncError>;

    /// Store committed values remotely.
    async fn update_placeholders(
        &self,
        session_id: &SessionId,
        updates: Vec<NamedValue>,
    ) -> Result<BulkUpdateAck, SyncError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_response_parses_service_payload() {
        let json = r#"{
            "document_id": "2f1c",
            "filename": "nda.docx",
            "placeholders": [
                {"order": 2, "name": "Email", "description": "Contact email"},
                {"order": 1, "name": "Full Name", "description": "Signer"}
            ],
            "message": "File uploaded and processed successfully"
        }"#;
        let resp: UploadResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.session_id, SessionId::from("2f1c"));
        assert_eq!(resp.placeholders.len(), 2);
        assert_eq!(resp.placeholders[1].name, "Full Name");
    }

    #[test]
    fn agent_reply_tolerates_missing_updates() {
        let reply: AgentReply =
            serde_json::from_str(r#"{"message":"Which company?"}"#).unwrap();
        assert!(reply.updates.is_empty());
        assert_eq!(reply.message, "Which company?");
    }

    #[test]
    fn bulk_ack_lists_names() {
        let ack: BulkUpdateAck = serde_json::from_str(
            r#"{"document_id":"a","placeholders":[{"name":"X","description":"","value":"1"}]}"#,
        )
        .unwrap();
        assert_eq!(ack.names(), vec!["X"]);
    }

    #[test]
    fn session_id_converts_from_str() {
        let id: SessionId = "42".into();
        assert_eq!(id.as_str(), "42");
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn generated_session_ids_differ() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }
}

//! Error types for the docfill domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error type; the top-level [`Error`]
//! wraps them so operation boundaries can convert any failure into a
//! user-visible notification.

use thiserror::Error;

/// The top-level error type for all docfill operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Document container ---
    #[error("Malformed document: {0}")]
    Document(#[from] MalformedDocumentError),

    // --- Templating ---
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    // --- Remote service ---
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    // --- Local credential storage ---
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("No document session is active; upload a document first")]
    NoActiveSession,

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// The uploaded bytes could not be parsed as a document container.
///
/// Fatal to the current upload; no partially bound document is ever returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct MalformedDocumentError {
    pub reason: String,
}

impl MalformedDocumentError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// A templating-engine failure while materializing a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("template is not valid UTF-8: {0}")]
    InvalidEncoding(String),
}

/// A remote call (upload, agent message, bulk update) failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("No credential stored; set one before uploading or chatting")]
    MissingCredential,

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Failed to read credential file at {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Failed to write credential file at {path}: {reason}")]
    Write { path: String, reason: String },

    #[error("Credential must not be empty")]
    Empty,
}

/// An update record that named no known placeholder.
///
/// Never surfaced as a failure: the record is dropped and the batch carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("update resolves to no placeholder (name: {name:?}, order: {order:?})")]
pub struct UnresolvedUpdateError {
    pub name: Option<String>,
    pub order: Option<u32>,
}

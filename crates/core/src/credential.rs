//! Credential store trait: one secret string kept on the local machine.
//!
//! The credential is forwarded to the remote service with uploads and chat
//! messages. Its absence blocks both until the user supplies one.

use crate::error::CredentialError;

/// The fixed key the credential is stored under.
pub const CREDENTIAL_KEY: &str = "openai_api_key";

/// Local persistence for the single credential string.
///
/// Implementations: JSON file, in-memory (for testing).
pub trait CredentialStore: Send + Sync {
    /// The store name (e.g., "file", "in_memory").
    fn name(&self) -> &str;

    /// Load the stored credential, if any.
    fn load(&self) -> Result<Option<String>, CredentialError>;

    /// Persist a credential, replacing any previous one.
    fn save(&self, credential: &str) -> Result<(), CredentialError>;

    /// Remove the stored credential.
    fn clear(&self) -> Result<(), CredentialError>;
}

/// Render a credential for display: first 4 characters, then `***`.
pub fn redact(credential: &str) -> String {
    let prefix: String = credential.chars().take(4).collect();
    format!("{prefix}***")
}

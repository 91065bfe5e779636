//! Credential stores.
//!
//! [`FileCredentialStore`] keeps the credential in a small JSON object on
//! disk (`~/.docfill/credentials.json` by default):
//!
//! ```json
//! { "openai_api_key": "sk-..." }
//! ```
//!
//! Other keys in the file are preserved on save.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use docfill_core::credential::{CREDENTIAL_KEY, CredentialStore};
use docfill_core::error::CredentialError;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// A JSON-file credential store.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_object(&self) -> Result<Map<String, Value>, CredentialError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(self.read_error(e)),
        };

        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(self.read_error("expected a JSON object")),
            Err(e) => Err(self.read_error(e)),
        }
    }

    fn write_object(&self, map: &Map<String, Value>) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| self.write_error(e))?;
            }
        }
        let content = serde_json::to_string_pretty(map).map_err(|e| self.write_error(e))?;
        std::fs::write(&self.path, content).map_err(|e| self.write_error(e))?;
        restrict_permissions(&self.path);
        Ok(())
    }

    fn read_error(&self, reason: impl ToString) -> CredentialError {
        CredentialError::Read {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    fn write_error(&self, reason: impl ToString) -> CredentialError {
        CredentialError::Write {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn name(&self) -> &str {
        "file"
    }

    fn load(&self) -> Result<Option<String>, CredentialError> {
        let map = self.read_object()?;
        let credential = map
            .get(CREDENTIAL_KEY)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        debug!(path = %self.path.display(), present = credential.is_some(), "Credential loaded");
        Ok(credential)
    }

    fn save(&self, credential: &str) -> Result<(), CredentialError> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(CredentialError::Empty);
        }
        let mut map = self.read_object()?;
        map.insert(CREDENTIAL_KEY.into(), Value::String(credential.into()));
        self.write_object(&map)
    }

    fn clear(&self) -> Result<(), CredentialError> {
        let mut map = self.read_object()?;
        if map.remove(CREDENTIAL_KEY).is_none() {
            return Ok(());
        }
        if map.is_empty() {
            return match std::fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(self.write_error(e)),
            };
        }
        self.write_object(&map)
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)) {
        warn!(path = %path.display(), error = %e, "Could not restrict credential file permissions");
    }
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) {}

/// A process-local store, for testing.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    value: Mutex<Option<String>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(credential.into())),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.value.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    fn load(&self) -> Result<Option<String>, CredentialError> {
        Ok(self.slot().clone())
    }

    fn save(&self, credential: &str) -> Result<(), CredentialError> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(CredentialError::Empty);
        }
        *self.slot() = Some(credential.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialError> {
        *self.slot() = None;
        Ok(())
    }
}

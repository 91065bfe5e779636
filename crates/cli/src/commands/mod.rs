pub mod credential;
pub mod export;
pub mod fill;
pub mod onboard;
pub mod status;

use std::path::Path;
use std::sync::Arc;

use docfill_client::{Completion, FileCredentialStore, HttpRemoteService, Workspace, WorkspaceOptions};
use docfill_config::AppConfig;
use docfill_core::event::Notification;
use docfill_engine::TextTemplateEngine;
use tokio::sync::mpsc;

/// Load config, exiting with a readable message on failure.
pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// Wire the HTTP service, the credential file and the text engine together.
pub fn build_workspace(
    config: &AppConfig,
) -> Result<(Workspace, mpsc::UnboundedReceiver<Completion>), Box<dyn std::error::Error>> {
    let service = HttpRemoteService::from_config(config)?;
    let credentials = FileCredentialStore::new(config.credentials_path());
    Ok(Workspace::new(
        Arc::new(TextTemplateEngine::new()),
        Arc::new(service),
        Arc::new(credentials),
        WorkspaceOptions::from_config(config),
    ))
}

/// The file name part of `path`, as sent to the service.
pub fn upload_name(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| format!("Not a file path: {}", path.display()).into())
}

/// One line describing a notification.
pub fn describe(notification: &Notification) -> String {
    match notification {
        Notification::SessionStarted {
            filename,
            placeholders,
            ..
        } => format!("✅ {filename}: {placeholders} placeholder(s) found. Type `list` to see them."),
        Notification::UploadFailed {
            filename,
            reason,
            retrying: true,
            ..
        } => format!("⚠️  Upload of {filename} failed ({reason}); retrying shortly..."),
        Notification::UploadFailed {
            filename, reason, ..
        } => format!("❌ Upload of {filename} failed: {reason}"),
        Notification::Synced { names, .. } => format!("  Saved: {}", names.join(", ")),
        Notification::SyncFailed { names, reason, .. } => format!(
            "⚠️  Could not save {} remotely ({reason}); local values are kept",
            names.join(", ")
        ),
        Notification::AgentReplied {
            message, applied, ..
        } => {
            let mut out = String::new();
            for line in message.lines() {
                out.push_str(&format!("  Assistant > {line}\n"));
            }
            if !applied.is_empty() {
                out.push_str(&format!("  Updated: {}", applied.join(", ")));
            }
            out.trim_end().to_string()
        }
        Notification::AgentFailed { reason, .. } => format!("❌ Agent error: {reason}"),
        Notification::DraftKept { name, .. } => format!(
            "  Note: {name} changed remotely; your unsaved edit was kept (`apply {name}` or `discard {name}`)"
        ),
        Notification::RenderFailed { reason, .. } => format!("❌ Render failed: {reason}"),
        Notification::StaleResultIgnored { operation, .. } => {
            format!("  (ignored a late {operation} result for an earlier document)")
        }
        Notification::Blocked { operation, reason, .. } => {
            format!("❌ Cannot {operation}: {reason}. Run `docfill credential set <KEY>`.")
        }
    }
}

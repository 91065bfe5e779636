//! Workspace controller: the single owner of client state.
//!
//! The workspace is driven from one task. Every remote call runs in a spawned
//! task that only owns cloned inputs and reports back through an unbounded
//! channel; the driver feeds each [`Completion`] to [`Workspace::handle`].
//!
//! Results are guarded by document session: a completion issued for a
//! session that is no longer current is ignored. Uploads additionally carry
//! a generation number so that only the most recently started upload can
//! install a session.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use docfill_config::AppConfig;
use docfill_core::credential::CredentialStore;
use docfill_core::error::{Error, Result, SyncError};
use docfill_core::event::{Notification, NotificationBus};
use docfill_core::placeholder::{NamedValue, UpdateRecord};
use docfill_core::service::{
    AgentReply, AgentRequest, BulkUpdateAck, RemoteService, SessionId, UploadRequest,
    UploadResponse,
};
use docfill_core::template::TemplateEngine;
use docfill_engine::{BindOptions, DocumentSession, SessionOptions, UpdateReport, ValueSource};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::http::content_type_for;

/// Settings the workspace runs with.
#[derive(Debug, Clone)]
pub struct WorkspaceOptions {
    pub session: SessionOptions,
    pub retry_enabled: bool,
    pub retry_backoff: Duration,
    pub export_suffix: String,
}

impl Default for WorkspaceOptions {
    fn default() -> Self {
        Self {
            session: SessionOptions::default(),
            retry_enabled: true,
            retry_backoff: Duration::from_secs(20),
            export_suffix: "_filled".into(),
        }
    }
}

impl WorkspaceOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            session: SessionOptions {
                history_limit: config.session.history_limit,
                bind: BindOptions {
                    duplicates: config.session.duplicate_names,
                    ..BindOptions::default()
                },
            },
            retry_enabled: config.upload.retry_enabled,
            retry_backoff: config.retry_backoff(),
            export_suffix: config.export.filename_suffix.clone(),
        }
    }
}

/// One upload attempt's inputs, kept so the attempt can be repeated.
#[derive(Debug, Clone)]
pub struct UploadJob {
    pub generation: u64,
    pub attempt: u32,
    pub filename: String,
    pub bytes: Arc<[u8]>,
    pub credential: String,
}

/// The outcome of a unit of remote work.
#[derive(Debug)]
pub enum Completion {
    Uploaded {
        job: UploadJob,
        result: std::result::Result<UploadResponse, SyncError>,
    },
    Synced {
        session: SessionId,
        names: Vec<String>,
        result: std::result::Result<BulkUpdateAck, SyncError>,
    },
    AgentReplied {
        session: SessionId,
        result: std::result::Result<AgentReply, SyncError>,
    },
}

pub struct Workspace {
    engine: Arc<dyn TemplateEngine>,
    service: Arc<dyn RemoteService>,
    credentials: Arc<dyn CredentialStore>,
    options: WorkspaceOptions,
    bus: NotificationBus,
    tx: mpsc::UnboundedSender<Completion>,
    session: Option<DocumentSession>,
    upload_generation: u64,
    in_flight: usize,
}

impl Workspace {
    /// Create a workspace and the receiver its completions arrive on.
    pub fn new(
        engine: Arc<dyn TemplateEngine>,
        service: Arc<dyn RemoteService>,
        credentials: Arc<dyn CredentialStore>,
        options: WorkspaceOptions,
    ) -> (Self, mpsc::UnboundedReceiver<Completion>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let workspace = Self {
            engine,
            service,
            credentials,
            options,
            bus: NotificationBus::default(),
            tx,
            session: None,
            upload_generation: 0,
            in_flight: 0,
        };
        (workspace, rx)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Notification>> {
        self.bus.subscribe()
    }

    pub fn session(&self) -> Option<&DocumentSession> {
        self.session.as_ref()
    }

    pub fn options(&self) -> &WorkspaceOptions {
        &self.options
    }

    /// Remote calls started and not yet handled.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    fn session_mut(&mut self) -> Result<&mut DocumentSession> {
        self.session.as_mut().ok_or(Error::NoActiveSession)
    }

    fn current(&self) -> Result<&DocumentSession> {
        self.session.as_ref().ok_or(Error::NoActiveSession)
    }

    /// The stored credential, or a `Blocked` notification.
    fn require_credential(&self, operation: &str) -> Result<String> {
        match self.credentials.load()? {
            Some(credential) => Ok(credential),
            None => {
                let reason = SyncError::MissingCredential;
                self.bus.publish(Notification::Blocked {
                    operation: operation.into(),
                    reason: reason.to_string(),
                    timestamp: Utc::now(),
                });
                Err(reason.into())
            }
        }
    }

    // --- Operations ---

    /// Start uploading a document. Returns the upload's generation.
    pub fn upload(&mut self, filename: impl Into<String>, bytes: Vec<u8>) -> Result<u64> {
        let credential = self.require_credential("upload")?;
        self.upload_generation += 1;
        let job = UploadJob {
            generation: self.upload_generation,
            attempt: 1,
            filename: filename.into(),
            bytes: bytes.into(),
            credential,
        };
        info!(filename = %job.filename, generation = job.generation, "Starting upload");
        self.spawn_upload(job, Duration::ZERO);
        Ok(self.upload_generation)
    }

    pub fn edit(&mut self, name: &str, text: &str) -> Result<bool> {
        Ok(self.session_mut()?.edit(name, text))
    }

    pub fn discard(&mut self, name: &str) -> Result<bool> {
        Ok(self.session_mut()?.discard(name))
    }

    /// Commit a draft locally and synchronize it.
    pub fn apply(&mut self, name: &str) -> Result<Option<NamedValue>> {
        let applied = self.session_mut()?.apply(name);
        if let Some(pair) = &applied {
            self.spawn_sync(vec![pair.clone()])?;
        }
        Ok(applied)
    }

    /// Edit and apply in one step.
    pub fn set(&mut self, name: &str, value: &str) -> Result<Option<NamedValue>> {
        if !self.edit(name, value)? {
            return Ok(None);
        }
        self.apply(name)
    }

    /// Commit every dirty draft and synchronize them as one bulk update.
    pub fn apply_all(&mut self) -> Result<Vec<NamedValue>> {
        let applied = self.session_mut()?.apply_all_dirty();
        if !applied.is_empty() {
            self.spawn_sync(applied.clone())?;
        }
        Ok(applied)
    }

    /// Apply `{name, value}` pairs through the update protocol and
    /// synchronize the ones that changed.
    pub fn bulk_update(&mut self, pairs: Vec<NamedValue>) -> Result<UpdateReport> {
        let records: Vec<UpdateRecord> = pairs.into_iter().map(UpdateRecord::from).collect();
        let session = self.session_mut()?;
        let report = session.apply_updates(&records);
        let changed: Vec<NamedValue> = report
            .applied
            .iter()
            .map(|name| NamedValue::new(name, session.store().value(name).unwrap_or_default()))
            .collect();

        self.publish_kept(&report.kept_drafts);
        if !changed.is_empty() {
            self.spawn_sync(changed)?;
        }
        Ok(report)
    }

    /// Send a chat message to the agent.
    pub fn send_message(&mut self, message: &str) -> Result<()> {
        let session_id = self.current()?.id().clone();
        let credential = self.require_credential("chat")?;
        self.session_mut()?.record_user_message(message);

        let request = AgentRequest {
            session_id: session_id.clone(),
            message: message.to_string(),
            credential,
        };
        let service = Arc::clone(&self.service);
        let tx = self.tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let result = service.send_message(request).await;
            let _ = tx.send(Completion::AgentReplied {
                session: session_id,
                result,
            });
        });
        Ok(())
    }

    /// Render a preview; on failure the previous preview stays available
    /// through [`DocumentSession::last_preview`].
    pub fn preview(&mut self, source: ValueSource) -> Result<Arc<[u8]>> {
        match self.session_mut()?.preview(source) {
            Ok(bytes) => Ok(bytes),
            Err(failure) => {
                self.bus.publish(Notification::RenderFailed {
                    reason: failure.error.to_string(),
                    timestamp: Utc::now(),
                });
                Err(failure.error.into())
            }
        }
    }

    /// The filled document and the name to save it under.
    pub fn export(&self) -> Result<(String, Vec<u8>)> {
        let session = self.current()?;
        match session.export() {
            Ok(bytes) => Ok((session.export_filename(&self.options.export_suffix), bytes)),
            Err(error) => {
                self.bus.publish(Notification::RenderFailed {
                    reason: error.to_string(),
                    timestamp: Utc::now(),
                });
                Err(error.into())
            }
        }
    }

    // --- Completions ---

    /// Fold one completion into the workspace state.
    pub fn handle(&mut self, completion: Completion) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match completion {
            Completion::Uploaded { job, result } => self.on_uploaded(job, result),
            Completion::Synced {
                session,
                names,
                result,
            } => self.on_synced(session, names, result),
            Completion::AgentReplied { session, result } => self.on_agent_reply(session, result),
        }
    }

    /// Handle completions until nothing is in flight.
    pub async fn settle(&mut self, rx: &mut mpsc::UnboundedReceiver<Completion>) {
        while self.in_flight > 0 {
            match rx.recv().await {
                Some(completion) => self.handle(completion),
                None => break,
            }
        }
    }

    fn on_uploaded(&mut self, job: UploadJob, result: std::result::Result<UploadResponse, SyncError>) {
        if job.generation != self.upload_generation {
            debug!(generation = job.generation, "Ignoring superseded upload");
            self.publish_stale(
                result.as_ref().map(|r| r.session_id.to_string()).unwrap_or_default(),
                "upload",
            );
            return;
        }

        let response = match result {
            Ok(response) => response,
            Err(error) => {
                let retrying = self.should_retry(&job, &error);
                warn!(filename = %job.filename, attempt = job.attempt, %error, retrying, "Upload failed");
                self.bus.publish(Notification::UploadFailed {
                    filename: job.filename.clone(),
                    reason: error.to_string(),
                    retrying,
                    timestamp: Utc::now(),
                });
                if retrying {
                    let retry = UploadJob {
                        attempt: job.attempt + 1,
                        ..job
                    };
                    self.spawn_upload(retry, self.options.retry_backoff);
                }
                return;
            }
        };

        if let Some(message) = &response.message {
            debug!(message = %message, "Upload acknowledged");
        }

        match DocumentSession::open(
            Arc::clone(&self.engine),
            response.session_id,
            job.filename.clone(),
            &job.bytes,
            &response.placeholders,
            &self.options.session,
        ) {
            Ok(session) => {
                self.bus.publish(Notification::SessionStarted {
                    session_id: session.id().to_string(),
                    filename: session.filename().to_string(),
                    placeholders: session.store().len(),
                    timestamp: Utc::now(),
                });
                self.session = Some(session);
            }
            Err(error) => {
                warn!(filename = %job.filename, %error, "Uploaded document could not be bound");
                self.bus.publish(Notification::UploadFailed {
                    filename: job.filename,
                    reason: error.to_string(),
                    retrying: false,
                    timestamp: Utc::now(),
                });
            }
        }
    }

    fn should_retry(&self, job: &UploadJob, error: &SyncError) -> bool {
        self.options.retry_enabled
            && job.attempt == 1
            && !matches!(
                error,
                SyncError::MissingCredential | SyncError::AuthenticationFailed(_)
            )
    }

    fn on_synced(
        &mut self,
        session: SessionId,
        names: Vec<String>,
        result: std::result::Result<BulkUpdateAck, SyncError>,
    ) {
        if !self.is_current(&session) {
            self.publish_stale(session.to_string(), "sync");
            return;
        }

        match result {
            Ok(ack) => {
                debug!(session = %session, stored = ?ack.names(), "Sync acknowledged");
                self.bus.publish(Notification::Synced {
                    session_id: session.to_string(),
                    names,
                    timestamp: Utc::now(),
                });
            }
            Err(error) => {
                // The local commit stands.
                warn!(session = %session, %error, "Sync failed");
                self.bus.publish(Notification::SyncFailed {
                    session_id: session.to_string(),
                    names,
                    reason: error.to_string(),
                    timestamp: Utc::now(),
                });
            }
        }
    }

    fn on_agent_reply(&mut self, session: SessionId, result: std::result::Result<AgentReply, SyncError>) {
        if !self.is_current(&session) {
            self.publish_stale(session.to_string(), "chat");
            return;
        }
        let Some(current) = self.session.as_mut() else {
            return;
        };

        match result {
            Ok(reply) => {
                current.record_agent_message(reply.message.clone());
                let report = current.apply_updates(&reply.updates);
                debug!(
                    session = %session,
                    applied = report.applied.len(),
                    dropped = report.dropped.len(),
                    "Agent updates applied"
                );
                self.publish_kept(&report.kept_drafts);
                self.bus.publish(Notification::AgentReplied {
                    session_id: session.to_string(),
                    message: reply.message,
                    applied: report.applied,
                    timestamp: Utc::now(),
                });
            }
            Err(error) => {
                warn!(session = %session, %error, "Agent message failed");
                self.bus.publish(Notification::AgentFailed {
                    session_id: session.to_string(),
                    reason: error.to_string(),
                    timestamp: Utc::now(),
                });
            }
        }
    }

    fn is_current(&self, session: &SessionId) -> bool {
        self.session.as_ref().is_some_and(|s| s.id() == session)
    }

    fn publish_stale(&self, session_id: String, operation: &str) {
        self.bus.publish(Notification::StaleResultIgnored {
            session_id,
            operation: operation.into(),
            timestamp: Utc::now(),
        });
    }

    fn publish_kept(&self, names: &[String]) {
        for name in names {
            self.bus.publish(Notification::DraftKept {
                name: name.clone(),
                timestamp: Utc::now(),
            });
        }
    }

    // --- Spawning ---

    fn spawn_upload(&mut self, job: UploadJob, delay: Duration) {
        let service = Arc::clone(&self.service);
        let tx = self.tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let request = UploadRequest {
                filename: job.filename.clone(),
                content_type: content_type_for(&job.filename).to_string(),
                bytes: job.bytes.to_vec(),
                credential: job.credential.clone(),
            };
            let result = service.upload(request).await;
            let _ = tx.send(Completion::Uploaded { job, result });
        });
    }

    fn spawn_sync(&mut self, updates: Vec<NamedValue>) -> Result<()> {
        let current = self.current()?;
        let session = current.id().clone();
        let names: Vec<String> = updates.iter().map(|u| u.name.clone()).collect();
        // The service only knows the names it handed out.
        let updates: Vec<NamedValue> = updates
            .into_iter()
            .map(|u| NamedValue::new(current.bound().service_name(&u.name), u.value))
            .collect();
        let service = Arc::clone(&self.service);
        let tx = self.tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let result = service.update_placeholders(&session, updates).await;
            let _ = tx.send(Completion::Synced {
                session,
                names,
                result,
            });
        });
        Ok(())
    }
}

//! End-to-end tests for docfill.
//!
//! Each test runs a fake extraction/agent backend on a local port and drives
//! the real stack against it: HTTP client, credential file, text template
//! engine and workspace controller.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use docfill_client::{Completion, FileCredentialStore, HttpRemoteService, Workspace, WorkspaceOptions};
use docfill_config::AppConfig;
use docfill_core::credential::CredentialStore;
use docfill_core::error::{Error, SyncError};
use docfill_core::event::Notification;
use docfill_core::placeholder::NamedValue;
use docfill_engine::{TextTemplateEngine, ValueSource};
use serde_json::{Value, json};
use tokio::sync::{broadcast, mpsc};

const KEY: &str = "sk-e2e";

// ── Fake backend ─────────────────────────────────────────────────────────

#[derive(Default)]
struct Backend {
    next_id: u32,
    placeholders: Vec<Value>,
    upload_failures: VecDeque<StatusCode>,
    upload_calls: usize,
    replies: VecDeque<Value>,
    reply_delay: Duration,
    sync_fails: bool,
    stored: HashMap<String, String>,
}

type Shared = Arc<Mutex<Backend>>;

fn backend(names: &[&str]) -> Shared {
    let placeholders = names
        .iter()
        .enumerate()
        .map(|(i, name)| json!({"order": i + 1, "name": name, "description": format!("The {name}")}))
        .collect();
    Arc::new(Mutex::new(Backend {
        placeholders,
        ..Backend::default()
    }))
}

async fn upload(State(backend): State<Shared>, body: Bytes) -> (StatusCode, Json<Value>) {
    let mut backend = backend.lock().unwrap();
    backend.upload_calls += 1;
    if !String::from_utf8_lossy(&body).contains(KEY) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "Invalid API key"})));
    }
    if let Some(status) = backend.upload_failures.pop_front() {
        return (status, Json(json!({"error": "extraction failed"})));
    }
    backend.next_id += 1;
    (
        StatusCode::CREATED,
        Json(json!({
            "document_id": backend.next_id.to_string(),
            "filename": "letter.txt",
            "placeholders": backend.placeholders,
            "message": "Document uploaded and analyzed successfully"
        })),
    )
}

async fn agent(State(backend): State<Shared>, Json(_body): Json<Value>) -> Json<Value> {
    let (reply, delay) = {
        let mut backend = backend.lock().unwrap();
        let reply = backend
            .replies
            .pop_front()
            .unwrap_or_else(|| json!({"message": "Anything else?", "updates": []}));
        (reply, backend.reply_delay)
    };
    tokio::time::sleep(delay).await;
    Json(reply)
}

async fn update_placeholders(
    State(backend): State<Shared>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut backend = backend.lock().unwrap();
    if backend.sync_fails {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "database unavailable"})),
        );
    }
    for update in body["updates"].as_array().cloned().unwrap_or_default() {
        let name = update["name"].as_str().unwrap_or_default().to_string();
        let value = update["value"].as_str().unwrap_or_default().to_string();
        backend.stored.insert(name, value);
    }
    (
        StatusCode::OK,
        Json(json!({"document_id": body["id"], "filename": "letter.txt", "placeholders": []})),
    )
}

async fn serve(backend: Shared) -> String {
    let app = Router::new()
        .route("/api/fileUpload", post(upload))
        .route("/api/agent/message", post(agent))
        .route("/api/updatePlaceholders", post(update_placeholders))
        .with_state(backend);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/api")
}

// ── Harness ──────────────────────────────────────────────────────────────

struct Harness {
    workspace: Workspace,
    completions: mpsc::UnboundedReceiver<Completion>,
    events: broadcast::Receiver<Arc<Notification>>,
    _dir: tempfile::TempDir,
}

impl Harness {
    async fn start(backend: &Shared, credential: Option<&str>) -> Self {
        let base = serve(Arc::clone(backend)).await;
        let dir = tempfile::tempdir().unwrap();
        let credentials = FileCredentialStore::new(dir.path().join("credentials.json"));
        if let Some(key) = credential {
            credentials.save(key).unwrap();
        }

        let mut config = AppConfig::default();
        config.service.base_url = base;
        let options = WorkspaceOptions {
            retry_backoff: Duration::from_millis(50),
            ..WorkspaceOptions::from_config(&config)
        };

        let (workspace, completions) = Workspace::new(
            Arc::new(TextTemplateEngine::new()),
            Arc::new(HttpRemoteService::from_config(&config).unwrap()),
            Arc::new(credentials),
            options,
        );
        let events = workspace.subscribe();
        Self {
            workspace,
            completions,
            events,
            _dir: dir,
        }
    }

    async fn settle(&mut self) {
        self.workspace.settle(&mut self.completions).await;
    }

    async fn open(&mut self, document: &str) {
        self.workspace
            .upload("letter.txt", document.as_bytes().to_vec())
            .unwrap();
        self.settle().await;
        assert!(self.workspace.session().is_some(), "upload did not open a session");
    }

    fn value(&self, name: &str) -> String {
        self.workspace
            .session()
            .and_then(|s| s.store().value(name))
            .unwrap_or_default()
            .to_string()
    }

    fn drain(&mut self) -> Vec<Arc<Notification>> {
        let mut out = Vec::new();
        while let Ok(n) = self.events.try_recv() {
            out.push(n);
        }
        out
    }
}

// ── Tests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn identical_tokens_bind_by_position_and_export() {
    let backend = backend(&["full_name", "email"]);
    let mut h = Harness::start(&backend, Some(KEY)).await;
    h.open("Dear [X], reach me at [X].").await;

    assert_eq!(
        h.workspace.session().unwrap().ordered_names(),
        &["full_name".to_string(), "email".to_string()]
    );

    h.workspace.set("full_name", "Ana").unwrap();
    h.settle().await;

    let (filename, bytes) = h.workspace.export().unwrap();
    assert_eq!(filename, "letter_filled.txt");
    assert_eq!(String::from_utf8(bytes).unwrap(), "Dear Ana, reach me at [email].");
    assert_eq!(backend.lock().unwrap().stored.get("full_name").map(String::as_str), Some("Ana"));
    assert!(!backend.lock().unwrap().stored.contains_key("email"));
}

#[tokio::test]
async fn preview_matches_export_for_committed_values() {
    let backend = backend(&["company", "amount"]);
    let mut h = Harness::start(&backend, Some(KEY)).await;
    h.open("[Company] owes [Amount].").await;

    h.workspace.set("company", "Acme").unwrap();
    h.workspace.edit("amount", "1500").unwrap();
    h.settle().await;

    let preview = h.workspace.preview(ValueSource::Committed).unwrap();
    let (_, exported) = h.workspace.export().unwrap();
    assert_eq!(preview.as_ref(), exported.as_slice());
    assert_eq!(exported, b"Acme owes [amount].".to_vec());

    let live = h.workspace.preview(ValueSource::Drafts).unwrap();
    assert_eq!(live.as_ref(), b"Acme owes 1500.");
}

#[tokio::test]
async fn agent_reply_overrides_local_apply() {
    let backend = backend(&["full_name", "email"]);
    backend.lock().unwrap().replies.push_back(json!({
        "message": "Updated the name.",
        "updates": [{"name": "full_name", "value": "Ana Lopez"}]
    }));
    let mut h = Harness::start(&backend, Some(KEY)).await;
    h.open("Dear [X], reach me at [X].").await;

    h.workspace.set("full_name", "Ana").unwrap();
    h.workspace.send_message("my full name is Ana Lopez").unwrap();
    h.settle().await;

    let session = h.workspace.session().unwrap();
    assert_eq!(h.value("full_name"), "Ana Lopez");
    assert!(!session.is_dirty("full_name"));
    assert_eq!(session.draft("full_name"), Some("Ana Lopez"));
    assert_eq!(session.history().len(), 2);
}

#[tokio::test]
async fn agent_updates_resolve_by_order_and_keep_dirty_drafts() {
    let backend = backend(&["full_name", "email"]);
    backend.lock().unwrap().replies.push_back(json!({
        "message": "Done.",
        "updates": [
            {"order": 2, "value": "ana@example.com"},
            {"name": "full_name", "value": "Ana Lopez"},
            {"name": "nonexistent", "value": "dropped"}
        ]
    }));
    let mut h = Harness::start(&backend, Some(KEY)).await;
    h.open("[X] <[X]>").await;
    h.drain();

    h.workspace.edit("full_name", "Ana L.").unwrap();
    h.workspace.send_message("fill everything").unwrap();
    h.settle().await;

    let session = h.workspace.session().unwrap();
    assert_eq!(h.value("email"), "ana@example.com");
    assert_eq!(h.value("full_name"), "Ana Lopez");
    assert!(session.is_dirty("full_name"));
    assert_eq!(session.draft("full_name"), Some("Ana L."));

    let events = h.drain();
    assert!(events.iter().any(|n| matches!(
        n.as_ref(),
        Notification::DraftKept { name, .. } if name == "full_name"
    )));
    assert!(events.iter().any(|n| matches!(
        n.as_ref(),
        Notification::AgentReplied { applied, .. } if applied.len() == 2
    )));
}

#[tokio::test]
async fn late_agent_reply_for_replaced_document_is_ignored() {
    let backend = backend(&["full_name"]);
    {
        let mut b = backend.lock().unwrap();
        b.reply_delay = Duration::from_millis(300);
        b.replies.push_back(json!({
            "message": "Set.",
            "updates": [{"name": "full_name", "value": "Old Reply"}]
        }));
    }
    let mut h = Harness::start(&backend, Some(KEY)).await;
    h.open("Hello [name]").await;

    h.workspace.send_message("name is Old Reply").unwrap();
    h.workspace
        .upload("letter.txt", b"Goodbye [name]".to_vec())
        .unwrap();
    h.settle().await;

    let session = h.workspace.session().unwrap();
    assert_eq!(session.id().as_str(), "2");
    assert_eq!(h.value("full_name"), "");
    assert!(session.history().is_empty());
    assert!(h.drain().iter().any(|n| matches!(
        n.as_ref(),
        Notification::StaleResultIgnored { operation, .. } if operation == "chat"
    )));
}

#[tokio::test]
async fn failed_sync_keeps_local_value() {
    let backend = backend(&["full_name"]);
    backend.lock().unwrap().sync_fails = true;
    let mut h = Harness::start(&backend, Some(KEY)).await;
    h.open("Hello [name]").await;

    h.workspace.set("full_name", "Ana").unwrap();
    h.settle().await;

    assert_eq!(h.value("full_name"), "Ana");
    assert!(!h.workspace.session().unwrap().is_dirty("full_name"));
    assert!(h.drain().iter().any(|n| matches!(
        n.as_ref(),
        Notification::SyncFailed { reason, .. } if reason.contains("database unavailable")
    )));
}

#[tokio::test]
async fn missing_credential_blocks_before_any_request() {
    let backend = backend(&["full_name"]);
    let mut h = Harness::start(&backend, None).await;

    let err = h
        .workspace
        .upload("letter.txt", b"Hello [name]".to_vec())
        .unwrap_err();
    assert!(matches!(err, Error::Sync(SyncError::MissingCredential)));
    assert_eq!(backend.lock().unwrap().upload_calls, 0);
    assert!(matches!(
        h.drain().first().map(|n| n.as_ref()),
        Some(Notification::Blocked { .. })
    ));
}

#[tokio::test]
async fn transient_upload_failure_is_retried_once() {
    let backend = backend(&["full_name"]);
    backend
        .lock()
        .unwrap()
        .upload_failures
        .push_back(StatusCode::BAD_GATEWAY);
    let mut h = Harness::start(&backend, Some(KEY)).await;

    h.open("Hello [name]").await;

    assert_eq!(backend.lock().unwrap().upload_calls, 2);
    let events = h.drain();
    assert!(matches!(
        events[0].as_ref(),
        Notification::UploadFailed { retrying: true, .. }
    ));
    assert!(matches!(events[1].as_ref(), Notification::SessionStarted { .. }));
}

#[tokio::test]
async fn rejected_credential_is_not_retried() {
    let backend = backend(&["full_name"]);
    let mut h = Harness::start(&backend, Some("sk-wrong")).await;

    h.workspace
        .upload("letter.txt", b"Hello [name]".to_vec())
        .unwrap();
    h.settle().await;

    assert!(h.workspace.session().is_none());
    assert_eq!(backend.lock().unwrap().upload_calls, 1);
    assert!(matches!(
        h.drain()[0].as_ref(),
        Notification::UploadFailed { retrying: false, .. }
    ));
}

#[tokio::test]
async fn bulk_update_syncs_only_changed_values() {
    let backend = backend(&["full_name", "email"]);
    let mut h = Harness::start(&backend, Some(KEY)).await;
    h.open("[a] [b]").await;

    let report = h
        .workspace
        .bulk_update(vec![
            NamedValue::new("full_name", "Ana"),
            NamedValue::new("missing", "x"),
        ])
        .unwrap();
    h.settle().await;

    assert_eq!(report.applied, vec!["full_name".to_string()]);
    assert_eq!(report.dropped.len(), 1);
    let stored = backend.lock().unwrap().stored.clone();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored["full_name"], "Ana");
}

#[tokio::test]
async fn reused_service_name_resolves_by_position_and_syncs_upstream_name() {
    let backend = backend(&["Company Name", "Date", "Company Name"]);
    backend.lock().unwrap().replies.push_back(json!({
        "message": "Filled the signing party.",
        "updates": [{"name": "Company Name", "order": 3, "value": "Acme Ltd"}]
    }));
    let mut h = Harness::start(&backend, Some(KEY)).await;
    h.open("[A] agrees on [Date], signed for [A].").await;

    h.workspace.send_message("the signing party is Acme Ltd").unwrap();
    h.settle().await;
    assert_eq!(h.value("Company Name"), "");
    assert_eq!(h.value("Company Name_2"), "Acme Ltd");

    h.workspace.set("Company Name", "Acme").unwrap();
    h.settle().await;
    assert_eq!(backend.lock().unwrap().stored["Company Name"], "Acme");
    assert!(!backend.lock().unwrap().stored.contains_key("Company Name_2"));

    let (_, bytes) = h.workspace.export().unwrap();
    assert_eq!(
        String::from_utf8(bytes).unwrap(),
        "Acme agrees on [Date], signed for Acme Ltd."
    );
}

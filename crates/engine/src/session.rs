//! One document session: everything that belongs to the current upload.
//!
//! A session is created by binding an uploaded document and is replaced
//! wholesale by the next upload. It never merges with its predecessor.

use std::sync::Arc;

use docfill_core::error::{MalformedDocumentError, RenderError};
use docfill_core::message::{ChatMessage, ConversationLog};
use docfill_core::placeholder::{NamedValue, PlaceholderSpec, UpdateRecord};
use docfill_core::service::SessionId;
use docfill_core::template::TemplateEngine;
use tracing::info;

use crate::binder::{BindOptions, BoundDocument, bind};
use crate::draft::DraftReconciler;
use crate::materializer::{Materializer, PreviewFailure, ValueSource, filled_filename};
use crate::store::{PlaceholderStore, StoreSnapshot};
use crate::updates::{UpdateReport, apply_batch};

/// Default number of chat messages kept per session.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub history_limit: usize,
    pub bind: BindOptions,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            bind: BindOptions::default(),
        }
    }
}

#[derive(Debug)]
pub struct DocumentSession {
    id: SessionId,
    filename: String,
    bound: BoundDocument,
    store: PlaceholderStore,
    drafts: DraftReconciler,
    materializer: Materializer,
    history: ConversationLog,
}

impl DocumentSession {
    /// Bind `document` and start a fresh session around it.
    pub fn open(
        engine: Arc<dyn TemplateEngine>,
        id: SessionId,
        filename: impl Into<String>,
        document: &[u8],
        specs: &[PlaceholderSpec],
        options: &SessionOptions,
    ) -> Result<Self, MalformedDocumentError> {
        let filename = filename.into();
        let bound = bind(engine.as_ref(), document, specs, &options.bind)?;

        let mut store = PlaceholderStore::new();
        store.initialize(bound.names(), bound.descriptions());
        let mut drafts = DraftReconciler::new();
        drafts.initialize(&store);

        info!(
            session = %id,
            filename = %filename,
            tokens = bound.token_count(),
            placeholders = store.len(),
            "Document session opened"
        );

        Ok(Self {
            id,
            filename,
            bound,
            store,
            drafts,
            materializer: Materializer::new(engine),
            history: ConversationLog::new(options.history_limit),
        })
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Canonical names indexed by occurrence.
    pub fn ordered_names(&self) -> &[String] {
        self.bound.names()
    }

    pub fn bound(&self) -> &BoundDocument {
        &self.bound
    }

    pub fn store(&self) -> &PlaceholderStore {
        &self.store
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.store.snapshot()
    }

    // --- Drafts ---

    pub fn edit(&mut self, name: &str, text: &str) -> bool {
        self.drafts.edit(name, text)
    }

    pub fn draft(&self, name: &str) -> Option<&str> {
        self.drafts.draft(name)
    }

    pub fn is_dirty(&self, name: &str) -> bool {
        self.drafts.is_dirty(name, &self.store)
    }

    pub fn dirty_names(&self) -> Vec<String> {
        self.drafts.dirty_names(&self.store)
    }

    /// Commit one draft. Returns the pair to synchronize remotely.
    pub fn apply(&mut self, name: &str) -> Option<NamedValue> {
        self.drafts.apply(name, &mut self.store)
    }

    /// Commit every dirty draft, in store order.
    pub fn apply_all_dirty(&mut self) -> Vec<NamedValue> {
        let names = self.dirty_names();
        names.iter().filter_map(|name| self.apply(name)).collect()
    }

    pub fn discard(&mut self, name: &str) -> bool {
        self.drafts.discard(name, &self.store)
    }

    // --- External updates ---

    /// Apply update records from a bulk edit or an agent reply.
    pub fn apply_updates(&mut self, records: &[UpdateRecord]) -> UpdateReport {
        apply_batch(records, &self.bound, &mut self.store, &mut self.drafts)
    }

    // --- Materialization ---

    pub fn preview(&mut self, source: ValueSource) -> Result<Arc<[u8]>, PreviewFailure> {
        self.materializer
            .preview(&self.bound, &self.store, &self.drafts, source)
    }

    pub fn last_preview(&self) -> Option<Arc<[u8]>> {
        self.materializer.last_preview()
    }

    pub fn export(&self) -> Result<Vec<u8>, RenderError> {
        self.materializer.export(&self.bound, &self.store.snapshot())
    }

    pub fn export_filename(&self, suffix: &str) -> String {
        filled_filename(&self.filename, suffix)
    }

    // --- Chat ---

    pub fn history(&self) -> &ConversationLog {
        &self.history
    }

    pub fn record_user_message(&mut self, content: impl Into<String>) {
        self.history.push(ChatMessage::user(content));
    }

    pub fn record_agent_message(&mut self, content: impl Into<String>) {
        self.history.push(ChatMessage::assistant(content));
    }
}

//! Document materializer: bound document + values → filled bytes.
//!
//! Preview substitutes every name, using the wrapped tag for unfilled ones.
//! Export leaves unfilled names out of the value map and lets the engine's
//! own missing-value fallback emit the same tag, so both paths agree.

use std::collections::BTreeMap;
use std::sync::Arc;

use docfill_core::error::RenderError;
use docfill_core::template::TemplateEngine;
use tracing::warn;

use crate::binder::BoundDocument;
use crate::draft::DraftReconciler;
use crate::store::{PlaceholderStore, StoreSnapshot};

/// Which values a preview is rendered from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValueSource {
    /// Applied values only.
    #[default]
    Committed,
    /// What the user is currently typing, including unsaved edits.
    Drafts,
}

/// A failed preview, carrying the last preview that rendered.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{error}")]
pub struct PreviewFailure {
    pub error: RenderError,
    pub previous: Option<Arc<[u8]>>,
}

pub struct Materializer {
    engine: Arc<dyn TemplateEngine>,
    last_preview: Option<Arc<[u8]>>,
}

impl Materializer {
    pub fn new(engine: Arc<dyn TemplateEngine>) -> Self {
        Self {
            engine,
            last_preview: None,
        }
    }

    /// Render with a value for every name.
    pub fn preview(
        &mut self,
        bound: &BoundDocument,
        store: &PlaceholderStore,
        drafts: &DraftReconciler,
        source: ValueSource,
    ) -> Result<Arc<[u8]>, PreviewFailure> {
        let delims = self.engine.delimiters();
        let values: BTreeMap<String, String> = store
            .iter()
            .map(|p| {
                let value = match source {
                    ValueSource::Committed => p.value.as_str(),
                    ValueSource::Drafts => drafts.draft(&p.name).unwrap_or(&p.value),
                };
                let value = if value.trim().is_empty() {
                    delims.wrap(&p.name)
                } else {
                    value.to_string()
                };
                (p.name.clone(), value)
            })
            .collect();

        match self.engine.render(bound.bytes(), &values) {
            Ok(bytes) => {
                let bytes: Arc<[u8]> = bytes.into();
                self.last_preview = Some(Arc::clone(&bytes));
                Ok(bytes)
            }
            Err(error) => {
                warn!(%error, "Preview failed; keeping the previous one");
                Err(PreviewFailure {
                    error,
                    previous: self.last_preview.clone(),
                })
            }
        }
    }

    /// Render the final document from committed values.
    pub fn export(
        &self,
        bound: &BoundDocument,
        snapshot: &StoreSnapshot,
    ) -> Result<Vec<u8>, RenderError> {
        let values: BTreeMap<String, String> = snapshot
            .iter()
            .filter(|p| p.is_filled())
            .map(|p| (p.name.clone(), p.value.clone()))
            .collect();
        self.engine.render(bound.bytes(), &values)
    }

    /// The most recent successful preview.
    pub fn last_preview(&self) -> Option<Arc<[u8]>> {
        self.last_preview.clone()
    }
}

impl std::fmt::Debug for Materializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Materializer")
            .field("engine", &self.engine.name())
            .field("has_preview", &self.last_preview.is_some())
            .finish()
    }
}

/// Name of an exported file: `suffix` goes before the last extension.
///
/// `contract.docx` → `contract_filled.docx`, `notes` → `notes_filled`.
/// A leading dot does not start an extension.
pub fn filled_filename(original: &str, suffix: &str) -> String {
    match original.rfind('.') {
        Some(dot) if dot > 0 => format!("{}{suffix}{}", &original[..dot], &original[dot..]),
        _ => format!("{original}{suffix}"),
    }
}

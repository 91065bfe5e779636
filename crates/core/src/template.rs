//! Templating engine trait: the black box that understands a document
//! container.
//!
//! The engine knows how to find raw placeholder tokens, how to rewrite them,
//! and how to render a bound document with a set of values. Everything else
//! (identity binding, value reconciliation) is format-agnostic and lives in
//! `docfill-engine`.

use std::collections::BTreeMap;

use crate::error::{MalformedDocumentError, RenderError};
use crate::placeholder::PlaceholderToken;

/// The opening/closing pair that marks a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiters {
    pub open: char,
    pub close: char,
}

impl Delimiters {
    pub const BRACKETS: Delimiters = Delimiters {
        open: '[',
        close: ']',
    };

    /// Wrap a name into a tag, e.g. `email` → `[email]`.
    pub fn wrap(&self, name: &str) -> String {
        let mut tag = String::with_capacity(name.len() + 2);
        tag.push(self.open);
        tag.push_str(name);
        tag.push(self.close);
        tag
    }

    /// Remove delimiter characters so a name can sit safely inside a tag.
    pub fn strip(&self, name: &str) -> String {
        name.chars()
            .filter(|c| *c != self.open && *c != self.close)
            .collect()
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self::BRACKETS
    }
}

/// A document format + substitution engine.
///
/// Implementations: bracket-tagged UTF-8 text (`docfill-engine`).
pub trait TemplateEngine: Send + Sync {
    /// The engine name (e.g., "text").
    fn name(&self) -> &str;

    /// The delimiter pair tags are wrapped in.
    fn delimiters(&self) -> Delimiters;

    /// Find raw placeholder tokens in document order.
    fn scan(&self, document: &[u8]) -> Result<Vec<PlaceholderToken>, MalformedDocumentError>;

    /// Replace the i-th raw token with `tags[i]`, verbatim.
    ///
    /// `tags` must have exactly one entry per token returned by [`scan`](Self::scan).
    fn rewrite(&self, document: &[u8], tags: &[String]) -> Result<Vec<u8>, MalformedDocumentError>;

    /// Substitute every tag with its value.
    ///
    /// Tags with no entry in `values` are re-emitted wrapped in the delimiters.
    fn render(
        &self,
        document: &[u8],
        values: &BTreeMap<String, String>,
    ) -> Result<Vec<u8>, RenderError>;
}

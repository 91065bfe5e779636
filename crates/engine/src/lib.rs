//! # docfill Engine
//!
//! Placeholder identity binding and value reconciliation.
//!
//! - [`binder`] maps raw tokens to canonical names by occurrence order
//! - [`store`] owns committed values
//! - [`draft`] owns edit buffers and the derived dirty rule
//! - [`updates`] resolves external update records
//! - [`materializer`] renders previews and exports
//! - [`session`] composes all of the above for one uploaded document
//!
//! [`text_template`] is the bundled [`TemplateEngine`](docfill_core::TemplateEngine)
//! for bracket-tagged UTF-8 text.

pub mod binder;
pub mod draft;
pub mod materializer;
pub mod session;
pub mod store;
pub mod text_template;
pub mod updates;

pub use binder::{BindOptions, BoundDocument, DEFAULT_FALLBACK_PREFIX, bind, fallback_name};
pub use draft::DraftReconciler;
pub use materializer::{Materializer, PreviewFailure, ValueSource, filled_filename};
pub use session::{DEFAULT_HISTORY_LIMIT, DocumentSession, SessionOptions};
pub use store::{CommitOutcome, PlaceholderStore, StoreSnapshot};
pub use text_template::TextTemplateEngine;
pub use updates::{UpdateReport, apply_batch, resolve};

//! # docfill Core
//!
//! Domain types, traits, and error definitions for docfill.
//! This crate has **no I/O**: it defines the domain model that the engine,
//! the client and the CLI implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here:
//! - [`TemplateEngine`] understands a document container
//! - [`RemoteService`] extracts placeholder names and runs the agent
//! - [`CredentialStore`] keeps the credential on the local machine
//!
//! Implementations live in their respective crates, so tests can swap in
//! scripted stand-ins.

pub mod credential;
pub mod error;
pub mod event;
pub mod message;
pub mod placeholder;
pub mod service;
pub mod template;

// Re-export key types at crate root for ergonomics
pub use credential::{CredentialStore, CREDENTIAL_KEY};
pub use error::{
    CredentialError, Error, MalformedDocumentError, RenderError, Result, SyncError,
    UnresolvedUpdateError,
};
pub use event::{Notification, NotificationBus};
pub use message::{ChatMessage, ChatRole, ConversationLog};
pub use placeholder::{
    CanonicalPlaceholder, DuplicateNamePolicy, NamedValue, PlaceholderSpec, PlaceholderToken,
    UpdateRecord,
};
pub use service::{
    AgentReply, AgentRequest, BulkUpdateAck, RemoteService, SessionId, UploadRequest,
    UploadResponse,
};
pub use template::{Delimiters, TemplateEngine};

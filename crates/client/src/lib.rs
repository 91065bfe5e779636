//! # docfill Client
//!
//! Everything that talks to the outside world:
//! - [`http::HttpRemoteService`] for the extraction/agent backend
//! - [`credentials`] for the locally stored credential
//! - [`workspace::Workspace`], the event-driven controller that owns the
//!   current document session and turns every outcome into a notification

pub mod credentials;
pub mod http;
pub mod workspace;

pub use credentials::{FileCredentialStore, InMemoryCredentialStore};
pub use http::{HttpRemoteService, content_type_for};
pub use workspace::{Completion, UploadJob, Workspace, WorkspaceOptions};

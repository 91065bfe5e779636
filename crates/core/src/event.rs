//! User-visible notifications.
//!
//! Every operation boundary converts its outcome, success or failure, into a
//! [`Notification`]. Front-ends subscribe to the bus and decide how to show
//! them; nothing in the engine prints directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All notifications in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Notification {
    /// A document was bound and a new session replaced the previous one
    SessionStarted {
        session_id: String,
        filename: String,
        placeholders: usize,
        timestamp: DateTime<Utc>,
    },

    /// An upload failed; `retrying` when a retry has been scheduled
    UploadFailed {
        filename: String,
        reason: String,
        retrying: bool,
        timestamp: DateTime<Utc>,
    },

    /// Committed values were stored remotely
    Synced {
        session_id: String,
        names: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// Storing committed values remotely failed; the local commit stands
    SyncFailed {
        session_id: String,
        names: Vec<String>,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// The agent answered a chat message
    AgentReplied {
        session_id: String,
        message: String,
        applied: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// A chat message could not be delivered
    AgentFailed {
        session_id: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// An external update changed a value the user is still editing
    DraftKept {
        name: String,
        timestamp: DateTime<Utc>,
    },

    /// Materializing a document failed; the previous view is retained
    RenderFailed {
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A result arrived for a session that is no longer current
    StaleResultIgnored {
        session_id: String,
        operation: String,
        timestamp: DateTime<Utc>,
    },

    /// An operation was refused before it started
    Blocked {
        operation: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based bus for notifications.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct NotificationBus {
    sender: broadcast::Sender<Arc<Notification>>,
}

impl NotificationBus {
    /// Create a new bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a notification to all subscribers.
    pub fn publish(&self, notification: Notification) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(notification));
    }

    /// Subscribe to receive notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Notification>> {
        self.sender.subscribe()
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(256)
    }
}

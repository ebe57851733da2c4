//! Observable queue transitions.

use crate::{ContainerId, GrantStatus, LifecycleEvent, PermissionId, RequestToken};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Wrapper for events emitted by a permission queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEvent {
    /// Unique id for the event.
    pub id: Uuid,
    /// Container whose queue emitted the event.
    pub container_id: ContainerId,
    /// Timestamp when the event was created.
    pub created_at: DateTime<Utc>,
    /// Event payload content.
    pub payload: QueueEventPayload,
}

impl QueueEvent {
    /// Stamp a payload with a fresh id and the current time.
    pub fn new(container_id: ContainerId, payload: QueueEventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            container_id,
            created_at: Utc::now(),
            payload,
        }
    }
}

/// All transitions a queue reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "payload")]
pub enum QueueEventPayload {
    /// A new entry was appended to the pending queue.
    Enqueued {
        token: RequestToken,
        permissions: Vec<PermissionId>,
    },
    /// A duplicate request joined an existing entry.
    Shared {
        token: RequestToken,
        listeners: usize,
    },
    /// An entry moved into the in-flight slot and was sent to the host.
    Issued {
        token: RequestToken,
        permissions: Vec<PermissionId>,
    },
    /// The host answered the in-flight entry.
    Resolved {
        token: RequestToken,
        results: Vec<GrantStatus>,
    },
    /// The in-flight entry was cancelled by a lifecycle signal.
    Cancelled {
        token: RequestToken,
        reason: LifecycleEvent,
    },
    /// A result arrived for a token that is not in flight.
    StaleResult { token: RequestToken },
    /// Pending entries dropped at permanent teardown.
    Discarded { tokens: Vec<RequestToken> },
}

/// Sink for queue events.
pub trait EventSink: Send + Sync {
    /// Emit a queue event.
    fn emit(&self, event: QueueEvent);
}

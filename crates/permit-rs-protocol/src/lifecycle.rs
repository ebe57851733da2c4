//! Container lifecycle signals consumed by the queue.

use serde::{Deserialize, Serialize};

/// Zero-argument lifecycle notification from the owning container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// Container attached to its host.
    Attach,
    /// Container finished creation.
    Created,
    /// Container view is ready.
    ViewReady,
    /// Container view was destroyed; the container itself may come back.
    ViewDestroyed,
    /// Container detached from its host.
    Detach,
    /// Permanent teardown. No further signals follow.
    Destroy,
}

impl LifecycleEvent {
    /// Signals after which the container may have become eligible to issue.
    pub fn is_activation(self) -> bool {
        matches!(
            self,
            LifecycleEvent::Attach | LifecycleEvent::Created | LifecycleEvent::ViewReady
        )
    }

    /// Signals that cancel the in-flight request.
    pub fn cancels_in_flight(self) -> bool {
        matches!(
            self,
            LifecycleEvent::ViewDestroyed | LifecycleEvent::Detach | LifecycleEvent::Destroy
        )
    }

    /// The only signal that also discards pending requests.
    pub fn is_terminal(self) -> bool {
        matches!(self, LifecycleEvent::Destroy)
    }
}

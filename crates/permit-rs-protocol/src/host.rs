//! Seams to the host permission subsystem and the owning UI container.

use crate::{ContainerId, GrantRequest, GrantStatus, PermissionId};
use std::sync::Arc;

/// Host permission subsystem.
///
/// `request_grant` is fire-and-forget: the host answers later, exactly once per
/// request, by handing the echoed token and positional results back to the
/// queue that issued it.
pub trait PermissionHost: Send + Sync {
    /// Synchronous, side-effect-free grant check for one permission.
    fn check_granted(&self, permission: &PermissionId) -> GrantStatus;

    /// Show the host dialog for the request.
    fn request_grant(&self, request: GrantRequest);
}

/// Owning UI container that all request state is scoped to.
pub trait Container: Send + Sync {
    /// Stable identity of this container instance.
    fn id(&self) -> ContainerId;

    /// Attached to its host.
    fn is_attached(&self) -> bool;

    /// In the middle of being removed.
    fn is_removing(&self) -> bool;

    /// Detached from its host.
    fn is_detached(&self) -> bool;

    /// Whether a new host dialog may be shown for this container right now.
    fn can_issue(&self) -> bool {
        self.is_attached() && !self.is_removing() && !self.is_detached()
    }
}

/// Nested scope (e.g. a sub-screen) that may or may not have an owning container.
pub trait NestedScope: Send + Sync {
    /// The container that owns this scope, if it is currently attached to one.
    fn owner(&self) -> Option<Arc<dyn Container>>;
}

//! Shared types for permission requests, grant results, and queue events.
//!
//! Also hosts the trait seams to the platform (`PermissionHost`, `Container`,
//! `NestedScope`) so test doubles can implement them without depending on core.

mod event;
mod host;
mod lifecycle;

pub use event::{EventSink, QueueEvent, QueueEventPayload};
pub use host::{Container, NestedScope, PermissionHost};
pub use lifecycle::LifecycleEvent;

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an owning UI container.
pub type ContainerId = Uuid;

/// Opaque name of one host-guarded capability (e.g. "location").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionId(String);

impl PermissionId {
    /// Create a permission id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PermissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PermissionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PermissionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Host-determined status for a single permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantStatus {
    /// The host granted the permission.
    Granted,
    /// The host denied the permission.
    Denied,
}

impl GrantStatus {
    /// True when the permission is granted.
    pub fn is_granted(self) -> bool {
        matches!(self, GrantStatus::Granted)
    }
}

/// Correlates an issued host request with its eventual result callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestToken(u64);

impl RequestToken {
    /// Wrap a raw token value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw token value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Request forwarded to the host permission subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantRequest {
    /// Container whose queue issued the request.
    pub container_id: ContainerId,
    /// Token the host must echo back with the result.
    pub token: RequestToken,
    /// Ordered permissions; results are aligned positionally.
    pub permissions: Vec<PermissionId>,
}

/// Build an ordered permission list from string slices.
pub fn permission_list<I, S>(ids: I) -> Vec<PermissionId>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    ids.into_iter().map(PermissionId::new).collect()
}

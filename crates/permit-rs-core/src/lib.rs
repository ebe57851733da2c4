//! Request queuing and result dispatch for host permission dialogs.
//!
//! `PermissionGateway` is the caller-facing entry point: it short-circuits
//! already-granted sets and otherwise parks the caller on a per-container
//! `PermissionQueue`, which issues one host dialog at a time and routes each
//! result back to the callers waiting on it.

pub mod error;
pub mod gateway;
pub mod queue;
pub mod registry;

pub use error::PermitError;
pub use gateway::PermissionGateway;
pub use queue::{GrantOutcome, GrantWaiter, PermissionQueue, QueueState};
pub use registry::QueueRegistry;

/// Seams and vocabulary shared with hosts.
pub use permit_rs_protocol::{
    Container, ContainerId, EventSink, GrantRequest, GrantStatus, LifecycleEvent, NestedScope,
    PermissionHost, PermissionId, RequestToken,
};

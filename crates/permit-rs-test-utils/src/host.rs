use parking_lot::Mutex;
use permit_rs_protocol::{GrantRequest, GrantStatus, PermissionHost, PermissionId};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Host that answers grant checks from a fixed set and records every dialog request.
///
/// Results are never delivered automatically; tests feed them back to the queue.
#[derive(Debug, Default)]
pub struct RecordingHost {
    granted: Mutex<HashSet<PermissionId>>,
    requests: Mutex<Vec<GrantRequest>>,
    checks: AtomicUsize,
}

impl RecordingHost {
    /// Host with nothing granted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Host with `ids` already granted.
    pub fn with_granted<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let host = Self::new();
        for id in ids {
            host.grant(PermissionId::new(id));
        }
        host
    }

    /// Mark a permission as granted.
    pub fn grant(&self, permission: PermissionId) {
        self.granted.lock().insert(permission);
    }

    /// Every dialog request, oldest first.
    pub fn requests(&self) -> Vec<GrantRequest> {
        self.requests.lock().clone()
    }

    /// Most recent dialog request.
    pub fn last_request(&self) -> Option<GrantRequest> {
        self.requests.lock().last().cloned()
    }

    /// Number of dialog requests seen.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Number of grant checks seen.
    pub fn check_count(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

impl PermissionHost for RecordingHost {
    fn check_granted(&self, permission: &PermissionId) -> GrantStatus {
        self.checks.fetch_add(1, Ordering::SeqCst);
        if self.granted.lock().contains(permission) {
            GrantStatus::Granted
        } else {
            GrantStatus::Denied
        }
    }

    fn request_grant(&self, request: GrantRequest) {
        self.requests.lock().push(request);
    }
}

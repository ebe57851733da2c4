//! Simulated host subsystem and container used by the demo binary.

use log::{debug, info, warn};
use parking_lot::RwLock;
use permit_rs::PermissionGateway;
use permit_rs_core::{
    Container, ContainerId, EventSink, GrantRequest, GrantStatus, PermissionHost, PermissionId,
};
use permit_rs_protocol::QueueEvent;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Host whose dialogs are answered by `run_dialogs` after a delay.
pub(crate) struct DialogHost {
    granted: RwLock<HashSet<PermissionId>>,
    denied: HashSet<PermissionId>,
    requests: mpsc::UnboundedSender<GrantRequest>,
}

impl DialogHost {
    pub(crate) fn new(
        granted: impl IntoIterator<Item = String>,
        denied: impl IntoIterator<Item = String>,
    ) -> (Self, mpsc::UnboundedReceiver<GrantRequest>) {
        let (requests, receiver) = mpsc::unbounded_channel();
        let host = Self {
            granted: RwLock::new(granted.into_iter().map(PermissionId::new).collect()),
            denied: denied.into_iter().map(PermissionId::new).collect(),
            requests,
        };
        (host, receiver)
    }

    /// The user's answer for one permission; grants are remembered.
    fn decide(&self, permission: &PermissionId) -> GrantStatus {
        if self.denied.contains(permission) {
            return GrantStatus::Denied;
        }
        self.granted.write().insert(permission.clone());
        GrantStatus::Granted
    }
}

impl PermissionHost for DialogHost {
    fn check_granted(&self, permission: &PermissionId) -> GrantStatus {
        if self.granted.read().contains(permission) {
            GrantStatus::Granted
        } else {
            GrantStatus::Denied
        }
    }

    fn request_grant(&self, request: GrantRequest) {
        if self.requests.send(request).is_err() {
            warn!("dialog loop stopped; dropping grant request");
        }
    }
}

/// Answer each dialog after `delay`, delivering the result through the gateway.
pub(crate) async fn run_dialogs(
    mut requests: mpsc::UnboundedReceiver<GrantRequest>,
    host: Arc<DialogHost>,
    gateway: Weak<PermissionGateway>,
    delay: Duration,
) {
    while let Some(request) = requests.recv().await {
        info!(
            "showing dialog (token={}, permissions={:?})",
            request.token, request.permissions
        );
        tokio::time::sleep(delay).await;
        let results = request
            .permissions
            .iter()
            .map(|permission| host.decide(permission))
            .collect();
        let Some(gateway) = gateway.upgrade() else {
            break;
        };
        gateway.on_result(
            request.container_id,
            request.token,
            &request.permissions,
            results,
        );
    }
}

/// Container standing in for the application screen.
pub(crate) struct DemoContainer {
    id: ContainerId,
    attached: AtomicBool,
    removing: AtomicBool,
    detached: AtomicBool,
}

impl DemoContainer {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            attached: AtomicBool::new(false),
            removing: AtomicBool::new(false),
            detached: AtomicBool::new(false),
        })
    }

    pub(crate) fn attach(&self) {
        self.attached.store(true, Ordering::SeqCst);
        self.detached.store(false, Ordering::SeqCst);
    }

    pub(crate) fn tear_down(&self) {
        self.removing.store(true, Ordering::SeqCst);
        self.attached.store(false, Ordering::SeqCst);
        self.detached.store(true, Ordering::SeqCst);
    }
}

impl Container for DemoContainer {
    fn id(&self) -> ContainerId {
        self.id
    }

    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    fn is_removing(&self) -> bool {
        self.removing.load(Ordering::SeqCst)
    }

    fn is_detached(&self) -> bool {
        self.detached.load(Ordering::SeqCst)
    }
}

/// Writes every queue event to the debug log as JSON.
pub(crate) struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: QueueEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => debug!("queue event: {json}"),
            Err(err) => warn!("failed to encode queue event: {err}"),
        }
    }
}

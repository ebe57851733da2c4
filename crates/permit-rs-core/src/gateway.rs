//! Caller-facing entry point for permission requests.

use crate::error::PermitError;
use crate::queue::GrantOutcome;
use crate::registry::QueueRegistry;
use log::debug;
use permit_rs_config::{GatewayConfig, PermitConfig};
use permit_rs_protocol::{
    Container, ContainerId, EventSink, GrantStatus, LifecycleEvent, NestedScope, PermissionHost,
    PermissionId, RequestToken,
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Turns the host's dialog-and-callback flow into a single awaitable call.
pub struct PermissionGateway {
    host: Arc<dyn PermissionHost>,
    config: GatewayConfig,
    registry: QueueRegistry,
}

impl PermissionGateway {
    /// Create a gateway that issues dialogs through `host`.
    ///
    /// The config is validated first, so programmatic configs get the same
    /// checks as loaded ones.
    pub fn new(host: Arc<dyn PermissionHost>, config: PermitConfig) -> Result<Self, PermitError> {
        config.validate()?;
        Ok(Self {
            registry: QueueRegistry::new(host.clone(), config.queue),
            host,
            config: config.gateway,
        })
    }

    /// Create a gateway from the layered config discovered from `cwd`.
    pub fn from_layered_config(
        host: Arc<dyn PermissionHost>,
        cwd: impl AsRef<Path>,
    ) -> Result<Self, PermitError> {
        let layered = PermitConfig::load_layered(cwd)?;
        Self::new(host, layered.config)
    }

    /// Attach an event sink observing every queue.
    pub fn with_event_sink(self, sink: Arc<dyn EventSink>) -> Self {
        self.registry.set_event_sink(Some(sink));
        self
    }

    /// Per-container queues.
    pub fn registry(&self) -> &QueueRegistry {
        &self.registry
    }

    /// Request `permissions` for `container` and wait for the grant results.
    ///
    /// Results are aligned positionally with `permissions`. Denials are `Ok`;
    /// `Err(PermitError::Cancelled)` means the container was torn down first.
    pub async fn request_permissions(
        &self,
        container: &Arc<dyn Container>,
        permissions: Vec<PermissionId>,
    ) -> GrantOutcome {
        if permissions.is_empty() {
            return Err(PermitError::EmptyRequest);
        }
        if self.config.fast_path && self.all_granted(&permissions) {
            debug!(
                "all permissions already granted (container_id={}, permissions={:?})",
                container.id(),
                permissions
            );
            return Ok(vec![GrantStatus::Granted; permissions.len()]);
        }

        let queue = self.registry.get_or_create(container);
        let (waiter, receiver) = oneshot::channel();
        queue.enqueue(waiter, permissions);
        receiver.await.unwrap_or(Err(PermitError::Cancelled))
    }

    /// Request through a nested scope; `None` when it has no owning container.
    pub async fn request_permissions_in(
        &self,
        scope: &dyn NestedScope,
        permissions: Vec<PermissionId>,
    ) -> Option<GrantOutcome> {
        let Some(owner) = scope.owner() else {
            debug!("nested scope has no owning container; skipping request");
            return None;
        };
        Some(self.request_permissions(&owner, permissions).await)
    }

    /// Deliver a container lifecycle signal.
    pub fn on_lifecycle_event(&self, container_id: ContainerId, event: LifecycleEvent) {
        self.registry.dispatch_lifecycle(container_id, event);
    }

    /// Deliver the host's answer for an issued request.
    pub fn on_result(
        &self,
        container_id: ContainerId,
        token: RequestToken,
        permissions: &[PermissionId],
        results: Vec<GrantStatus>,
    ) {
        self.registry
            .dispatch_result(container_id, token, permissions, results);
    }

    fn all_granted(&self, permissions: &[PermissionId]) -> bool {
        permissions
            .iter()
            .all(|permission| self.host.check_granted(permission).is_granted())
    }
}

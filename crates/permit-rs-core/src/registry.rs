//! Registry mapping container identity to its permission queue.

use crate::queue::PermissionQueue;
use log::{debug, info};
use parking_lot::RwLock;
use permit_rs_config::QueueConfig;
use permit_rs_protocol::{
    Container, ContainerId, EventSink, GrantStatus, LifecycleEvent, PermissionHost, PermissionId,
    RequestToken,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Found-or-created queues, one per live container.
pub struct QueueRegistry {
    host: Arc<dyn PermissionHost>,
    config: QueueConfig,
    queues: RwLock<HashMap<ContainerId, Arc<PermissionQueue>>>,
    event_sink: RwLock<Option<Arc<dyn EventSink>>>,
}

impl QueueRegistry {
    /// Create an empty registry issuing through `host`.
    pub fn new(host: Arc<dyn PermissionHost>, config: QueueConfig) -> Self {
        Self {
            host,
            config,
            queues: RwLock::new(HashMap::new()),
            event_sink: RwLock::new(None),
        }
    }

    /// Attach an event sink to current and future queues.
    pub fn set_event_sink(&self, sink: Option<Arc<dyn EventSink>>) {
        *self.event_sink.write() = sink.clone();
        for queue in self.queues.read().values() {
            queue.set_event_sink(sink.clone());
        }
    }

    /// Return the live queue for `container`, creating it on first use.
    ///
    /// A queue retired by a destroy signal is replaced, so a recreated
    /// container that reuses its identity gets a fresh queue.
    pub fn get_or_create(&self, container: &Arc<dyn Container>) -> Arc<PermissionQueue> {
        let container_id = container.id();
        if let Some(queue) = self.get(container_id) {
            return queue;
        }

        let mut queues = self.queues.write();
        if let Some(queue) = queues.get(&container_id)
            && !queue.is_destroyed()
        {
            return queue.clone();
        }
        let queue = Arc::new(PermissionQueue::new(
            container.clone(),
            self.host.clone(),
            self.config.clone(),
        ));
        queue.set_event_sink(self.event_sink.read().clone());
        queues.insert(container_id, queue.clone());
        info!(
            "registered permission queue (container_id={}, queues={})",
            container_id,
            queues.len()
        );
        queue
    }

    /// Live queue for a container, if one exists.
    pub fn get(&self, container_id: ContainerId) -> Option<Arc<PermissionQueue>> {
        self.queues
            .read()
            .get(&container_id)
            .filter(|queue| !queue.is_destroyed())
            .cloned()
    }

    /// Forward a lifecycle signal; a destroy signal also drops the entry.
    pub fn dispatch_lifecycle(&self, container_id: ContainerId, event: LifecycleEvent) {
        let queue = if event.is_terminal() {
            let removed = self.queues.write().remove(&container_id);
            if removed.is_some() {
                info!("discarding permission queue (container_id={container_id})");
            }
            removed
        } else {
            self.get(container_id)
        };
        match queue {
            Some(queue) => queue.on_lifecycle_event(event),
            None => debug!(
                "lifecycle event for container without queue (container_id={}, event={:?})",
                container_id, event
            ),
        }
    }

    /// Forward a host result; results for unknown containers are dropped.
    pub fn dispatch_result(
        &self,
        container_id: ContainerId,
        token: RequestToken,
        permissions: &[PermissionId],
        results: Vec<GrantStatus>,
    ) {
        match self.get(container_id) {
            Some(queue) => queue.on_result(token, permissions, results),
            None => debug!(
                "ignoring result for container without queue (container_id={}, token={})",
                container_id, token
            ),
        }
    }

    /// Number of registered queues.
    pub fn len(&self) -> usize {
        self.queues.read().len()
    }

    /// Whether no queue is registered.
    pub fn is_empty(&self) -> bool {
        self.queues.read().is_empty()
    }
}

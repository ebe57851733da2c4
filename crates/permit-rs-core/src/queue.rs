//! Per-container permission queue.
//!
//! Holds the pending FIFO and the single in-flight slot for one container.
//! Every entry point mutates state under one lock, so calls arriving from the
//! host callback thread and from lifecycle notifications are serialized.
//!
//! Side effects (sink events and host dialogs) are appended to an outbox under
//! that lock and performed in order by a single drainer with the lock released,
//! so a host or sink may call back into the queue synchronously. A dialog is
//! forwarded only if its request is still in flight when its turn comes.

use crate::error::PermitError;
use log::{debug, info, warn};
use parking_lot::{Mutex, MutexGuard, RwLock};
use permit_rs_config::QueueConfig;
use permit_rs_protocol::{
    Container, ContainerId, EventSink, GrantRequest, GrantStatus, LifecycleEvent, PermissionHost,
    PermissionId, QueueEvent, QueueEventPayload, RequestToken,
};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::oneshot;

/// What a waiting caller eventually receives.
pub type GrantOutcome = Result<Vec<GrantStatus>, PermitError>;

/// Single-resolution handle the queue resolves for a caller.
pub type GrantWaiter = oneshot::Sender<GrantOutcome>;

/// Coarse state of a queue, derived from its slots and the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    /// Nothing in flight and the container cannot issue right now.
    Idle,
    /// Nothing in flight and the container may issue.
    Eligible,
    /// A host dialog is awaiting its result.
    InFlight,
}

/// One distinct permission set and every caller waiting on it.
#[derive(Debug)]
struct PendingRequest {
    token: RequestToken,
    permissions: Vec<PermissionId>,
    waiters: Vec<GrantWaiter>,
}

impl PendingRequest {
    fn resolve(self, results: &[GrantStatus]) {
        for waiter in self.waiters {
            // A dropped receiver means the caller stopped waiting.
            let _ = waiter.send(Ok(results.to_vec()));
        }
    }

    fn cancel(self) {
        for waiter in self.waiters {
            let _ = waiter.send(Err(PermitError::Cancelled));
        }
    }
}

/// Work performed outside the lock, in the order it was decided.
#[derive(Debug)]
enum Effect {
    Emit(QueueEventPayload),
    Issue(GrantRequest),
}

#[derive(Debug)]
struct QueueSlots {
    last_token: u64,
    pending: VecDeque<PendingRequest>,
    in_flight: Option<PendingRequest>,
    destroyed: bool,
    outbox: VecDeque<Effect>,
    draining: bool,
}

impl QueueSlots {
    /// Next token, or `None` once the counter is exhausted.
    fn next_token(&mut self) -> Option<RequestToken> {
        self.last_token = self.last_token.checked_add(1)?;
        Some(RequestToken::new(self.last_token))
    }

    fn is_in_flight(&self, token: RequestToken) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|entry| entry.token == token)
    }

    fn emit(&mut self, payload: QueueEventPayload) {
        self.outbox.push_back(Effect::Emit(payload));
    }

    fn find_duplicate(
        &mut self,
        permissions: &[PermissionId],
        include_in_flight: bool,
    ) -> Option<&mut PendingRequest> {
        if include_in_flight
            && let Some(entry) = self
                .in_flight
                .as_mut()
                .filter(|entry| entry.permissions == permissions)
        {
            return Some(entry);
        }
        self.pending
            .iter_mut()
            .find(|entry| entry.permissions == permissions)
    }
}

/// Queue manager bound to one owning container.
pub struct PermissionQueue {
    container: Arc<dyn Container>,
    host: Arc<dyn PermissionHost>,
    config: QueueConfig,
    slots: Mutex<QueueSlots>,
    event_sink: RwLock<Option<Arc<dyn EventSink>>>,
}

impl PermissionQueue {
    /// Create an empty queue for a container.
    pub fn new(
        container: Arc<dyn Container>,
        host: Arc<dyn PermissionHost>,
        config: QueueConfig,
    ) -> Self {
        debug!(
            "permission queue created (container_id={}, first_token={})",
            container.id(),
            config.first_token
        );
        Self {
            slots: Mutex::new(QueueSlots {
                last_token: config.first_token,
                pending: VecDeque::new(),
                in_flight: None,
                destroyed: false,
                outbox: VecDeque::new(),
                draining: false,
            }),
            container,
            host,
            config,
            event_sink: RwLock::new(None),
        }
    }

    /// Attach an event sink for queue transitions.
    pub fn set_event_sink(&self, sink: Option<Arc<dyn EventSink>>) {
        *self.event_sink.write() = sink;
    }

    /// Identity of the owning container.
    pub fn container_id(&self) -> ContainerId {
        self.container.id()
    }

    /// Register a caller for a permission set and issue it if possible.
    ///
    /// A set structurally equal to a queued one (or the in-flight one, when
    /// `share_in_flight` is on) joins that entry instead of creating a new one;
    /// all of its callers resolve together. A destroyed queue cancels at once,
    /// and a queue whose token counter is exhausted fails the caller.
    pub fn enqueue(&self, waiter: GrantWaiter, permissions: Vec<PermissionId>) {
        let mut slots = self.slots.lock();
        if slots.destroyed {
            drop(slots);
            warn!(
                "enqueue on destroyed queue (container_id={})",
                self.container_id()
            );
            let _ = waiter.send(Err(PermitError::Cancelled));
            return;
        }

        if let Some(existing) = slots.find_duplicate(&permissions, self.config.share_in_flight) {
            existing.waiters.push(waiter);
            let (token, listeners) = (existing.token, existing.waiters.len());
            debug!(
                "duplicate request joined existing entry (token={}, listeners={})",
                token, listeners
            );
            slots.emit(QueueEventPayload::Shared { token, listeners });
        } else {
            let Some(token) = slots.next_token() else {
                drop(slots);
                warn!(
                    "request tokens exhausted (container_id={})",
                    self.container_id()
                );
                let _ = waiter.send(Err(PermitError::TokensExhausted));
                return;
            };
            debug!(
                "request enqueued (container_id={}, token={}, permissions={:?})",
                self.container_id(),
                token,
                permissions
            );
            slots.emit(QueueEventPayload::Enqueued {
                token,
                permissions: permissions.clone(),
            });
            slots.pending.push_back(PendingRequest {
                token,
                permissions,
                waiters: vec![waiter],
            });
        }
        self.try_issue(&mut slots);
        self.drain(slots);
    }

    /// Host callback: resolve the in-flight entry if `token` matches it.
    ///
    /// Results for any other token are stale and change nothing.
    pub fn on_result(
        &self,
        token: RequestToken,
        permissions: &[PermissionId],
        results: Vec<GrantStatus>,
    ) {
        let mut slots = self.slots.lock();
        match slots.in_flight.take() {
            Some(entry) if entry.token == token => {
                if entry.permissions != permissions {
                    warn!(
                        "result permissions differ from request (token={}, requested={:?}, echoed={:?})",
                        token, entry.permissions, permissions
                    );
                }
                if results.len() != entry.permissions.len() {
                    warn!(
                        "result length differs from request (token={}, expected={}, got={})",
                        token,
                        entry.permissions.len(),
                        results.len()
                    );
                }
                info!(
                    "permission result delivered (container_id={}, token={}, results={:?}, listeners={})",
                    self.container_id(),
                    token,
                    results,
                    entry.waiters.len()
                );
                entry.resolve(&results);
                slots.emit(QueueEventPayload::Resolved { token, results });
                self.try_issue(&mut slots);
            }
            other => {
                slots.in_flight = other;
                debug!(
                    "ignoring stale result (container_id={}, token={})",
                    self.container_id(),
                    token
                );
                slots.emit(QueueEventPayload::StaleResult { token });
            }
        }
        self.drain(slots);
    }

    /// React to a container lifecycle signal.
    ///
    /// Activation signals retry issuing. View-destroyed, detach and destroy
    /// cancel the in-flight caller; only destroy also discards pending entries
    /// and retires the queue.
    pub fn on_lifecycle_event(&self, event: LifecycleEvent) {
        let mut slots = self.slots.lock();

        if event.cancels_in_flight()
            && let Some(entry) = slots.in_flight.take()
        {
            info!(
                "in-flight request cancelled (container_id={}, token={}, event={:?})",
                self.container_id(),
                entry.token,
                event
            );
            slots.emit(QueueEventPayload::Cancelled {
                token: entry.token,
                reason: event,
            });
            entry.cancel();
        }

        if event.is_terminal() {
            slots.destroyed = true;
            let discarded: Vec<PendingRequest> = slots.pending.drain(..).collect();
            if !discarded.is_empty() {
                let tokens: Vec<RequestToken> = discarded.iter().map(|entry| entry.token).collect();
                info!(
                    "pending requests discarded (container_id={}, tokens={:?})",
                    self.container_id(),
                    tokens
                );
                slots.emit(QueueEventPayload::Discarded { tokens });
                for entry in discarded {
                    entry.cancel();
                }
            }
        }

        if event.is_activation() {
            self.try_issue(&mut slots);
        }
        self.drain(slots);
    }

    /// Current coarse state.
    pub fn state(&self) -> QueueState {
        let slots = self.slots.lock();
        if slots.in_flight.is_some() {
            QueueState::InFlight
        } else if !slots.destroyed && self.container.can_issue() {
            QueueState::Eligible
        } else {
            QueueState::Idle
        }
    }

    /// Number of distinct permission sets waiting to be issued.
    pub fn pending_len(&self) -> usize {
        self.slots.lock().pending.len()
    }

    /// Tokens waiting to be issued, oldest first.
    pub fn pending_tokens(&self) -> Vec<RequestToken> {
        self.slots
            .lock()
            .pending
            .iter()
            .map(|entry| entry.token)
            .collect()
    }

    /// Token of the request currently shown by the host, if any.
    pub fn in_flight_token(&self) -> Option<RequestToken> {
        self.slots.lock().in_flight.as_ref().map(|entry| entry.token)
    }

    /// Whether a destroy signal retired this queue.
    pub fn is_destroyed(&self) -> bool {
        self.slots.lock().destroyed
    }

    /// Move the oldest pending entry into the in-flight slot when allowed.
    fn try_issue(&self, slots: &mut QueueSlots) {
        if slots.destroyed || slots.in_flight.is_some() || !self.container.can_issue() {
            return;
        }
        let Some(entry) = slots.pending.pop_front() else {
            return;
        };
        info!(
            "issuing permission request (container_id={}, token={}, permissions={:?})",
            self.container_id(),
            entry.token,
            entry.permissions
        );
        slots.emit(QueueEventPayload::Issued {
            token: entry.token,
            permissions: entry.permissions.clone(),
        });
        slots.outbox.push_back(Effect::Issue(GrantRequest {
            container_id: self.container_id(),
            token: entry.token,
            permissions: entry.permissions.clone(),
        }));
        slots.in_flight = Some(entry);
    }

    /// Perform queued effects in order with the lock released.
    ///
    /// Only one caller drains at a time; a call that re-enters from the host
    /// or the sink leaves its effects for the active drainer.
    fn drain<'a>(&'a self, mut slots: MutexGuard<'a, QueueSlots>) {
        if slots.draining {
            return;
        }
        slots.draining = true;
        loop {
            let Some(effect) = slots.outbox.pop_front() else {
                break;
            };
            match effect {
                Effect::Emit(payload) => {
                    drop(slots);
                    self.emit(payload);
                }
                Effect::Issue(request) => {
                    let live = slots.is_in_flight(request.token);
                    drop(slots);
                    if live {
                        self.host.request_grant(request);
                    } else {
                        debug!(
                            "dropping superseded grant request (container_id={}, token={})",
                            request.container_id, request.token
                        );
                    }
                }
            }
            slots = self.slots.lock();
        }
        slots.draining = false;
    }

    fn emit(&self, payload: QueueEventPayload) {
        let sink = self.event_sink.read().clone();
        if let Some(sink) = sink {
            sink.emit(QueueEvent::new(self.container_id(), payload));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use permit_rs_protocol::permission_list;
    use permit_rs_test_utils::{FakeContainer, RecordingHost, RecordingSink};
    use pretty_assertions::assert_eq;
    use std::sync::{OnceLock, Weak};
    use tokio::sync::oneshot::error::TryRecvError;

    type Receiver = oneshot::Receiver<GrantOutcome>;

    fn queue(container: &Arc<FakeContainer>, host: &Arc<RecordingHost>) -> PermissionQueue {
        queue_with_config(container, host, QueueConfig::default())
    }

    fn queue_with_config(
        container: &Arc<FakeContainer>,
        host: &Arc<RecordingHost>,
        config: QueueConfig,
    ) -> PermissionQueue {
        PermissionQueue::new(container.clone(), host.clone(), config)
    }

    fn submit(queue: &PermissionQueue, ids: &[&str]) -> Receiver {
        let (waiter, receiver) = oneshot::channel();
        queue.enqueue(waiter, permission_list(ids.iter().copied()));
        receiver
    }

    fn granted(receiver: &mut Receiver) -> Vec<GrantStatus> {
        match receiver.try_recv() {
            Ok(Ok(results)) => results,
            other => panic!("expected results, got {other:?}"),
        }
    }

    fn assert_cancelled(receiver: &mut Receiver) {
        assert!(matches!(
            receiver.try_recv(),
            Ok(Err(PermitError::Cancelled))
        ));
    }

    #[test]
    fn issues_immediately_when_eligible() {
        let container = FakeContainer::attached();
        let host = Arc::new(RecordingHost::new());
        let queue = queue(&container, &host);
        assert_eq!(queue.state(), QueueState::Eligible);

        let mut receiver = submit(&queue, &["CAMERA"]);

        let request = host.last_request().expect("issued");
        assert_eq!(request.token, RequestToken::new(11));
        assert_eq!(request.container_id, container.id());
        assert_eq!(request.permissions, permission_list(["CAMERA"]));
        assert_eq!(queue.state(), QueueState::InFlight);
        assert_eq!(queue.pending_len(), 0);
        assert_eq!(receiver.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    #[test]
    fn token_base_comes_from_config() {
        let container = FakeContainer::attached();
        let host = Arc::new(RecordingHost::new());
        let queue = queue_with_config(
            &container,
            &host,
            QueueConfig {
                first_token: 500,
                share_in_flight: true,
            },
        );
        let _receiver = submit(&queue, &["CAMERA"]);
        assert_eq!(queue.in_flight_token(), Some(RequestToken::new(501)));
    }

    #[test]
    fn issues_one_at_a_time_in_fifo_order() {
        let container = FakeContainer::attached();
        let host = Arc::new(RecordingHost::new());
        let queue = queue(&container, &host);

        let mut first = submit(&queue, &["A"]);
        let mut second = submit(&queue, &["B"]);
        let mut third = submit(&queue, &["C"]);
        assert_eq!(host.request_count(), 1);
        assert_eq!(
            queue.pending_tokens(),
            vec![RequestToken::new(12), RequestToken::new(13)]
        );

        let mut answers = vec![GrantStatus::Granted, GrantStatus::Denied, GrantStatus::Granted];
        for receiver in [&mut first, &mut second, &mut third] {
            let request = host.last_request().expect("issued");
            let answer = answers.remove(0);
            queue.on_result(request.token, &request.permissions, vec![answer]);
            assert_eq!(granted(receiver), vec![answer]);
        }

        let issued: Vec<_> = host
            .requests()
            .into_iter()
            .map(|request| (request.token.get(), request.permissions))
            .collect();
        assert_eq!(
            issued,
            vec![
                (11, permission_list(["A"])),
                (12, permission_list(["B"])),
                (13, permission_list(["C"])),
            ]
        );
        assert_eq!(queue.state(), QueueState::Eligible);
    }

    #[test]
    fn waits_until_container_can_issue() {
        let container = FakeContainer::unattached();
        let host = Arc::new(RecordingHost::new());
        let queue = queue(&container, &host);

        let _receiver = submit(&queue, &["A"]);
        assert_eq!(queue.state(), QueueState::Idle);
        assert_eq!(host.request_count(), 0);

        container.set_attached(true);
        container.set_removing(true);
        queue.on_lifecycle_event(LifecycleEvent::Attach);
        assert_eq!(host.request_count(), 0);

        container.set_removing(false);
        container.set_detached(true);
        queue.on_lifecycle_event(LifecycleEvent::Created);
        assert_eq!(host.request_count(), 0);

        container.set_detached(false);
        queue.on_lifecycle_event(LifecycleEvent::ViewReady);
        assert_eq!(host.request_count(), 1);
        assert_eq!(queue.state(), QueueState::InFlight);
    }

    #[test]
    fn duplicate_pending_request_shares_the_entry() {
        let container = FakeContainer::unattached();
        let host = Arc::new(RecordingHost::new());
        let queue = queue(&container, &host);

        let mut first = submit(&queue, &["LOCATION_FINE", "LOCATION_COARSE"]);
        let mut second = submit(&queue, &["LOCATION_FINE", "LOCATION_COARSE"]);
        assert_eq!(queue.pending_len(), 1);

        container.set_attached(true);
        queue.on_lifecycle_event(LifecycleEvent::Attach);
        assert_eq!(host.request_count(), 1);

        let request = host.last_request().expect("issued");
        let results = vec![GrantStatus::Granted, GrantStatus::Denied];
        queue.on_result(request.token, &request.permissions, results.clone());
        assert_eq!(granted(&mut first), results);
        assert_eq!(granted(&mut second), results);
        assert_eq!(host.request_count(), 1);
    }

    #[test]
    fn order_matters_for_duplicates() {
        let container = FakeContainer::unattached();
        let host = Arc::new(RecordingHost::new());
        let queue = queue(&container, &host);

        let _first = submit(&queue, &["A", "B"]);
        let _second = submit(&queue, &["B", "A"]);
        assert_eq!(queue.pending_len(), 2);
    }

    #[test]
    fn duplicate_of_in_flight_joins_it() {
        let container = FakeContainer::attached();
        let host = Arc::new(RecordingHost::new());
        let queue = queue(&container, &host);

        let mut first = submit(&queue, &["A"]);
        let mut second = submit(&queue, &["A"]);
        assert_eq!(queue.pending_len(), 0);

        let request = host.last_request().expect("issued");
        queue.on_result(request.token, &request.permissions, vec![GrantStatus::Granted]);
        assert_eq!(granted(&mut first), vec![GrantStatus::Granted]);
        assert_eq!(granted(&mut second), vec![GrantStatus::Granted]);
        assert_eq!(host.request_count(), 1);
    }

    #[test]
    fn duplicate_of_in_flight_queues_when_sharing_disabled() {
        let container = FakeContainer::attached();
        let host = Arc::new(RecordingHost::new());
        let queue = queue_with_config(
            &container,
            &host,
            QueueConfig {
                first_token: 10,
                share_in_flight: false,
            },
        );

        let _first = submit(&queue, &["A"]);
        let mut second = submit(&queue, &["A"]);
        assert_eq!(queue.pending_len(), 1);

        let request = host.last_request().expect("issued");
        queue.on_result(request.token, &request.permissions, vec![GrantStatus::Denied]);
        assert_eq!(host.request_count(), 2);
        assert_eq!(second.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    #[test]
    fn stale_result_changes_nothing() {
        let container = FakeContainer::attached();
        let host = Arc::new(RecordingHost::new());
        let queue = queue(&container, &host);

        let mut first = submit(&queue, &["A"]);
        let mut second = submit(&queue, &["B"]);
        queue.on_result(
            RequestToken::new(99),
            &permission_list(["A"]),
            vec![GrantStatus::Granted],
        );

        assert_eq!(queue.in_flight_token(), Some(RequestToken::new(11)));
        assert_eq!(queue.pending_tokens(), vec![RequestToken::new(12)]);
        assert_eq!(first.try_recv().unwrap_err(), TryRecvError::Empty);
        assert_eq!(second.try_recv().unwrap_err(), TryRecvError::Empty);
        assert_eq!(host.request_count(), 1);
    }

    #[test]
    fn view_destroyed_cancels_in_flight_and_keeps_pending() {
        let container = FakeContainer::attached();
        let host = Arc::new(RecordingHost::new());
        let queue = queue(&container, &host);

        let mut first = submit(&queue, &["A"]);
        let mut second = submit(&queue, &["B"]);

        queue.on_lifecycle_event(LifecycleEvent::ViewDestroyed);
        assert_cancelled(&mut first);
        assert_eq!(queue.in_flight_token(), None);
        assert_eq!(queue.pending_len(), 1);
        assert_eq!(host.request_count(), 1);

        queue.on_lifecycle_event(LifecycleEvent::Attach);
        let request = host.last_request().expect("issued");
        assert_eq!(request.token, RequestToken::new(12));
        queue.on_result(request.token, &request.permissions, vec![GrantStatus::Granted]);
        assert_eq!(granted(&mut second), vec![GrantStatus::Granted]);
    }

    #[test]
    fn late_result_for_cancelled_request_is_stale() {
        let container = FakeContainer::attached();
        let host = Arc::new(RecordingHost::new());
        let queue = queue(&container, &host);

        let mut first = submit(&queue, &["A"]);
        container.set_detached(true);
        queue.on_lifecycle_event(LifecycleEvent::Detach);
        assert_cancelled(&mut first);

        let _second = submit(&queue, &["B"]);
        queue.on_result(
            RequestToken::new(11),
            &permission_list(["A"]),
            vec![GrantStatus::Granted],
        );
        assert_eq!(queue.pending_tokens(), vec![RequestToken::new(12)]);
        assert_eq!(queue.state(), QueueState::Idle);
    }

    #[test]
    fn destroy_discards_everything_and_rejects_new_requests() {
        let container = FakeContainer::attached();
        let host = Arc::new(RecordingHost::new());
        let sink = Arc::new(RecordingSink::new());
        let queue = queue(&container, &host);
        queue.set_event_sink(Some(sink.clone()));

        let mut first = submit(&queue, &["A"]);
        let mut second = submit(&queue, &["B"]);
        let mut third = submit(&queue, &["C"]);

        queue.on_lifecycle_event(LifecycleEvent::Destroy);
        for receiver in [&mut first, &mut second, &mut third] {
            assert_cancelled(receiver);
        }
        assert!(queue.is_destroyed());
        assert_eq!(queue.pending_len(), 0);

        let mut late = submit(&queue, &["D"]);
        assert_cancelled(&mut late);
        queue.on_lifecycle_event(LifecycleEvent::Attach);
        assert_eq!(host.request_count(), 1);

        let payloads = sink.payloads();
        assert_eq!(
            &payloads[payloads.len() - 2..],
            &[
                QueueEventPayload::Cancelled {
                    token: RequestToken::new(11),
                    reason: LifecycleEvent::Destroy,
                },
                QueueEventPayload::Discarded {
                    tokens: vec![RequestToken::new(12), RequestToken::new(13)],
                },
            ]
        );
    }

    #[test]
    fn dropped_caller_does_not_block_the_queue() {
        let container = FakeContainer::attached();
        let host = Arc::new(RecordingHost::new());
        let queue = queue(&container, &host);

        drop(submit(&queue, &["A"]));
        let mut second = submit(&queue, &["B"]);

        queue.on_result(
            RequestToken::new(11),
            &permission_list(["A"]),
            vec![GrantStatus::Granted],
        );
        let request = host.last_request().expect("issued");
        assert_eq!(request.token, RequestToken::new(12));
        queue.on_result(request.token, &request.permissions, vec![GrantStatus::Denied]);
        assert_eq!(granted(&mut second), vec![GrantStatus::Denied]);
    }

    #[test]
    fn emits_transitions_in_order() {
        let container = FakeContainer::attached();
        let host = Arc::new(RecordingHost::new());
        let sink = Arc::new(RecordingSink::new());
        let queue = queue(&container, &host);
        queue.set_event_sink(Some(sink.clone()));

        let _first = submit(&queue, &["A"]);
        let _again = submit(&queue, &["A"]);
        queue.on_result(RequestToken::new(7), &[], Vec::new());
        queue.on_result(
            RequestToken::new(11),
            &permission_list(["A"]),
            vec![GrantStatus::Granted],
        );

        assert_eq!(
            sink.payloads(),
            vec![
                QueueEventPayload::Enqueued {
                    token: RequestToken::new(11),
                    permissions: permission_list(["A"]),
                },
                QueueEventPayload::Issued {
                    token: RequestToken::new(11),
                    permissions: permission_list(["A"]),
                },
                QueueEventPayload::Shared {
                    token: RequestToken::new(11),
                    listeners: 2,
                },
                QueueEventPayload::StaleResult {
                    token: RequestToken::new(7),
                },
                QueueEventPayload::Resolved {
                    token: RequestToken::new(11),
                    results: vec![GrantStatus::Granted],
                },
            ]
        );
        assert!(
            sink.events()
                .iter()
                .all(|event| event.container_id == container.id())
        );
    }

    #[test]
    fn exhausted_tokens_fail_the_caller_without_panicking() {
        let container = FakeContainer::attached();
        let host = Arc::new(RecordingHost::new());
        let queue = queue_with_config(
            &container,
            &host,
            QueueConfig {
                first_token: u64::MAX - 1,
                share_in_flight: true,
            },
        );

        let _first = submit(&queue, &["A"]);
        assert_eq!(queue.in_flight_token(), Some(RequestToken::new(u64::MAX)));

        let mut second = submit(&queue, &["B"]);
        assert!(matches!(
            second.try_recv(),
            Ok(Err(PermitError::TokensExhausted))
        ));
        assert_eq!(queue.pending_len(), 0);

        let mut joined = submit(&queue, &["A"]);
        queue.on_result(
            RequestToken::new(u64::MAX),
            &permission_list(["A"]),
            vec![GrantStatus::Granted],
        );
        assert_eq!(granted(&mut joined), vec![GrantStatus::Granted]);
        assert_eq!(host.request_count(), 1);
    }

    /// Sink that tears down and reattaches the view as soon as token 11 is issued.
    #[derive(Default)]
    struct ReattachingSink {
        queue: OnceLock<Weak<PermissionQueue>>,
        seen: Mutex<Vec<QueueEventPayload>>,
    }

    impl EventSink for ReattachingSink {
        fn emit(&self, event: QueueEvent) {
            let reenter = matches!(
                event.payload,
                QueueEventPayload::Issued { token, .. } if token == RequestToken::new(11)
            );
            self.seen.lock().push(event.payload);
            if reenter && let Some(queue) = self.queue.get().and_then(Weak::upgrade) {
                queue.on_lifecycle_event(LifecycleEvent::ViewDestroyed);
                queue.on_lifecycle_event(LifecycleEvent::Attach);
            }
        }
    }

    #[test]
    fn request_cancelled_before_forwarding_never_reaches_host() {
        let container = FakeContainer::unattached();
        let host = Arc::new(RecordingHost::new());
        let queue = Arc::new(queue(&container, &host));
        let sink = Arc::new(ReattachingSink::default());
        assert!(sink.queue.set(Arc::downgrade(&queue)).is_ok());
        queue.set_event_sink(Some(sink.clone()));

        let mut first = submit(&queue, &["A"]);
        let mut second = submit(&queue, &["B"]);
        container.set_attached(true);
        queue.on_lifecycle_event(LifecycleEvent::Attach);

        assert_cancelled(&mut first);
        let forwarded: Vec<u64> = host
            .requests()
            .iter()
            .map(|request| request.token.get())
            .collect();
        assert_eq!(forwarded, vec![12]);
        assert_eq!(queue.in_flight_token(), Some(RequestToken::new(12)));

        queue.on_result(
            RequestToken::new(12),
            &permission_list(["B"]),
            vec![GrantStatus::Granted],
        );
        assert_eq!(granted(&mut second), vec![GrantStatus::Granted]);

        assert_eq!(
            *sink.seen.lock(),
            vec![
                QueueEventPayload::Enqueued {
                    token: RequestToken::new(11),
                    permissions: permission_list(["A"]),
                },
                QueueEventPayload::Enqueued {
                    token: RequestToken::new(12),
                    permissions: permission_list(["B"]),
                },
                QueueEventPayload::Issued {
                    token: RequestToken::new(11),
                    permissions: permission_list(["A"]),
                },
                QueueEventPayload::Cancelled {
                    token: RequestToken::new(11),
                    reason: LifecycleEvent::ViewDestroyed,
                },
                QueueEventPayload::Issued {
                    token: RequestToken::new(12),
                    permissions: permission_list(["B"]),
                },
                QueueEventPayload::Resolved {
                    token: RequestToken::new(12),
                    results: vec![GrantStatus::Granted],
                },
            ]
        );
    }
}

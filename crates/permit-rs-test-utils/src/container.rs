use permit_rs_protocol::{Container, ContainerId, NestedScope};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// Container whose host-visible flags are flipped by the test.
#[derive(Debug)]
pub struct FakeContainer {
    id: ContainerId,
    attached: AtomicBool,
    removing: AtomicBool,
    detached: AtomicBool,
}

impl FakeContainer {
    /// A container that is attached and able to issue.
    pub fn attached() -> Arc<Self> {
        Arc::new(Self::with_state(true))
    }

    /// A container not yet attached to its host.
    pub fn unattached() -> Arc<Self> {
        Arc::new(Self::with_state(false))
    }

    fn with_state(attached: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            attached: AtomicBool::new(attached),
            removing: AtomicBool::new(false),
            detached: AtomicBool::new(false),
        }
    }

    /// Flip the attached flag.
    pub fn set_attached(&self, value: bool) {
        self.attached.store(value, Ordering::SeqCst);
    }

    /// Flip the removing flag.
    pub fn set_removing(&self, value: bool) {
        self.removing.store(value, Ordering::SeqCst);
    }

    /// Flip the detached flag.
    pub fn set_detached(&self, value: bool) {
        self.detached.store(value, Ordering::SeqCst);
    }
}

impl Container for FakeContainer {
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

/// Nested scope with an optional owner.
#[derive(Clone, Default)]
pub struct FakeScope {
    owner: Option<Arc<dyn Container>>,
}

impl FakeScope {
    /// Scope owned by `owner`.
    pub fn owned_by(owner: Arc<dyn Container>) -> Self {
        Self { owner: Some(owner) }
    }

    /// Scope with no owning container.
    pub fn orphan() -> Self {
        Self::default()
    }
}

impl NestedScope for FakeScope {
    fn owner(&self) -> Option<Arc<dyn Container>> {
        self.owner.clone()
    }
}

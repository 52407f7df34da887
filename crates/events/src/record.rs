//! Listener records and the keys that refer to them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use tether_core::{ListenerId, TargetId};

use crate::binder;
use crate::listener::{BindTo, Context, Listener};
use crate::registry::RegistryState;
use crate::target::{BoundListener, Listenable};

/// One subscription: `(target, event_type, listener, bind_to)` plus the bound
/// wrapper installed on the target.
///
/// The target is held weakly; a record never keeps its target alive.
pub struct ListenerRecord {
    id: ListenerId,
    target: Weak<dyn Listenable>,
    target_id: TargetId,
    event_type: String,
    listener: Listener,
    bind_to: Option<BindTo>,
    call_once: AtomicBool,
    active: AtomicBool,
    bound: OnceLock<BoundListener>,
    registry: Weak<RegistryState>,
}

impl ListenerRecord {
    pub(crate) fn new(
        target: &Arc<dyn Listenable>,
        event_type: impl Into<String>,
        listener: Listener,
        bind_to: Option<BindTo>,
        call_once: bool,
        registry: Weak<RegistryState>,
    ) -> Self {
        Self {
            id: ListenerId::new(),
            target: Arc::downgrade(target),
            target_id: TargetId::of(Arc::as_ptr(target)),
            event_type: event_type.into(),
            listener,
            bind_to,
            call_once: AtomicBool::new(call_once),
            active: AtomicBool::new(true),
            bound: OnceLock::new(),
            registry,
        }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// The target, if it is still alive.
    pub fn target(&self) -> Option<Arc<dyn Listenable>> {
        self.target.upgrade()
    }

    pub fn target_id(&self) -> TargetId {
        self.target_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn listener(&self) -> &Listener {
        &self.listener
    }

    pub fn bind_to(&self) -> Option<&BindTo> {
        self.bind_to.as_ref()
    }

    /// Whether the record removes itself on first invocation.
    pub fn call_once(&self) -> bool {
        self.call_once.load(Ordering::Acquire)
    }

    pub(crate) fn set_call_once(&self, call_once: bool) {
        self.call_once.store(call_once, Ordering::Release);
    }

    /// False once the registration has been removed.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Mark the record removed. Returns true for the single caller that did it.
    pub(crate) fn retire(&self) -> bool {
        self.active.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn installed_listener(&self) -> Option<&BoundListener> {
        self.bound.get()
    }

    pub(crate) fn bound_slot(&self) -> &OnceLock<BoundListener> {
        &self.bound
    }

    pub(crate) fn registry(&self) -> &Weak<RegistryState> {
        &self.registry
    }

    /// The execution context: `bind_to`, falling back to the target.
    pub fn context(&self) -> Option<Context> {
        match &self.bind_to {
            Some(bind_to) => Some(Context::Bound(bind_to.clone())),
            None => self.target().map(Context::Target),
        }
    }
}

impl core::fmt::Debug for ListenerRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ListenerRecord")
            .field("id", &self.id)
            .field("target_id", &self.target_id)
            .field("event_type", &self.event_type)
            .field("listener", &self.listener)
            .field("bind_to", &self.bind_to)
            .field("call_once", &self.call_once())
            .field("active", &self.is_active())
            .finish()
    }
}

/// Opaque handle to a registration, returned by `listen`/`listen_once`.
///
/// Keys compare by identity: two keys are equal iff they refer to the same
/// record.
#[derive(Clone, Debug)]
pub struct ListenerKey(Arc<ListenerRecord>);

impl ListenerKey {
    pub(crate) fn new(record: ListenerRecord) -> Self {
        Self(Arc::new(record))
    }

    pub(crate) fn from_record(record: Arc<ListenerRecord>) -> Self {
        Self(record)
    }

    pub(crate) fn record(&self) -> &Arc<ListenerRecord> {
        &self.0
    }

    /// The wrapper installed on the target.
    pub fn bound_listener(&self) -> BoundListener {
        binder::bind_listener(&self.0)
    }
}

impl core::ops::Deref for ListenerKey {
    type Target = ListenerRecord;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PartialEq for ListenerKey {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ListenerKey {}

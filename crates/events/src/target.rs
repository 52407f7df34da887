//! Target capability contract.
//!
//! The registry only needs two things from a target: a way to install a
//! [`BoundListener`] for an event type and a way to remove it again. Targets
//! that already keep their own per-type listener lists can additionally expose
//! them through [`ListenerBookkeeping`], which the registry then treats as the
//! canonical source for that target.

use std::sync::{Arc, Weak};

use tether_core::TargetError;

use crate::event::Event;
use crate::record::{ListenerKey, ListenerRecord};

/// Closure type installed on targets.
pub type BoundFn = dyn Fn(&mut Event) + Send + Sync;

/// The callback actually handed to a target's native add-capability.
///
/// Equality is identity of the shared closure, which is what targets must use
/// to find the listener again on removal.
///
/// Wrappers made by a registry remember the registration they belong to, so
/// any registry can recognize them in a target's own listener list.
#[derive(Clone)]
pub struct BoundListener {
    f: Arc<BoundFn>,
    origin: Option<Weak<ListenerRecord>>,
}

impl BoundListener {
    pub fn new(f: impl Fn(&mut Event) + Send + Sync + 'static) -> Self {
        Self {
            f: Arc::new(f),
            origin: None,
        }
    }

    pub(crate) fn for_record(
        record: Weak<ListenerRecord>,
        f: impl Fn(&mut Event) + Send + Sync + 'static,
    ) -> Self {
        Self {
            f: Arc::new(f),
            origin: Some(record),
        }
    }

    /// Invoke the listener with `event`.
    pub fn call(&self, event: &mut Event) {
        (self.f)(event)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        core::ptr::addr_eq(Arc::as_ptr(&self.f), Arc::as_ptr(&other.f))
    }

    /// The registration this wrapper was made for, if a registry made it and
    /// the registration still exists.
    pub fn key(&self) -> Option<ListenerKey> {
        self.origin
            .as_ref()
            .and_then(Weak::upgrade)
            .map(ListenerKey::from_record)
    }
}

impl PartialEq for BoundListener {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for BoundListener {}

impl core::fmt::Debug for BoundListener {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("BoundListener")
            .field(&Arc::as_ptr(&self.f).cast::<()>())
            .finish()
    }
}

/// Something listeners can be attached to.
///
/// Implementations must not call back into the registry from
/// `add_event_listener`/`remove_event_listener`: the registry holds the
/// target's bookkeeping lock while it drives them.
pub trait Listenable: Send + Sync + IntoTarget {
    /// Install `listener` for `event_type`.
    fn add_event_listener(&self, event_type: &str, listener: BoundListener)
    -> Result<(), TargetError>;

    /// Remove a previously installed `listener`. Unknown listeners are ignored.
    fn remove_event_listener(&self, event_type: &str, listener: &BoundListener);

    /// Native listener bookkeeping, for targets that keep their own lists.
    fn bookkeeping(&self) -> Option<&dyn ListenerBookkeeping> {
        None
    }
}

/// Optional capability: the target tracks its own listeners per type.
pub trait ListenerBookkeeping {
    /// Listeners currently installed for `event_type`, in invocation order.
    fn get_listeners(&self, event_type: &str) -> Option<Vec<BoundListener>>;
}

/// Upcast of a shared target to `Arc<dyn Listenable>`.
///
/// Implemented for every sized [`Listenable`]; trait objects inherit it through
/// the supertrait, so registry calls accept both `Arc<MyTarget>` and
/// `Arc<dyn Listenable>`.
pub trait IntoTarget {
    fn into_target(self: Arc<Self>) -> Arc<dyn Listenable>;
}

impl<T: Listenable + 'static> IntoTarget for T {
    fn into_target(self: Arc<Self>) -> Arc<dyn Listenable> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bound_listeners_compare_by_identity() {
        let a = BoundListener::new(|_| {});
        let b = BoundListener::new(|_| {});

        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn call_forwards_the_event() {
        let listener = BoundListener::new(|event| event.prevent_default());
        let mut event = Event::new("change");

        listener.call(&mut event);

        assert!(event.default_prevented());
    }

    #[test]
    fn hand_made_listeners_belong_to_no_registration() {
        assert!(BoundListener::new(|_| {}).key().is_none());
    }
}

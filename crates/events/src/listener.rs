//! User-facing callback handles.
//!
//! Identity matters here: two [`Listener`]s are "the same listener" only if
//! they are clones of one handle, and the same holds for [`BindTo`]. Neither
//! type compares structurally.

use std::any::Any;
use std::sync::Arc;

use tether_core::TargetId;

use crate::event::Event;
use crate::target::Listenable;

/// Closure type for raw listeners.
pub type ListenerFn = dyn Fn(&Context, &mut Event) + Send + Sync;

/// A raw user callback.
#[derive(Clone)]
pub struct Listener(Arc<ListenerFn>);

impl Listener {
    pub fn new(f: impl Fn(&Context, &mut Event) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn call(&self, context: &Context, event: &mut Event) {
        (self.0)(context, event)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        core::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Listener {}

impl core::fmt::Debug for Listener {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("Listener")
            .field(&Arc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

/// An object a listener should execute with instead of its target.
#[derive(Clone)]
pub struct BindTo(Arc<dyn Any + Send + Sync>);

impl BindTo {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Wrap an existing shared value; clones of `value` keep the same identity.
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self(value)
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        core::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

impl PartialEq for BindTo {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for BindTo {}

impl core::fmt::Debug for BindTo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("BindTo")
            .field(&Arc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

/// What a listener executes with: its bind object, or else its target.
#[derive(Clone)]
pub enum Context {
    Bound(BindTo),
    Target(Arc<dyn Listenable>),
}

impl Context {
    pub fn bound(&self) -> Option<&BindTo> {
        match self {
            Self::Bound(bind_to) => Some(bind_to),
            Self::Target(_) => None,
        }
    }

    pub fn target(&self) -> Option<&Arc<dyn Listenable>> {
        match self {
            Self::Bound(_) => None,
            Self::Target(target) => Some(target),
        }
    }

    /// Borrow the bind object as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.bound().and_then(BindTo::downcast_ref)
    }

    pub fn is_bound_to(&self, bind_to: &BindTo) -> bool {
        self.bound().is_some_and(|b| b.ptr_eq(bind_to))
    }

    pub fn is_target<T: Listenable + ?Sized>(&self, target: &Arc<T>) -> bool {
        self.target()
            .is_some_and(|t| TargetId::of(Arc::as_ptr(t)) == TargetId::of(Arc::as_ptr(target)))
    }
}

impl core::fmt::Debug for Context {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Bound(bind_to) => f.debug_tuple("Bound").field(bind_to).finish(),
            Self::Target(target) => f
                .debug_tuple("Target")
                .field(&TargetId::of(Arc::as_ptr(target)))
                .finish(),
        }
    }
}

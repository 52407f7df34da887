//! A ready-made target that keeps its own listener lists and dispatches events.
//!
//! Dispatch semantics:
//! - listeners run in the order they were added, on a snapshot taken when the
//!   dispatch starts, so a listener added during dispatch waits for the next one
//! - a listener removed during dispatch is not invoked afterwards
//! - `stop_propagation()` ends the dispatch
//!
//! No lock is held while listeners run, so they may freely add, remove or
//! dispatch on the same target.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tether_core::TargetError;

use crate::event::Event;
use crate::target::{BoundListener, Listenable, ListenerBookkeeping};

#[derive(Debug)]
pub struct EventTarget {
    me: Weak<EventTarget>,
    listeners: Mutex<HashMap<String, Vec<BoundListener>>>,
    disposed: AtomicBool,
}

impl EventTarget {
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            listeners: Mutex::new(HashMap::new()),
            disposed: AtomicBool::new(false),
        })
    }

    fn listeners(&self) -> MutexGuard<'_, HashMap<String, Vec<BoundListener>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_installed(&self, event_type: &str, listener: &BoundListener) -> bool {
        self.listeners()
            .get(event_type)
            .is_some_and(|installed| installed.contains(listener))
    }

    /// Dispatch `event` to the listeners of its type.
    ///
    /// Returns `false` if a listener stopped propagation or prevented the
    /// default action.
    pub fn dispatch_event(&self, event: impl Into<Event>) -> bool {
        let mut event = event.into();
        self.dispatch(&mut event)
    }

    /// Like [`dispatch_event`](Self::dispatch_event), leaving the event with
    /// the caller for inspection.
    pub fn dispatch(&self, event: &mut Event) -> bool {
        let target: Weak<dyn Listenable> = self.me.clone();
        event.set_target_weak(target);

        let snapshot = self
            .listeners()
            .get(event.event_type())
            .cloned()
            .unwrap_or_default();

        tracing::trace!(
            event_type = event.event_type(),
            listeners = snapshot.len(),
            "dispatching event"
        );

        for listener in snapshot {
            if !self.is_installed(event.event_type(), &listener) {
                continue;
            }
            listener.call(event);
            if event.propagation_stopped() {
                break;
            }
        }

        !(event.propagation_stopped() || event.default_prevented())
    }

    /// Whether any listener is installed, for `event_type` or for any type.
    pub fn has_listener(&self, event_type: Option<&str>) -> bool {
        let listeners = self.listeners();
        match event_type {
            Some(event_type) => listeners.contains_key(event_type),
            None => !listeners.is_empty(),
        }
    }

    /// Drop every installed listener and refuse new ones.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let dropped: usize = self.listeners().drain().map(|(_, l)| l.len()).sum();
        tracing::debug!(dropped, "event target disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl Listenable for EventTarget {
    fn add_event_listener(
        &self,
        event_type: &str,
        listener: BoundListener,
    ) -> Result<(), TargetError> {
        if self.is_disposed() {
            return Err(TargetError::Disposed);
        }
        let mut listeners = self.listeners();
        let installed = listeners.entry(event_type.to_owned()).or_default();
        if !installed.contains(&listener) {
            installed.push(listener);
        }
        Ok(())
    }

    fn remove_event_listener(&self, event_type: &str, listener: &BoundListener) {
        let mut listeners = self.listeners();
        let Some(installed) = listeners.get_mut(event_type) else {
            return;
        };
        if let Some(index) = installed.iter().position(|l| l == listener) {
            installed.remove(index);
        }
        if installed.is_empty() {
            listeners.remove(event_type);
        }
    }

    fn bookkeeping(&self) -> Option<&dyn ListenerBookkeeping> {
        Some(self)
    }
}

impl ListenerBookkeeping for EventTarget {
    fn get_listeners(&self, event_type: &str) -> Option<Vec<BoundListener>> {
        self.listeners().get(event_type).cloned()
    }
}

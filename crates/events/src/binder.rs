//! Bound-listener synthesis.
//!
//! The bound wrapper is what a target actually stores. It forces the raw
//! listener's execution context and implements one-shot self-removal.

use std::sync::{Arc, Weak};

use crate::event::Event;
use crate::record::{ListenerKey, ListenerRecord};
use crate::registry::{Registry, release_orphan};
use crate::target::BoundListener;

/// Return the record's bound wrapper, creating it on first use.
///
/// Idempotent: a record is bound exactly once for its whole lifetime.
pub(crate) fn bind_listener(record: &Arc<ListenerRecord>) -> BoundListener {
    record
        .bound_slot()
        .get_or_init(|| {
            // Weak, so record -> bound -> record is not a cycle.
            let origin = Arc::downgrade(record);
            let record = Weak::clone(&origin);
            BoundListener::for_record(origin, move |event| invoke(&record, event))
        })
        .clone()
}

fn invoke(record: &Weak<ListenerRecord>, event: &mut Event) {
    let Some(record) = record.upgrade() else {
        return;
    };

    if record.call_once() {
        // Remove before running, so a listener that re-registers itself sees
        // a clean slate. Only the caller that actually removed it may run it.
        if !unregister(&record) {
            tracing::trace!(listener_id = %record.id(), "one-shot listener already consumed");
            return;
        }
    } else if !record.is_active() {
        return;
    }

    let Some(context) = record.context() else {
        tracing::debug!(
            listener_id = %record.id(),
            event_type = record.event_type(),
            "target dropped; listener not invoked"
        );
        return;
    };

    record.listener().call(&context, event);
}

fn unregister(record: &Arc<ListenerRecord>) -> bool {
    let key = ListenerKey::from_record(Arc::clone(record));
    match record.registry().upgrade() {
        Some(state) => Registry::from_state(state).unlisten_by_key(&key),
        None => release_orphan(&key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::{BindTo, Listener};
    use crate::testing::RecordingTarget;
    use crate::target::Listenable;
    use std::sync::Mutex;

    fn record_for(
        target: &Arc<dyn Listenable>,
        listener: Listener,
        bind_to: Option<BindTo>,
        call_once: bool,
    ) -> Arc<ListenerRecord> {
        Arc::new(ListenerRecord::new(
            target,
            "foo",
            listener,
            bind_to,
            call_once,
            Weak::new(),
        ))
    }

    #[test]
    fn binds_a_listener_and_returns_the_bound_listener() {
        let target: Arc<dyn Listenable> = RecordingTarget::new();
        let bind_to = BindTo::new(1u32);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let listener = {
            let seen = Arc::clone(&seen);
            Listener::new(move |ctx, _| seen.lock().unwrap().push(ctx.clone()))
        };
        let record = record_for(&target, listener, Some(bind_to.clone()), false);

        let bound = bind_listener(&record);
        assert_eq!(record.installed_listener(), Some(&bound));
        assert_eq!(bound.key().map(|key| Arc::ptr_eq(key.record(), &record)), Some(true));

        bound.call(&mut Event::new("foo"));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].is_bound_to(&bind_to));
    }

    #[test]
    fn binds_to_the_target_when_bind_to_is_absent() {
        let spy = RecordingTarget::new();
        let target: Arc<dyn Listenable> = spy.clone();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let listener = {
            let seen = Arc::clone(&seen);
            Listener::new(move |ctx, _| seen.lock().unwrap().push(ctx.clone()))
        };
        let record = record_for(&target, listener, None, false);

        bind_listener(&record).call(&mut Event::new("foo"));

        let seen = seen.lock().unwrap();
        assert!(seen[0].is_target(&spy));
    }

    #[test]
    fn binding_is_idempotent() {
        let target: Arc<dyn Listenable> = RecordingTarget::new();
        let record = record_for(&target, Listener::new(|_, _| {}), None, false);

        let first = bind_listener(&record);
        let second = bind_listener(&record);

        assert_eq!(first, second);
    }

    #[test]
    fn one_shot_record_retires_before_the_listener_runs() {
        let target: Arc<dyn Listenable> = RecordingTarget::new();
        let observed_active = Arc::new(Mutex::new(Vec::new()));
        let slot: Arc<Mutex<Option<Arc<ListenerRecord>>>> = Arc::new(Mutex::new(None));
        let listener = {
            let observed_active = Arc::clone(&observed_active);
            let slot = Arc::clone(&slot);
            Listener::new(move |_, _| {
                let active = slot.lock().unwrap().as_ref().map(|r| r.is_active());
                observed_active.lock().unwrap().push(active);
            })
        };
        let record = record_for(&target, listener, None, true);
        *slot.lock().unwrap() = Some(Arc::clone(&record));

        let bound = bind_listener(&record);
        bound.call(&mut Event::new("foo"));
        bound.call(&mut Event::new("foo"));

        assert_eq!(*observed_active.lock().unwrap(), vec![Some(false)]);
    }

    #[test]
    fn listener_is_skipped_when_target_is_gone_and_nothing_is_bound() {
        let target: Arc<dyn Listenable> = RecordingTarget::new();
        let calls = Arc::new(Mutex::new(0));
        let listener = {
            let calls = Arc::clone(&calls);
            Listener::new(move |_, _| *calls.lock().unwrap() += 1)
        };
        let record = record_for(&target, listener, None, false);
        let bound = bind_listener(&record);
        drop(target);

        bound.call(&mut Event::new("foo"));

        assert_eq!(*calls.lock().unwrap(), 0);
    }
}

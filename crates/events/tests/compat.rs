//! Registry behavior against targets that keep their own listener lists.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tether_events::{
    BindTo, Event, EventTarget, Listenable, ListenerBookkeeping, Listener, Registry, RegistryError,
    TargetError,
};
use tether_observability::LogFormat;

fn setup() -> (Registry, Arc<EventTarget>) {
    tether_observability::logging::init_with(LogFormat::Compact);
    (Registry::new(), EventTarget::new())
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Resolution {
    value: f64,
}

#[test]
fn same_registration_reuses_the_installed_wrapper() -> anyhow::Result<()> {
    let (registry, target) = setup();
    let listener = Listener::new(|_, _| {});

    let key1 = registry.listen(&target, "foo", &listener, None)?;
    let key2 = registry.listen(&target, "foo", &listener, None)?;

    assert_eq!(key1, key2);
    assert_eq!(target.get_listeners("foo"), Some(vec![key1.bound_listener()]));
    Ok(())
}

#[test]
fn different_bind_objects_install_separate_wrappers_in_order() -> anyhow::Result<()> {
    let (registry, target) = setup();
    let listener = Listener::new(|_, _| {});

    let a = registry.listen(&target, "foo", &listener, Some(&BindTo::new("a")))?;
    let b = registry.listen(&target, "foo", &listener, Some(&BindTo::new("b")))?;

    assert_eq!(
        target.get_listeners("foo"),
        Some(vec![a.bound_listener(), b.bound_listener()])
    );
    assert_eq!(registry.get_listeners(&target, "foo"), Some(vec![a, b]));
    Ok(())
}

#[test]
fn wrapper_removed_natively_is_not_handed_out_again() -> anyhow::Result<()> {
    let (registry, target) = setup();
    let listener = Listener::new(|_, _| {});

    let stale = registry.listen(&target, "foo", &listener, None)?;
    target.remove_event_listener("foo", &stale.bound_listener());

    assert!(registry.get_listeners(&target, "foo").is_none());
    assert!(!stale.is_active());

    let fresh = registry.listen(&target, "foo", &listener, None)?;
    assert_ne!(fresh, stale);
    assert_eq!(target.get_listeners("foo"), Some(vec![fresh.bound_listener()]));
    Ok(())
}

#[test]
fn registrations_follow_the_targets_order() -> anyhow::Result<()> {
    let (registry, target) = setup();

    let a = registry.listen(&target, "foo", &Listener::new(|_, _| {}), None)?;
    let b = registry.listen(&target, "foo", &Listener::new(|_, _| {}), None)?;
    target.remove_event_listener("foo", &a.bound_listener());
    target.add_event_listener("foo", a.bound_listener())?;

    assert_eq!(registry.get_listeners(&target, "foo"), Some(vec![b, a]));
    Ok(())
}

#[test]
fn disposing_the_target_drops_its_registrations() -> anyhow::Result<()> {
    let (registry, target) = setup();
    let key = registry.listen(&target, "foo", &Listener::new(|_, _| {}), None)?;

    target.dispose();

    assert!(registry.get_listeners(&target, "foo").is_none());
    assert!(!key.is_active());
    assert!(!registry.has_store(&target));

    let err = registry
        .listen(&target, "foo", &Listener::new(|_, _| {}), None)
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Rejected {
            source: TargetError::Disposed,
            ..
        }
    ));
    Ok(())
}

#[test]
fn dispatch_runs_a_one_off_listener_once() -> anyhow::Result<()> {
    let (registry, target) = setup();
    let calls = Arc::new(AtomicUsize::new(0));
    let listener = {
        let calls = Arc::clone(&calls);
        Listener::new(move |_, _| {
            calls.fetch_add(1, Ordering::SeqCst);
        })
    };

    registry.listen_once(&target, "foo", &listener, None)?;
    target.dispatch_event("foo");
    target.dispatch_event("foo");

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!target.has_listener(Some("foo")));
    assert!(!registry.has_store(&target));
    Ok(())
}

#[test]
fn listener_sees_target_and_payload() -> anyhow::Result<()> {
    let (registry, target) = setup();
    let seen = Arc::new(Mutex::new(None));
    let listener = {
        let seen = Arc::clone(&seen);
        let expected = Arc::downgrade(&target);
        Listener::new(move |ctx, event| {
            let on_target = expected
                .upgrade()
                .is_some_and(|target| ctx.is_target(&target));
            let resolution = event.payload_as::<Resolution>().ok();
            *seen.lock().unwrap() = Some((on_target, resolution));
        })
    };
    registry.listen(&target, "change:resolution", &listener, None)?;

    let mut event = Event::new("change:resolution").with_payload(&Resolution { value: 2.5 })?;
    assert!(target.dispatch(&mut event));

    assert_eq!(
        seen.lock().unwrap().take(),
        Some((true, Some(Resolution { value: 2.5 })))
    );
    Ok(())
}

#[test]
fn listener_can_stop_propagation() -> anyhow::Result<()> {
    let (registry, target) = setup();
    let late = Arc::new(AtomicUsize::new(0));
    let stopper = Listener::new(|_, event| event.stop_propagation());
    let follower = {
        let late = Arc::clone(&late);
        Listener::new(move |_, _| {
            late.fetch_add(1, Ordering::SeqCst);
        })
    };
    registry.listen(&target, "foo", &stopper, None)?;
    registry.listen(&target, "foo", &follower, None)?;

    assert!(!target.dispatch_event("foo"));
    assert_eq!(late.load(Ordering::SeqCst), 0);
    Ok(())
}

#[test]
fn unlisten_during_dispatch_skips_the_removed_listener() -> anyhow::Result<()> {
    let (registry, target) = setup();
    let calls = Arc::new(AtomicUsize::new(0));
    let victim = {
        let calls = Arc::clone(&calls);
        Listener::new(move |_, _| {
            calls.fetch_add(1, Ordering::SeqCst);
        })
    };
    let remover = {
        let registry = registry.clone();
        let victim = victim.clone();
        let me = Arc::downgrade(&target);
        Listener::new(move |_, _| {
            if let Some(target) = me.upgrade() {
                registry.unlisten(&target, "foo", &victim, None);
            }
        })
    };
    registry.listen(&target, "foo", &remover, None)?;
    registry.listen(&target, "foo", &victim, None)?;

    target.dispatch_event("foo");

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(registry.get_listeners(&target, "foo").map(|k| k.len()), Some(1));
    Ok(())
}

#[test]
fn unlisten_all_empties_the_target() -> anyhow::Result<()> {
    let (registry, target) = setup();
    registry.listen(&target, ["foo", "bar"], &Listener::new(|_, _| {}), None)?;

    registry.unlisten_all(&target);

    assert!(!target.has_listener(None));
    assert!(!registry.has_store(&target));
    Ok(())
}

#[test]
fn registries_share_the_wrapper_installed_on_the_target() -> anyhow::Result<()> {
    let (local, target) = setup();
    let calls = Arc::new(AtomicUsize::new(0));
    let listener = {
        let calls = Arc::clone(&calls);
        Listener::new(move |_, _| {
            calls.fetch_add(1, Ordering::SeqCst);
        })
    };

    let global_key = tether_events::listen(&target, "foo", &listener, None)?;
    let local_key = local.listen(&target, "foo", &listener, None)?;

    assert_eq!(local_key, global_key);
    assert_eq!(target.get_listeners("foo"), Some(vec![global_key.bound_listener()]));
    assert_eq!(local.get_listeners(&target, "foo"), Some(vec![global_key.clone()]));

    target.dispatch_event("foo");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    local.unlisten(&target, "foo", &listener, None);

    assert!(!global_key.is_active());
    assert!(!target.has_listener(Some("foo")));
    assert!(tether_events::get_listeners(&target, "foo").is_none());
    assert!(!Registry::global().has_store(&target));
    Ok(())
}

#[test]
fn listen_through_a_second_registry_makes_a_one_off_registration_permanent() -> anyhow::Result<()> {
    let (first, target) = setup();
    let second = Registry::new();
    let listener = Listener::new(|_, _| {});

    let once = first.listen_once(&target, "foo", &listener, None)?;
    let key = second.listen(&target, "foo", &listener, None)?;

    assert_eq!(key, once);
    assert!(!key.call_once());

    target.dispatch_event("foo");
    assert!(key.is_active());
    assert_eq!(target.get_listeners("foo").map(|l| l.len()), Some(1));

    assert!(second.unlisten_by_key(&key));
    assert!(!first.has_store(&target));
    Ok(())
}

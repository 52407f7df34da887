//! Cooperation with targets that keep their own listener lists.
//!
//! For such targets the native list is canonical. Before the registry searches
//! or reads a bucket it is reconciled against that list: registrations whose
//! bound listener the target no longer holds are retired, and the bucket takes
//! the target's order. Dedup therefore never hands out a key whose wrapper is
//! not actually installed.
//!
//! Wrappers installed through another registry are found through the target's
//! list as well, so one target never carries two wrappers for the same
//! `(listener, bind_to)`.

use crate::finder::same_registration;
use crate::listener::{BindTo, Listener};
use crate::record::ListenerKey;
use crate::store::ListenerStore;
use crate::target::{BoundListener, Listenable, ListenerBookkeeping};

/// Reconcile `bucket` with `native`, returning the keys that were dropped.
pub(crate) fn reconcile(bucket: &mut Vec<ListenerKey>, native: &[BoundListener]) -> Vec<ListenerKey> {
    let native_position = |key: &ListenerKey| {
        key.installed_listener()
            .and_then(|bound| native.iter().position(|n| n == bound))
    };

    let (mut kept, stale): (Vec<_>, Vec<_>) = bucket
        .drain(..)
        .partition(|key| native_position(key).is_some());
    kept.sort_by_key(|key| native_position(key));

    for key in &stale {
        key.retire();
    }
    *bucket = kept;
    stale
}

/// Reconcile the `event_type` bucket of `store` if `target` has bookkeeping.
pub(crate) fn sync_with_target(target: &dyn Listenable, store: &mut ListenerStore, event_type: &str) {
    let Some(bookkeeping) = target.bookkeeping() else {
        return;
    };
    let Some(bucket) = store.bucket_mut(event_type) else {
        return;
    };

    let native = bookkeeping.get_listeners(event_type).unwrap_or_default();
    let stale = reconcile(bucket, &native);
    store.prune(event_type);

    for key in stale {
        tracing::debug!(
            listener_id = %key.id(),
            event_type,
            target_id = %key.target_id(),
            "listener no longer installed on target; registration dropped"
        );
    }
}

/// Live registrations behind the wrappers `bookkeeping` holds for
/// `event_type`, in the target's order, whichever registry made them.
pub(crate) fn installed_keys(
    bookkeeping: &dyn ListenerBookkeeping,
    event_type: &str,
) -> Vec<ListenerKey> {
    bookkeeping
        .get_listeners(event_type)
        .unwrap_or_default()
        .iter()
        .filter_map(BoundListener::key)
        .filter(|key| key.is_active() && key.event_type() == event_type)
        .collect()
}

/// The installed registration of `(listener, bind_to)` for `event_type`.
pub(crate) fn find_installed(
    bookkeeping: &dyn ListenerBookkeeping,
    event_type: &str,
    listener: &Listener,
    bind_to: Option<&BindTo>,
) -> Option<ListenerKey> {
    installed_keys(bookkeeping, event_type)
        .into_iter()
        .find(|key| same_registration(key, listener, bind_to))
}

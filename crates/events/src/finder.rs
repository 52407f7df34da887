//! Registration lookup.

use crate::listener::{BindTo, Listener};
use crate::record::{ListenerKey, ListenerRecord};

/// A match returned by [`find_listener`], with its position in the bucket.
#[derive(Debug, Clone, Copy)]
pub struct Found<'a> {
    pub index: usize,
    pub key: &'a ListenerKey,
}

/// Whether `record` is the registration of `(listener, bind_to)`.
///
/// Both parts compare by identity, and `None` only matches `None`.
pub fn same_registration(
    record: &ListenerRecord,
    listener: &Listener,
    bind_to: Option<&BindTo>,
) -> bool {
    if !record.listener().ptr_eq(listener) {
        return false;
    }
    match (record.bind_to(), bind_to) {
        (None, None) => true,
        (Some(a), Some(b)) => a.ptr_eq(b),
        _ => false,
    }
}

/// First key in `keys` registered for `(listener, bind_to)`.
pub fn find_listener<'a>(
    keys: &'a [ListenerKey],
    listener: &Listener,
    bind_to: Option<&BindTo>,
) -> Option<Found<'a>> {
    keys.iter()
        .enumerate()
        .find(|(_, key)| same_registration(key, listener, bind_to))
        .map(|(index, key)| Found { index, key })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ListenerRecord;
    use crate::target::Listenable;
    use crate::testing::RecordingTarget;
    use std::sync::{Arc, Weak};

    fn key(target: &Arc<dyn Listenable>, listener: &Listener, bind_to: Option<&BindTo>) -> ListenerKey {
        ListenerKey::new(ListenerRecord::new(
            target,
            "foo",
            listener.clone(),
            bind_to.cloned(),
            false,
            Weak::new(),
        ))
    }

    #[test]
    fn searches_for_a_specific_listener() {
        let target: Arc<dyn Listenable> = RecordingTarget::new();
        let listener = Listener::new(|_, _| {});
        let bind_to = BindTo::new(1u32);

        let unbound = vec![key(&target, &listener, None)];
        assert_eq!(find_listener(&unbound, &listener, None).map(|f| f.key), Some(&unbound[0]));
        assert!(find_listener(&unbound, &listener, Some(&bind_to)).is_none());

        let bound = vec![key(&target, &listener, Some(&bind_to))];
        assert!(find_listener(&bound, &listener, None).is_none());
        assert_eq!(
            find_listener(&bound, &listener, Some(&bind_to)).map(|f| f.key),
            Some(&bound[0])
        );
    }

    #[test]
    fn reports_the_index_of_the_match() {
        let target: Arc<dyn Listenable> = RecordingTarget::new();
        let a = Listener::new(|_, _| {});
        let b = Listener::new(|_, _| {});
        let keys = vec![key(&target, &a, None), key(&target, &b, None)];

        assert_eq!(find_listener(&keys, &a, None).map(|f| f.index), Some(0));
        assert_eq!(find_listener(&keys, &b, None).map(|f| f.index), Some(1));
    }

    #[test]
    fn distinct_bind_objects_never_match() {
        let target: Arc<dyn Listenable> = RecordingTarget::new();
        let listener = Listener::new(|_, _| {});
        let keys = vec![key(&target, &listener, Some(&BindTo::new(())))];

        assert!(find_listener(&keys, &listener, Some(&BindTo::new(()))).is_none());
    }

    #[test]
    fn different_listener_never_matches() {
        let target: Arc<dyn Listenable> = RecordingTarget::new();
        let keys = vec![key(&target, &Listener::new(|_, _| {}), None)];

        assert!(find_listener(&keys, &Listener::new(|_, _| {}), None).is_none());
    }
}

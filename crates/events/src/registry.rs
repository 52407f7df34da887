//! The listener registry.
//!
//! The registry keeps a side table from target identity to that target's
//! [`ListenerStore`]. Entries hold the target weakly, so registering listeners
//! never keeps a target alive, and an entry is detached as soon as its store
//! runs empty.
//!
//! ## Locking
//!
//! - the side table lock is held only to look up, insert or detach entries
//! - each entry has its own lock, held across bucket mutation **and** the
//!   target's native add/remove, so the two never disagree
//! - lock order is side table → entry → the target's own lock
//! - no registry lock is held while a listener runs

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};

use tether_core::{RegistryError, RegistryResult, TargetId};

use crate::binder;
use crate::compat;
use crate::config::RegistryConfig;
use crate::event_types::IntoEventTypes;
use crate::finder::find_listener;
use crate::listener::{BindTo, Listener};
use crate::record::{ListenerKey, ListenerRecord};
use crate::store::ListenerStore;
use crate::target::Listenable;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn target_id_of<T: Listenable + ?Sized>(target: &Arc<T>) -> TargetId {
    TargetId::of(Arc::as_ptr(target))
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Mode {
    Permanent,
    Once,
}

#[derive(Debug, Default)]
struct StoreSlot {
    store: ListenerStore,
    /// Set when the entry left the side table; writers must start over.
    detached: bool,
}

struct TargetEntry {
    target: Weak<dyn Listenable>,
    slot: Mutex<StoreSlot>,
}

pub(crate) struct RegistryState {
    targets: Mutex<HashMap<TargetId, Arc<TargetEntry>>>,
    config: RegistryConfig,
    since_sweep: AtomicU32,
}

/// Registration bookkeeping for any number of targets.
///
/// `Registry` is a cheap handle; clones share the same state.
#[derive(Clone)]
pub struct Registry {
    state: Arc<RegistryState>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for Registry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Registry")
            .field("targets", &self.target_count())
            .field("config", &self.state.config)
            .finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            state: Arc::new(RegistryState {
                targets: Mutex::new(HashMap::new()),
                config,
                since_sweep: AtomicU32::new(0),
            }),
        }
    }

    /// The process-wide registry used by the free functions of this crate.
    ///
    /// Configured from the environment on first use.
    pub fn global() -> &'static Registry {
        static GLOBAL: OnceLock<Registry> = OnceLock::new();
        GLOBAL.get_or_init(|| Registry::with_config(RegistryConfig::from_env()))
    }

    pub(crate) fn from_state(state: Arc<RegistryState>) -> Self {
        Self { state }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.state.config
    }

    /// Register `listener` for each of `types` on `target`.
    ///
    /// Re-registering an existing `(target, type, listener, bind_to)` returns
    /// the existing key without touching the target again; if that
    /// registration was one-shot, it becomes permanent.
    ///
    /// Returns the key for the last type processed successfully.
    pub fn listen<T: Listenable + ?Sized>(
        &self,
        target: &Arc<T>,
        types: impl IntoEventTypes,
        listener: &Listener,
        bind_to: Option<&BindTo>,
    ) -> RegistryResult<ListenerKey> {
        self.register(target, types, listener, bind_to, Mode::Permanent)
    }

    /// Like [`listen`](Self::listen), but the registration removes itself
    /// right before its first invocation.
    ///
    /// An existing permanent registration is returned as is; it is not turned
    /// into a one-shot one.
    pub fn listen_once<T: Listenable + ?Sized>(
        &self,
        target: &Arc<T>,
        types: impl IntoEventTypes,
        listener: &Listener,
        bind_to: Option<&BindTo>,
    ) -> RegistryResult<ListenerKey> {
        self.register(target, types, listener, bind_to, Mode::Once)
    }

    fn register<T: Listenable + ?Sized>(
        &self,
        target: &Arc<T>,
        types: impl IntoEventTypes,
        listener: &Listener,
        bind_to: Option<&BindTo>,
        mode: Mode,
    ) -> RegistryResult<ListenerKey> {
        let types = types.into_event_types();
        if types.is_empty() {
            return Err(RegistryError::NoEventTypes);
        }

        self.maybe_sweep();

        let target: Arc<dyn Listenable> = Arc::clone(target).into_target();
        let target_id = target_id_of(&target);

        let mut last_key = None;
        let mut last_err = None;
        for event_type in &types {
            let outcome = self.with_store(target_id, Some(&target), |native, store| {
                self.register_in(native, store, event_type, listener, bind_to, mode)
            });
            match outcome {
                Some(Ok(key)) => last_key = Some(key),
                Some(Err(err)) => {
                    tracing::warn!(
                        event_type = event_type.as_str(),
                        %target_id,
                        error = %err,
                        "listener registration rejected by target"
                    );
                    last_err = Some(err);
                }
                None => {}
            }
        }

        last_key.ok_or_else(|| last_err.unwrap_or(RegistryError::NoEventTypes))
    }

    fn register_in(
        &self,
        native: &Arc<dyn Listenable>,
        store: &mut ListenerStore,
        event_type: &str,
        listener: &Listener,
        bind_to: Option<&BindTo>,
        mode: Mode,
    ) -> RegistryResult<ListenerKey> {
        debug_assert!(!event_type.is_empty(), "event types must not be empty");
        compat::sync_with_target(native.as_ref(), store, event_type);

        // A target's own list also holds wrappers installed through other
        // registries; reusing them keeps one wrapper per registration.
        let existing = store
            .bucket(event_type)
            .and_then(|bucket| find_listener(bucket, listener, bind_to))
            .map(|found| found.key.clone())
            .or_else(|| {
                native.bookkeeping().and_then(|bookkeeping| {
                    compat::find_installed(bookkeeping, event_type, listener, bind_to)
                })
            });
        if let Some(key) = existing {
            if mode == Mode::Permanent && key.call_once() {
                key.set_call_once(false);
                tracing::debug!(
                    listener_id = %key.id(),
                    event_type,
                    "one-shot listener made permanent"
                );
            }
            return Ok(key);
        }

        let key = ListenerKey::new(ListenerRecord::new(
            native,
            event_type,
            listener.clone(),
            bind_to.cloned(),
            mode == Mode::Once,
            Arc::downgrade(&self.state),
        ));
        let bound = binder::bind_listener(key.record());

        if let Err(source) = native.add_event_listener(event_type, bound) {
            key.retire();
            return Err(RegistryError::rejected(event_type, source));
        }
        store.push(key.clone());

        tracing::debug!(
            listener_id = %key.id(),
            event_type,
            target_id = %key.target_id(),
            once = mode == Mode::Once,
            "listener registered"
        );
        Ok(key)
    }

    /// Remove the registration of `(listener, bind_to)` for each of `types`.
    ///
    /// On a target with its own listener lists this also removes a matching
    /// registration made through another registry. Unknown registrations are
    /// ignored.
    pub fn unlisten<T: Listenable + ?Sized>(
        &self,
        target: &Arc<T>,
        types: impl IntoEventTypes,
        listener: &Listener,
        bind_to: Option<&BindTo>,
    ) {
        let types = types.into_event_types();
        self.with_store(target_id_of(target), None, |native, store| {
            for event_type in &types {
                debug_assert!(!event_type.is_empty(), "event types must not be empty");
                compat::sync_with_target(native.as_ref(), store, event_type);
                let index = store
                    .bucket(event_type)
                    .and_then(|bucket| find_listener(bucket, listener, bind_to))
                    .map(|found| found.index);
                if let Some(key) = index.and_then(|index| store.remove_at(event_type, index)) {
                    Self::release(native.as_ref(), &key);
                }
            }
        });

        // Outside our own locks: the owning registry takes its own.
        if let Some(bookkeeping) = target.bookkeeping() {
            for event_type in &types {
                if let Some(key) = compat::find_installed(bookkeeping, event_type, listener, bind_to) {
                    self.unlisten_by_key(&key);
                }
            }
        }
    }

    /// Remove the registration `key` refers to.
    ///
    /// Returns `true` if this call removed it; removing an already removed
    /// key is a no-op that returns `false`.
    pub fn unlisten_by_key(&self, key: &ListenerKey) -> bool {
        if !key.is_active() {
            return false;
        }
        if !self.owns(key) {
            return match key.registry().upgrade() {
                Some(state) => Registry::from_state(state).unlisten_by_key(key),
                None => release_orphan(key),
            };
        }

        let removed = self.with_store(key.target_id(), None, |native, store| {
            match store.position(key) {
                Some(index) => {
                    store.remove_at(key.event_type(), index);
                    Self::release(native.as_ref(), key)
                }
                None => key.retire(),
            }
        });

        removed.unwrap_or_else(|| release_orphan(key))
    }

    /// [`unlisten_by_key`](Self::unlisten_by_key) for every key in `keys`.
    pub fn unlisten_by_keys<'a>(&self, keys: impl IntoIterator<Item = &'a ListenerKey>) {
        for key in keys {
            self.unlisten_by_key(key);
        }
    }

    /// Remove every registration on `target` and detach its store.
    pub fn unlisten_all<T: Listenable + ?Sized>(&self, target: &Arc<T>) {
        self.with_store(target_id_of(target), None, |native, store| {
            for (_, keys) in store.drain() {
                for key in keys {
                    Self::release(native.as_ref(), &key);
                }
            }
        });
    }

    /// Snapshot of the registrations for `event_type` on `target`, in
    /// registration order.
    ///
    /// `None` when no bucket exists, which is also the case once every
    /// registration of the type has been removed.
    ///
    /// For a target with its own listener lists the target's list is the
    /// bucket: it includes registrations made through other registries.
    pub fn get_listeners<T: Listenable + ?Sized>(
        &self,
        target: &Arc<T>,
        event_type: &str,
    ) -> Option<Vec<ListenerKey>> {
        let own = self
            .with_store(target_id_of(target), None, |native, store| {
                compat::sync_with_target(native.as_ref(), store, event_type);
                store.bucket(event_type).map(<[ListenerKey]>::to_vec)
            })
            .flatten();

        match target.bookkeeping() {
            Some(bookkeeping) => {
                Some(compat::installed_keys(bookkeeping, event_type)).filter(|keys| !keys.is_empty())
            }
            None => own,
        }
    }

    /// Whether a store is currently attached to `target`.
    pub fn has_store<T: Listenable + ?Sized>(&self, target: &Arc<T>) -> bool {
        lock(&self.state.targets).contains_key(&target_id_of(target))
    }

    /// Number of targets with an attached store.
    pub fn target_count(&self) -> usize {
        lock(&self.state.targets).len()
    }

    /// Detach the stores of targets that have been dropped.
    ///
    /// Their registrations are retired; there is nothing native to undo.
    /// Returns the number of stores detached.
    pub fn purge_dead_targets(&self) -> usize {
        let mut dead = Vec::new();
        lock(&self.state.targets).retain(|_, entry| {
            let alive = entry.target.strong_count() > 0;
            if !alive {
                dead.push(Arc::clone(entry));
            }
            alive
        });

        for entry in &dead {
            let mut slot = lock(&entry.slot);
            slot.detached = true;
            for (_, keys) in slot.store.drain() {
                for key in keys {
                    key.retire();
                }
            }
        }

        if !dead.is_empty() {
            tracing::debug!(purged = dead.len(), "stores of dropped targets detached");
        }
        dead.len()
    }

    fn maybe_sweep(&self) {
        let interval = self.state.config.sweep_interval;
        if interval == 0 {
            return;
        }
        let count = self
            .state
            .since_sweep
            .fetch_add(1, Ordering::Relaxed)
            .wrapping_add(1);
        if count % interval == 0 {
            self.purge_dead_targets();
        }
    }

    fn owns(&self, key: &ListenerKey) -> bool {
        core::ptr::eq(key.registry().as_ptr(), Arc::as_ptr(&self.state))
    }

    /// Retire `key` and uninstall its bound listener from `native`.
    fn release(native: &dyn Listenable, key: &ListenerKey) -> bool {
        if !key.retire() {
            return false;
        }
        if let Some(bound) = key.installed_listener() {
            native.remove_event_listener(key.event_type(), bound);
        }
        tracing::debug!(
            listener_id = %key.id(),
            event_type = key.event_type(),
            target_id = %key.target_id(),
            "listener removed"
        );
        true
    }

    /// Run `f` on the live store of `target_id` under that target's lock.
    ///
    /// With `create` set, a missing store is attached first; otherwise a
    /// missing store (or a dropped target) yields `None`. A store left empty
    /// by `f` is detached afterwards.
    fn with_store<R>(
        &self,
        target_id: TargetId,
        create: Option<&Arc<dyn Listenable>>,
        f: impl FnOnce(&Arc<dyn Listenable>, &mut ListenerStore) -> R,
    ) -> Option<R> {
        let mut f = Some(f);
        loop {
            let entry = match create {
                Some(target) => self.attach(target_id, target),
                None => lock(&self.state.targets).get(&target_id).cloned()?,
            };
            let native = entry.target.upgrade()?;

            let (result, emptied) = {
                let mut slot = lock(&entry.slot);
                if slot.detached {
                    continue;
                }
                let result = (f.take()?)(&native, &mut slot.store);
                (result, slot.store.is_empty())
            };

            if emptied {
                self.detach_if_empty(target_id, &entry);
            }
            return Some(result);
        }
    }

    fn attach(&self, target_id: TargetId, target: &Arc<dyn Listenable>) -> Arc<TargetEntry> {
        let mut targets = lock(&self.state.targets);
        let entry = targets.entry(target_id).or_insert_with(|| {
            tracing::debug!(%target_id, "listener store attached");
            Arc::new(TargetEntry {
                target: Arc::downgrade(target),
                slot: Mutex::default(),
            })
        });
        Arc::clone(entry)
    }

    fn detach_if_empty(&self, target_id: TargetId, entry: &Arc<TargetEntry>) {
        let mut targets = lock(&self.state.targets);
        let mut slot = lock(&entry.slot);
        if slot.detached || !slot.store.is_empty() {
            return;
        }
        if targets
            .get(&target_id)
            .is_some_and(|current| Arc::ptr_eq(current, entry))
        {
            targets.remove(&target_id);
        }
        slot.detached = true;
        tracing::debug!(%target_id, "listener store detached");
    }
}

/// Retire `key` whose registry is gone, uninstalling its wrapper if the
/// target is still alive.
pub(crate) fn release_orphan(key: &ListenerKey) -> bool {
    match key.target() {
        Some(target) => Registry::release(target.as_ref(), key),
        None => key.retire(),
    }
}

/// [`Registry::listen`] on the process-wide registry.
pub fn listen<T: Listenable + ?Sized>(
    target: &Arc<T>,
    types: impl IntoEventTypes,
    listener: &Listener,
    bind_to: Option<&BindTo>,
) -> RegistryResult<ListenerKey> {
    Registry::global().listen(target, types, listener, bind_to)
}

/// [`Registry::listen_once`] on the process-wide registry.
pub fn listen_once<T: Listenable + ?Sized>(
    target: &Arc<T>,
    types: impl IntoEventTypes,
    listener: &Listener,
    bind_to: Option<&BindTo>,
) -> RegistryResult<ListenerKey> {
    Registry::global().listen_once(target, types, listener, bind_to)
}

/// [`Registry::unlisten`] on the process-wide registry.
pub fn unlisten<T: Listenable + ?Sized>(
    target: &Arc<T>,
    types: impl IntoEventTypes,
    listener: &Listener,
    bind_to: Option<&BindTo>,
) {
    Registry::global().unlisten(target, types, listener, bind_to)
}

/// Remove the registration `key` refers to, whichever registry created it.
pub fn unlisten_by_key(key: &ListenerKey) -> bool {
    Registry::global().unlisten_by_key(key)
}

pub fn unlisten_by_keys<'a>(keys: impl IntoIterator<Item = &'a ListenerKey>) {
    Registry::global().unlisten_by_keys(keys)
}

/// [`Registry::unlisten_all`] on the process-wide registry.
pub fn unlisten_all<T: Listenable + ?Sized>(target: &Arc<T>) {
    Registry::global().unlisten_all(target)
}

/// [`Registry::get_listeners`] on the process-wide registry.
pub fn get_listeners<T: Listenable + ?Sized>(
    target: &Arc<T>,
    event_type: &str,
) -> Option<Vec<ListenerKey>> {
    Registry::global().get_listeners(target, event_type)
}

//! `tether-events`: listener registration bookkeeping for event targets.
//!
//! This crate does **not** dispatch events. It sits above heterogeneous
//! targets (anything implementing [`Listenable`]) and gives callers one way to
//! register, deduplicate and revoke callbacks:
//!
//! - a registration is identified by `(target, type, listener, bind_to)`;
//!   registering the same tuple twice yields the same [`ListenerKey`] and a
//!   single native registration
//! - [`listen_once`] registrations remove themselves right before their first
//!   invocation
//! - [`unlisten`], [`unlisten_by_key`] and [`unlisten_all`] are idempotent
//! - targets that keep their own listener lists ([`ListenerBookkeeping`]) stay
//!   the source of truth for what is installed
//!
//! ```ignore
//! let target = EventTarget::new();
//! let listener = Listener::new(|_ctx, event| println!("{}", event.event_type()));
//!
//! let key = listen(&target, ["moveend", "change"], &listener, None)?;
//! target.dispatch_event("moveend");
//! unlisten_by_key(&key);
//! ```

pub mod config;
pub mod event;
pub mod event_target;
pub mod event_types;
pub mod finder;
pub mod listener;
pub mod record;
pub mod registry;
pub mod store;
pub mod target;
pub mod testing;

mod binder;
mod compat;

pub use config::RegistryConfig;
pub use event::Event;
pub use event_target::EventTarget;
pub use event_types::IntoEventTypes;
pub use finder::{Found, find_listener, same_registration};
pub use listener::{BindTo, Context, Listener};
pub use record::{ListenerKey, ListenerRecord};
pub use registry::{
    Registry, get_listeners, listen, listen_once, unlisten, unlisten_all, unlisten_by_key,
    unlisten_by_keys,
};
pub use store::ListenerStore;
pub use target::{BoundListener, IntoTarget, Listenable, ListenerBookkeeping};
pub use tether_core::{ListenerId, RegistryError, RegistryResult, TargetError, TargetId};

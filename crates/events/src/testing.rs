//! Recording target for tests/dev.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use tether_core::TargetError;

use crate::event::Event;
use crate::target::{BoundListener, Listenable};

#[derive(Debug, Default)]
struct Recorded {
    adds: Vec<String>,
    removes: Vec<String>,
    installed: HashMap<String, Vec<BoundListener>>,
}

/// A plain target with no bookkeeping of its own.
///
/// - counts every native add/remove call
/// - keeps what is installed so tests can [`fire`](Self::fire) it
/// - can be told to reject certain event types
#[derive(Debug, Default)]
pub struct RecordingTarget {
    recorded: Mutex<Recorded>,
    rejected: HashSet<String>,
}

impl RecordingTarget {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A target whose native add fails for each of `event_types`.
    pub fn rejecting<'a>(event_types: impl IntoIterator<Item = &'a str>) -> Arc<Self> {
        Arc::new(Self {
            recorded: Mutex::default(),
            rejected: event_types.into_iter().map(str::to_owned).collect(),
        })
    }

    fn recorded(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of native add calls that succeeded.
    pub fn add_count(&self) -> usize {
        self.recorded().adds.len()
    }

    /// Number of native remove calls.
    pub fn remove_count(&self) -> usize {
        self.recorded().removes.len()
    }

    /// Event types of native remove calls, in call order.
    pub fn removed_types(&self) -> Vec<String> {
        self.recorded().removes.clone()
    }

    /// Bound listeners currently installed for `event_type`.
    pub fn installed(&self, event_type: &str) -> Vec<BoundListener> {
        self.recorded()
            .installed
            .get(event_type)
            .cloned()
            .unwrap_or_default()
    }

    /// Invoke every listener installed for `event_type`; returns the event.
    ///
    /// Listeners run on a snapshot, outside the internal lock.
    pub fn fire(&self, event_type: &str) -> Event {
        let mut event = Event::new(event_type);
        for listener in self.installed(event_type) {
            listener.call(&mut event);
        }
        event
    }
}

impl Listenable for RecordingTarget {
    fn add_event_listener(
        &self,
        event_type: &str,
        listener: BoundListener,
    ) -> Result<(), TargetError> {
        if self.rejected.contains(event_type) {
            return Err(TargetError::unsupported(event_type));
        }
        let mut recorded = self.recorded();
        recorded.adds.push(event_type.to_owned());
        recorded
            .installed
            .entry(event_type.to_owned())
            .or_default()
            .push(listener);
        Ok(())
    }

    fn remove_event_listener(&self, event_type: &str, listener: &BoundListener) {
        let mut recorded = self.recorded();
        recorded.removes.push(event_type.to_owned());
        if let Some(installed) = recorded.installed.get_mut(event_type) {
            installed.retain(|l| l != listener);
            if installed.is_empty() {
                recorded.installed.remove(event_type);
            }
        }
    }
}

use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::target::Listenable;

/// An event handed to listeners.
///
/// Events carry:
/// - a **type** (the bucket key listeners registered for)
/// - a **target** back-reference, set by whoever dispatches it
/// - an arbitrary JSON **payload**
/// - two flags listeners use to talk back to the dispatcher
#[derive(Debug, Clone)]
pub struct Event {
    event_type: String,
    target: Option<Weak<dyn Listenable>>,
    payload: Value,
    occurred_at: DateTime<Utc>,
    propagation_stopped: bool,
    default_prevented: bool,
}

impl Event {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            target: None,
            payload: Value::Null,
            occurred_at: Utc::now(),
            propagation_stopped: false,
            default_prevented: false,
        }
    }

    /// Attach a serializable payload.
    pub fn with_payload<P: Serialize + ?Sized>(mut self, payload: &P) -> serde_json::Result<Self> {
        self.payload = serde_json::to_value(payload)?;
        Ok(self)
    }

    pub fn with_value(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// The object the event was dispatched on, if it is still alive.
    pub fn target(&self) -> Option<Arc<dyn Listenable>> {
        self.target.as_ref().and_then(Weak::upgrade)
    }

    /// Record `target` as the object this event is dispatched on.
    pub fn set_target<T: Listenable + ?Sized>(&mut self, target: &Arc<T>) {
        let target: Arc<dyn Listenable> = Arc::clone(target).into_target();
        self.target = Some(Arc::downgrade(&target));
    }

    pub(crate) fn set_target_weak(&mut self, target: Weak<dyn Listenable>) {
        self.target = Some(target);
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Deserialize the payload into `T`.
    pub fn payload_as<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(&self.payload)
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    /// Ask the dispatcher not to invoke any further listeners.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Mark the event's default action as cancelled.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

impl From<&str> for Event {
    fn from(event_type: &str) -> Self {
        Self::new(event_type)
    }
}

impl From<String> for Event {
    fn from(event_type: String) -> Self {
        Self::new(event_type)
    }
}

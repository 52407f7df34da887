//! Error model.
//!
//! Removal paths never fail; only registration against a target can.

use thiserror::Error;

/// Result type used by registration operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Failure reported by a target's native add-capability.
#[derive(Debug, Error)]
pub enum TargetError {
    /// The target does not emit this event type.
    #[error("event type `{0}` is not supported by this target")]
    UnsupportedType(String),

    /// The target was disposed and accepts no new listeners.
    #[error("target has been disposed")]
    Disposed,

    /// Any other target-specific failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TargetError {
    pub fn unsupported(event_type: impl Into<String>) -> Self {
        Self::UnsupportedType(event_type.into())
    }
}

/// Registry-level error.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// `listen`/`listen_once` was called with an empty list of event types.
    #[error("no event types given")]
    NoEventTypes,

    /// The target refused the native registration for `event_type`.
    #[error("target rejected listener for `{event_type}`: {source}")]
    Rejected {
        event_type: String,
        #[source]
        source: TargetError,
    },
}

impl RegistryError {
    pub fn rejected(event_type: impl Into<String>, source: TargetError) -> Self {
        Self::Rejected {
            event_type: event_type.into(),
            source,
        }
    }

    /// Event type the failure refers to, if any.
    pub fn event_type(&self) -> Option<&str> {
        match self {
            Self::NoEventTypes => None,
            Self::Rejected { event_type, .. } => Some(event_type),
        }
    }
}

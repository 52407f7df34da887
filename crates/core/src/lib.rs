//! `tether-core`: identifiers and the error model shared by the listener registry.
//!
//! This crate has **no registry logic**; it only holds the primitives the
//! `tether-events` crate and target implementations agree on.

pub mod error;
pub mod id;

pub use error::{RegistryError, RegistryResult, TargetError};
pub use id::{ListenerId, TargetId};

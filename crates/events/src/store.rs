//! Per-target listener store: event type → bucket of keys.
//!
//! Buckets keep registration order and are never left empty; a type with no
//! listeners has no bucket at all.

use std::collections::HashMap;

use crate::record::ListenerKey;

#[derive(Debug, Default)]
pub struct ListenerStore {
    buckets: HashMap<String, Vec<ListenerKey>>,
}

impl ListenerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The bucket for `event_type`, if one exists.
    pub fn bucket(&self, event_type: &str) -> Option<&[ListenerKey]> {
        self.buckets.get(event_type).map(Vec::as_slice)
    }

    pub(crate) fn bucket_mut(&mut self, event_type: &str) -> Option<&mut Vec<ListenerKey>> {
        self.buckets.get_mut(event_type)
    }

    /// Append `key` to the bucket of its event type.
    pub(crate) fn push(&mut self, key: ListenerKey) {
        self.buckets
            .entry(key.event_type().to_owned())
            .or_default()
            .push(key);
    }

    /// Remove the key at `index` of the `event_type` bucket.
    pub(crate) fn remove_at(&mut self, event_type: &str, index: usize) -> Option<ListenerKey> {
        let bucket = self.buckets.get_mut(event_type)?;
        if index >= bucket.len() {
            return None;
        }
        let key = bucket.remove(index);
        self.prune(event_type);
        Some(key)
    }

    /// Position of `key` within its own bucket.
    pub(crate) fn position(&self, key: &ListenerKey) -> Option<usize> {
        self.bucket(key.event_type())?
            .iter()
            .position(|candidate| candidate == key)
    }

    /// Drop the `event_type` bucket if it is empty.
    pub(crate) fn prune(&mut self, event_type: &str) {
        if self.buckets.get(event_type).is_some_and(Vec::is_empty) {
            self.buckets.remove(event_type);
        }
    }

    /// Remove and return every bucket.
    pub(crate) fn drain(&mut self) -> Vec<(String, Vec<ListenerKey>)> {
        self.buckets.drain().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Total number of registrations across all types.
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn event_types(&self) -> impl Iterator<Item = &str> {
        self.buckets.keys().map(String::as_str)
    }
}

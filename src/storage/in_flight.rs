//! Shared registry of URLs dispatched downstream and not yet acknowledged.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Instant;

use super::{AckSink, InFlight};

/// In-flight map shared between the poller (reads) and the ack path (writes).
#[derive(Debug, Default)]
pub struct InFlightRegistry {
    entries: RwLock<HashMap<String, Instant>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// When `url` was handed downstream, if it is still in flight.
    pub fn dispatched_at(&self, url: &str) -> Option<Instant> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(url)
            .copied()
    }

    fn remove(&self, id: &str) -> bool {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(id)
            .is_some()
    }
}

impl InFlight for InFlightRegistry {
    fn contains(&self, url: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(url)
    }
}

impl AckSink for InFlightRegistry {
    fn mark_in_progress(&self, url: &str) {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(url.to_string(), Instant::now());
    }

    fn ack_success(&self, id: &str) {
        if !self.remove(id) {
            log::debug!("Ack for {} which was not in flight", id);
        }
    }

    fn ack_failure(&self, id: &str) {
        if !self.remove(id) {
            log::debug!("Fail for {} which was not in flight", id);
        }
    }
}

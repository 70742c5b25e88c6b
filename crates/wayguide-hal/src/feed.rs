//! [`LatestValue`] – the hand-off cell between an external sensor driver and
//! the guide loop.
//!
//! A driver thread (serial reader, GPS daemon, detector process) publishes
//! every sample it parses; the loop only ever reads the most recent one.
//! Nothing queues: a slow reader simply skips intermediate samples.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

/// Shared slot holding the newest sample and when it arrived.
///
/// Clones share the same slot, so the writer half and the reader half are
/// just two clones.
#[derive(Debug)]
pub struct LatestValue<T> {
    slot: Arc<Mutex<Option<(T, Instant)>>>,
}

impl<T> Clone for LatestValue<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Default for LatestValue<T> {
    fn default() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
        }
    }
}

impl<T: Clone> LatestValue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value`, stamped now.
    pub fn publish(&self, value: T) {
        self.publish_at(value, Instant::now());
    }

    /// Store `value` with an explicit arrival instant.
    pub fn publish_at(&self, value: T, at: Instant) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some((value, at));
    }

    /// Forget the current sample (signal lost).
    pub fn clear(&self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn latest(&self) -> Option<(T, Instant)> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn empty_until_published() {
        let cell: LatestValue<u32> = LatestValue::new();
        assert!(cell.latest().is_none());
        cell.publish(7);
        assert_eq!(cell.latest().map(|(v, _)| v), Some(7));
    }

    #[test]
    fn newer_sample_replaces_older() {
        let cell = LatestValue::new();
        let t0 = Instant::now();
        cell.publish_at("a", t0);
        cell.publish_at("b", t0);
        assert_eq!(cell.latest(), Some(("b", t0)));
        cell.clear();
        assert!(cell.latest().is_none());
    }

    #[test]
    fn writer_clone_on_another_thread() {
        let reader: LatestValue<u32> = LatestValue::new();
        let writer = reader.clone();
        thread::spawn(move || writer.publish(42)).join().unwrap();
        assert_eq!(reader.latest().map(|(v, _)| v), Some(42));
    }
}

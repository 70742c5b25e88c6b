//! [`SpeechQueue`] – priority ordering of sentences for the audio sink.
//!
//! A text-to-speech engine can only say one thing at a time.  The queue
//! decides what comes next:
//!
//! ```text
//! Emergency  >  Social  >  Navigational  >  Status
//! ```
//!
//! Within one priority, sentences come out in the order they were pushed.
//! Pushing an [`SpeechPriority::Emergency`] sentence discards everything of
//! lower priority still waiting, since it would be stale by the time the
//! emergency has been spoken.
//!
//! # Example
//!
//! ```
//! use wayguide_middleware::{SpeechPriority, SpeechQueue};
//!
//! let mut q = SpeechQueue::new(16);
//! q.push(SpeechPriority::Status, "Battery at 80 percent");
//! q.push(SpeechPriority::Navigational, "Turn left");
//! q.push(SpeechPriority::Emergency, "Stop! pole in the center 0.25 meters ahead");
//!
//! assert_eq!(q.pop().unwrap().text, "Stop! pole in the center 0.25 meters ahead");
//! assert!(q.pop().is_none());
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;
use wayguide_types::{Event, EventPayload, WarningTier};

/// Urgency of a sentence, most urgent first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SpeechPriority {
    Emergency,
    /// People-related cues (someone approaching, a familiar face).
    Social,
    Navigational,
    Status,
}

/// One queued sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechItem {
    pub priority: SpeechPriority,
    pub text: String,
    seq: u64,
}

/// Bounded priority queue of sentences.
#[derive(Debug, Clone)]
pub struct SpeechQueue {
    /// Kept sorted by `(priority, seq)`.
    items: Vec<SpeechItem>,
    capacity: usize,
    next_seq: u64,
}

impl SpeechQueue {
    /// A queue holding at most `capacity` sentences.  When full, a new
    /// sentence evicts the least urgent, newest one if it outranks it, and is
    /// dropped otherwise.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity: capacity.max(1),
            next_seq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Queue `text`.  Returns `false` when it was dropped (duplicate of a
    /// queued sentence, or queue full of more urgent ones).
    pub fn push(&mut self, priority: SpeechPriority, text: impl Into<String>) -> bool {
        let text = text.into();
        if self
            .items
            .iter()
            .any(|i| i.priority == priority && i.text == text)
        {
            return false;
        }

        if priority == SpeechPriority::Emergency {
            let before = self.items.len();
            self.items.retain(|i| i.priority == SpeechPriority::Emergency);
            let dropped = before - self.items.len();
            if dropped > 0 {
                debug!(dropped, "emergency pre-empted queued speech");
            }
        }

        if self.items.len() >= self.capacity {
            match self.items.last() {
                Some(last) if last.priority > priority => {
                    self.items.pop();
                }
                _ => return false,
            }
        }

        let item = SpeechItem {
            priority,
            text,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        let at = self
            .items
            .partition_point(|i| (i.priority, i.seq) <= (item.priority, item.seq));
        self.items.insert(at, item);
        true
    }

    /// The next sentence to speak.
    pub fn pop(&mut self) -> Option<SpeechItem> {
        if self.items.is_empty() {
            None
        } else {
            Some(self.items.remove(0))
        }
    }

    pub fn peek(&self) -> Option<&SpeechItem> {
        self.items.first()
    }

    /// Queue whatever an audio sink should say for `event`.
    ///
    /// Navigation and transit prompts are navigational; system alerts are
    /// status.  Of an obstacle batch only the most urgent warning is spoken,
    /// and only when it is Emergency or Warning tier.  Returns how many
    /// sentences were queued.
    pub fn push_event(&mut self, event: &Event) -> usize {
        match &event.payload {
            EventPayload::Navigation(nav) => nav
                .spoken_text()
                .map(|text| usize::from(self.push(SpeechPriority::Navigational, text)))
                .unwrap_or(0),
            EventPayload::Obstacles(warnings) => match warnings.first() {
                Some(w) if w.tier == WarningTier::Emergency => {
                    usize::from(self.push(SpeechPriority::Emergency, w.message.clone()))
                }
                Some(w) if w.tier == WarningTier::Warning => {
                    usize::from(self.push(SpeechPriority::Navigational, w.message.clone()))
                }
                _ => 0,
            },
            EventPayload::SystemAlert { message, .. } => {
                usize::from(self.push(SpeechPriority::Status, message.clone()))
            }
        }
    }
}

impl Default for SpeechQueue {
    fn default() -> Self {
        Self::new(32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayguide_types::NavEvent;

    #[test]
    fn pops_by_priority_then_fifo() {
        let mut q = SpeechQueue::default();
        q.push(SpeechPriority::Status, "s1");
        q.push(SpeechPriority::Navigational, "n1");
        q.push(SpeechPriority::Social, "p1");
        q.push(SpeechPriority::Navigational, "n2");

        let order: Vec<String> = std::iter::from_fn(|| q.pop()).map(|i| i.text).collect();
        assert_eq!(order, vec!["p1", "n1", "n2", "s1"]);
    }

    #[test]
    fn emergency_drops_lower_priority_items() {
        let mut q = SpeechQueue::default();
        q.push(SpeechPriority::Emergency, "e1");
        q.push(SpeechPriority::Navigational, "n1");
        q.push(SpeechPriority::Status, "s1");
        q.push(SpeechPriority::Emergency, "e2");

        assert_eq!(q.len(), 2);
        assert_eq!(q.pop().unwrap().text, "e1");
        assert_eq!(q.pop().unwrap().text, "e2");
    }

    #[test]
    fn duplicates_are_ignored() {
        let mut q = SpeechQueue::default();
        assert!(q.push(SpeechPriority::Navigational, "Turn left"));
        assert!(!q.push(SpeechPriority::Navigational, "Turn left"));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn full_queue_evicts_only_less_urgent() {
        let mut q = SpeechQueue::new(2);
        q.push(SpeechPriority::Navigational, "n1");
        q.push(SpeechPriority::Status, "s1");
        assert!(q.push(SpeechPriority::Social, "p1"));
        assert_eq!(q.len(), 2);
        assert!(!q.push(SpeechPriority::Status, "s2"));
        assert_eq!(q.peek().unwrap().text, "p1");
    }

    #[test]
    fn events_map_to_priorities() {
        let mut q = SpeechQueue::default();
        let announce = Event::new(
            "test",
            EventPayload::Navigation(NavEvent::Announce {
                step_index: 0,
                instruction: "Turn right".to_string(),
            }),
        );
        let advanced = Event::new(
            "test",
            EventPayload::Navigation(NavEvent::StepAdvanced {
                from: 0,
                to: 1,
                reason: wayguide_types::AdvanceReason::Proximity,
            }),
        );
        let alert = Event::new(
            "test",
            EventPayload::SystemAlert {
                component: "position".to_string(),
                message: "Waiting for GPS signal".to_string(),
            },
        );
        let empty = Event::new("test", EventPayload::Obstacles(vec![]));

        assert_eq!(q.push_event(&announce), 1);
        assert_eq!(q.push_event(&advanced), 0);
        assert_eq!(q.push_event(&alert), 1);
        assert_eq!(q.push_event(&empty), 0);
        assert_eq!(q.pop().unwrap().priority, SpeechPriority::Navigational);
        assert_eq!(q.pop().unwrap().priority, SpeechPriority::Status);
    }
}

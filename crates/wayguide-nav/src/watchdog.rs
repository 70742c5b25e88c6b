//! [`FeedWatchdog`] – sensor feed freshness monitor.
//!
//! The position, ranging and vision feeds run on their own cadences.  Each
//! time a feed delivers a sample the runtime calls [`FeedWatchdog::record`];
//! a feed whose last sample is older than its deadline is reported as
//! [`FeedHealth::Silent`] so the user can be told ("waiting for GPS signal")
//! instead of silently losing guidance.
//!
//! All methods take an explicit `now` so the monitor can be driven from a
//! simulated clock.
//!
//! # Example
//!
//! ```
//! use std::time::{Duration, Instant};
//! use wayguide_nav::watchdog::{FeedHealth, FeedWatchdog, SensorFeed};
//!
//! let t0 = Instant::now();
//! let mut wd = FeedWatchdog::new();
//! wd.register(SensorFeed::Position, Duration::from_secs(5), t0);
//! wd.record(SensorFeed::Position, t0);
//!
//! assert_eq!(wd.health(SensorFeed::Position, t0), FeedHealth::Healthy);
//! assert_eq!(
//!     wd.health(SensorFeed::Position, t0 + Duration::from_secs(6)),
//!     FeedHealth::Silent,
//! );
//! ```

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Public types
// ────────────────────────────────────────────────────────────────────────────

/// The independently clocked inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorFeed {
    Position,
    Ranging,
    Vision,
}

impl SensorFeed {
    /// Sentence for the user when the feed goes quiet.
    pub fn silence_message(self) -> &'static str {
        match self {
            SensorFeed::Position => "Waiting for GPS signal",
            SensorFeed::Ranging => "Distance sensor unavailable, using camera estimates",
            SensorFeed::Vision => "Camera unavailable, obstacle detection paused",
        }
    }
}

impl std::fmt::Display for SensorFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorFeed::Position => write!(f, "position"),
            SensorFeed::Ranging => write!(f, "ranging"),
            SensorFeed::Vision => write!(f, "vision"),
        }
    }
}

/// Freshness of a single feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedHealth {
    /// Sampled within its deadline.
    Healthy,
    /// Silent past its deadline, or never registered.
    Silent,
}

struct FeedEntry {
    last_sample: Instant,
    deadline: Duration,
}

// ────────────────────────────────────────────────────────────────────────────
// FeedWatchdog
// ────────────────────────────────────────────────────────────────────────────

/// Tracks the last sample instant of each registered feed.
#[derive(Default)]
pub struct FeedWatchdog {
    feeds: HashMap<SensorFeed, FeedEntry>,
}

impl FeedWatchdog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `feed` with a maximum gap between samples.
    ///
    /// The feed starts healthy as of `now`; re-registering resets it.
    pub fn register(&mut self, feed: SensorFeed, deadline: Duration, now: Instant) {
        self.feeds.insert(
            feed,
            FeedEntry {
                last_sample: now,
                deadline,
            },
        );
    }

    /// Record a sample that arrived at `at`.  No-op for unregistered feeds;
    /// an instant older than the last recorded one changes nothing.
    pub fn record(&mut self, feed: SensorFeed, at: Instant) {
        if let Some(entry) = self.feeds.get_mut(&feed) {
            entry.last_sample = entry.last_sample.max(at);
        }
    }

    pub fn health(&self, feed: SensorFeed, now: Instant) -> FeedHealth {
        match self.feeds.get(&feed) {
            Some(entry) if now.saturating_duration_since(entry.last_sample) <= entry.deadline => {
                FeedHealth::Healthy
            }
            _ => FeedHealth::Silent,
        }
    }

    /// Time since the last sample of `feed`.
    pub fn silence(&self, feed: SensorFeed, now: Instant) -> Option<Duration> {
        self.feeds
            .get(&feed)
            .map(|e| now.saturating_duration_since(e.last_sample))
    }

    /// Registered feeds past their deadline, in `Position, Ranging, Vision`
    /// order.
    pub fn check_all(&self, now: Instant) -> Vec<SensorFeed> {
        [SensorFeed::Position, SensorFeed::Ranging, SensorFeed::Vision]
            .into_iter()
            .filter(|feed| {
                self.feeds.get(feed).is_some_and(|e| {
                    now.saturating_duration_since(e.last_sample) > e.deadline
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn fresh_feed_is_healthy() {
        let t0 = Instant::now();
        let mut wd = FeedWatchdog::new();
        wd.register(SensorFeed::Ranging, ms(500), t0);
        assert_eq!(wd.health(SensorFeed::Ranging, t0), FeedHealth::Healthy);
    }

    #[test]
    fn sample_resets_deadline() {
        let t0 = Instant::now();
        let mut wd = FeedWatchdog::new();
        wd.register(SensorFeed::Ranging, ms(20), t0);
        wd.record(SensorFeed::Ranging, t0 + ms(15));
        assert_eq!(
            wd.health(SensorFeed::Ranging, t0 + ms(30)),
            FeedHealth::Healthy
        );
    }

    #[test]
    fn older_sample_does_not_rewind_the_feed() {
        let t0 = Instant::now();
        let mut wd = FeedWatchdog::new();
        wd.register(SensorFeed::Ranging, ms(20), t0);
        wd.record(SensorFeed::Ranging, t0 + ms(15));
        wd.record(SensorFeed::Ranging, t0);
        assert_eq!(wd.silence(SensorFeed::Ranging, t0 + ms(30)), Some(ms(15)));
    }

    #[test]
    fn silent_feed_times_out() {
        let t0 = Instant::now();
        let mut wd = FeedWatchdog::new();
        wd.register(SensorFeed::Vision, ms(20), t0);
        assert_eq!(wd.health(SensorFeed::Vision, t0 + ms(21)), FeedHealth::Silent);
        assert_eq!(wd.silence(SensorFeed::Vision, t0 + ms(21)), Some(ms(21)));
    }

    #[test]
    fn check_all_lists_only_silent_feeds() {
        let t0 = Instant::now();
        let mut wd = FeedWatchdog::new();
        wd.register(SensorFeed::Position, ms(20), t0);
        wd.register(SensorFeed::Ranging, ms(20), t0);
        wd.register(SensorFeed::Vision, Duration::from_secs(60), t0);
        wd.record(SensorFeed::Ranging, t0 + ms(25));

        assert_eq!(wd.check_all(t0 + ms(30)), vec![SensorFeed::Position]);
        assert!(wd.check_all(t0 + ms(10)).is_empty());
    }

    #[test]
    fn unregistered_feed_is_silent_and_record_is_noop() {
        let t0 = Instant::now();
        let mut wd = FeedWatchdog::new();
        wd.record(SensorFeed::Position, t0);
        assert_eq!(wd.health(SensorFeed::Position, t0), FeedHealth::Silent);
        assert!(wd.check_all(t0).is_empty());
    }

    #[test]
    fn reregister_resets_timer() {
        let t0 = Instant::now();
        let mut wd = FeedWatchdog::new();
        wd.register(SensorFeed::Position, ms(20), t0);
        assert_eq!(wd.health(SensorFeed::Position, t0 + ms(30)), FeedHealth::Silent);
        wd.register(SensorFeed::Position, ms(20), t0 + ms(30));
        assert_eq!(wd.health(SensorFeed::Position, t0 + ms(30)), FeedHealth::Healthy);
    }
}

//! [`PositionProvider`] – source of position fixes (~1 Hz).

use std::time::Duration;

use tracing::{debug, warn};
use wayguide_types::GeoPoint;

use crate::feed::LatestValue;

/// Anything that can report the user's current position.
///
/// `None` means no usable fix right now (no satellites, indoors, driver not
/// started).  Implementations never block waiting for a fresh sample.
pub trait PositionProvider: Send {
    /// Stable identifier, e.g. `"sim_gps"`.
    fn id(&self) -> &str;

    fn get_position(&mut self) -> Option<GeoPoint>;
}

// ────────────────────────────────────────────────────────────────────────────
// Simulated
// ────────────────────────────────────────────────────────────────────────────

/// Replays a scripted path.
///
/// With `auto_advance` every poll moves one point along the path; otherwise
/// the position only moves on [`SimGps::step`].  The last point repeats once
/// the path is exhausted.
#[derive(Debug, Clone)]
pub struct SimGps {
    path: Vec<GeoPoint>,
    cursor: usize,
    auto_advance: bool,
    signal: bool,
}

impl SimGps {
    pub fn new(path: Vec<GeoPoint>) -> Self {
        Self {
            path,
            cursor: 0,
            auto_advance: false,
            signal: true,
        }
    }

    pub fn auto_advance(mut self, enabled: bool) -> Self {
        self.auto_advance = enabled;
        self
    }

    /// Move to the next scripted point.  Returns `false` at the end of the
    /// path.
    pub fn step(&mut self) -> bool {
        if self.cursor + 1 < self.path.len() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    /// Simulate losing (or regaining) the fix.
    pub fn set_signal(&mut self, available: bool) {
        self.signal = available;
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

impl PositionProvider for SimGps {
    fn id(&self) -> &str {
        "sim_gps"
    }

    fn get_position(&mut self) -> Option<GeoPoint> {
        if !self.signal {
            return None;
        }
        let fix = self.path.get(self.cursor).copied();
        if self.auto_advance {
            self.step();
        }
        fix
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Feed-backed
// ────────────────────────────────────────────────────────────────────────────

/// Reads fixes an external GPS driver publishes into a [`LatestValue`].
///
/// A fix older than `max_age` counts as no fix.  Invalid coordinates are
/// dropped at the boundary.
pub struct FeedPosition {
    cell: LatestValue<GeoPoint>,
    max_age: Duration,
}

impl FeedPosition {
    pub fn new(cell: LatestValue<GeoPoint>, max_age: Duration) -> Self {
        Self { cell, max_age }
    }
}

impl PositionProvider for FeedPosition {
    fn id(&self) -> &str {
        "feed_gps"
    }

    fn get_position(&mut self) -> Option<GeoPoint> {
        let (fix, at) = self.cell.latest()?;
        if at.elapsed() > self.max_age {
            debug!(age_ms = at.elapsed().as_millis() as u64, "position fix too old");
            return None;
        }
        if !fix.is_valid() {
            warn!(lat = fix.lat, lon = fix.lon, "dropping invalid position fix");
            return None;
        }
        Some(fix)
    }
}

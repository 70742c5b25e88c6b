//! [`RangingSensor`] – narrow-beam distance sensor (~10 Hz).
//!
//! Readings are handed to the fusion engine untouched; validity range and
//! staleness are judged there.  Only physically meaningless samples
//! (negative, NaN) are dropped here.

use std::time::Instant;

use tracing::warn;
use wayguide_types::RangingReading;

use crate::feed::LatestValue;

pub trait RangingSensor: Send {
    fn id(&self) -> &str;

    /// The most recent reading, or `None` when the sensor has produced none.
    fn get_distance(&mut self) -> Option<RangingReading>;
}

fn plausible(distance_cm: f32) -> bool {
    distance_cm.is_finite() && distance_cm >= 0.0
}

/// Replays scripted distances (cm), one per poll, stamped at poll time.
///
/// `None` entries simulate missed samples.  The last entry repeats.
#[derive(Debug, Clone)]
pub struct SimRanging {
    script: Vec<Option<f32>>,
    cursor: usize,
}

impl SimRanging {
    pub fn new(script: Vec<Option<f32>>) -> Self {
        Self { script, cursor: 0 }
    }

    /// A sensor that always reads `distance_cm`.
    pub fn constant(distance_cm: f32) -> Self {
        Self::new(vec![Some(distance_cm)])
    }

    /// A sensor that never answers.
    pub fn silent() -> Self {
        Self::new(Vec::new())
    }
}

impl RangingSensor for SimRanging {
    fn id(&self) -> &str {
        "sim_ranging"
    }

    fn get_distance(&mut self) -> Option<RangingReading> {
        let sample = *self.script.get(self.cursor)?;
        if self.cursor + 1 < self.script.len() {
            self.cursor += 1;
        }
        let cm = sample?;
        plausible(cm).then(|| RangingReading::new(cm, Instant::now()))
    }
}

/// Reads samples a serial driver publishes into a [`LatestValue`].
pub struct FeedRanging {
    cell: LatestValue<f32>,
}

impl FeedRanging {
    pub fn new(cell: LatestValue<f32>) -> Self {
        Self { cell }
    }
}

impl RangingSensor for FeedRanging {
    fn id(&self) -> &str {
        "feed_ranging"
    }

    fn get_distance(&mut self) -> Option<RangingReading> {
        let (cm, at) = self.cell.latest()?;
        if !plausible(cm) {
            warn!(distance_cm = cm, "dropping implausible ranging sample");
            return None;
        }
        Some(RangingReading::new(cm, at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_advances_and_repeats_last() {
        let mut s = SimRanging::new(vec![Some(45.0), None, Some(120.0)]);
        assert_eq!(s.get_distance().map(|r| r.distance_cm), Some(45.0));
        assert!(s.get_distance().is_none());
        assert_eq!(s.get_distance().map(|r| r.distance_cm), Some(120.0));
        assert_eq!(s.get_distance().map(|r| r.distance_cm), Some(120.0));
    }

    #[test]
    fn silent_sensor_reads_nothing() {
        assert!(SimRanging::silent().get_distance().is_none());
    }

    #[test]
    fn out_of_range_values_are_passed_through() {
        let mut s = SimRanging::constant(900.0);
        assert_eq!(s.get_distance().map(|r| r.distance_cm), Some(900.0));
    }

    #[test]
    fn feed_keeps_publish_instant_and_drops_nan() {
        let cell = LatestValue::new();
        let mut s = FeedRanging::new(cell.clone());
        let t0 = Instant::now();
        cell.publish_at(80.0, t0);
        assert_eq!(s.get_distance(), Some(RangingReading::new(80.0, t0)));
        cell.publish(f32::NAN);
        assert!(s.get_distance().is_none());
        cell.publish(-3.0);
        assert!(s.get_distance().is_none());
    }
}

//! [`RepeatSuppressor`] – keeps the same obstacle from being announced over
//! and over.
//!
//! The fusion engine runs ten times a second; a parked car in the left third
//! of the frame would otherwise be announced ten times a second.  The
//! suppressor remembers when each `(label, tier, position)` was last let
//! through and drops repeats inside the cooldown window.
//!
//! Emergency-tier warnings are never suppressed.  A change of tier or
//! position counts as a new warning, so an approaching object is announced
//! again as it crosses each threshold.
//!
//! # Example
//!
//! ```rust
//! use std::time::{Duration, Instant};
//! use wayguide_runtime::repeat_suppressor::RepeatSuppressor;
//!
//! let mut guard = RepeatSuppressor::new(Duration::from_secs(3));
//! let t0 = Instant::now();
//!
//! assert!(guard.admit_key("car", 2, 0, t0));
//! assert!(!guard.admit_key("car", 2, 0, t0 + Duration::from_secs(1)));
//! assert!(guard.admit_key("car", 2, 0, t0 + Duration::from_secs(4)));
//! ```

use std::collections::HashMap;
use std::time::{Duration, Instant};

use wayguide_types::{FramePosition, Warning, WarningTier};

type Key = (String, u8, u8);

/// Cooldown filter over rendered warnings.
pub struct RepeatSuppressor {
    cooldown: Duration,
    last_admitted: HashMap<Key, Instant>,
}

impl RepeatSuppressor {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_admitted: HashMap::new(),
        }
    }

    /// Admit a raw `(label, tier rank, position rank)` key.
    pub fn admit_key(&mut self, label: &str, tier: u8, position: u8, now: Instant) -> bool {
        let key = (label.to_string(), tier, position);
        match self.last_admitted.get(&key) {
            Some(at) if now.saturating_duration_since(*at) < self.cooldown => false,
            _ => {
                self.last_admitted.insert(key, now);
                true
            }
        }
    }

    /// `true` when `warning` should be spoken now.
    pub fn admit(&mut self, warning: &Warning, now: Instant) -> bool {
        if warning.tier == WarningTier::Emergency {
            return true;
        }
        self.admit_key(
            &warning.object.object.label,
            tier_rank(warning.tier),
            position_rank(warning.position),
            now,
        )
    }

    /// Keep at most `limit` warnings that pass [`admit`][Self::admit],
    /// preserving order.  Clear-tier warnings are dropped outright.
    ///
    /// Warnings after the `limit`-th admitted one are not looked at, so they
    /// are not recorded as spoken either.
    pub fn filter(&mut self, warnings: Vec<Warning>, limit: usize, now: Instant) -> Vec<Warning> {
        self.prune(now);
        warnings
            .into_iter()
            .filter(|w| w.tier != WarningTier::Clear && self.admit(w, now))
            .take(limit)
            .collect()
    }

    /// Forget everything.
    pub fn reset(&mut self) {
        self.last_admitted.clear();
    }

    fn prune(&mut self, now: Instant) {
        let cooldown = self.cooldown;
        self.last_admitted
            .retain(|_, at| now.saturating_duration_since(*at) < cooldown);
    }
}

fn tier_rank(tier: WarningTier) -> u8 {
    match tier {
        WarningTier::Emergency => 0,
        WarningTier::Warning => 1,
        WarningTier::Notice => 2,
        WarningTier::Clear => 3,
    }
}

fn position_rank(position: FramePosition) -> u8 {
    match position {
        FramePosition::Left => 0,
        FramePosition::Center => 1,
        FramePosition::Right => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayguide_types::{BoundingBox, DetectedObject, DistanceSource, FusedObject};

    fn warning(label: &str, tier: WarningTier, position: FramePosition) -> Warning {
        Warning {
            object: FusedObject {
                object: DetectedObject {
                    label: label.to_string(),
                    confidence: 0.9,
                    bbox: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
                    frame_width: 640,
                    frame_height: 480,
                },
                distance_m: 0.5,
                source: DistanceSource::VisionEstimate,
                bearing_deg: None,
            },
            tier,
            position,
            message: format!("{label} ahead"),
        }
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn repeat_inside_cooldown_is_dropped() {
        let mut s = RepeatSuppressor::new(secs(3));
        let t0 = Instant::now();
        let w = warning("car", WarningTier::Warning, FramePosition::Left);
        assert!(s.admit(&w, t0));
        assert!(!s.admit(&w, t0 + secs(2)));
        assert!(s.admit(&w, t0 + secs(3)));
    }

    #[test]
    fn emergency_always_passes() {
        let mut s = RepeatSuppressor::new(secs(3));
        let t0 = Instant::now();
        let w = warning("pole", WarningTier::Emergency, FramePosition::Center);
        for i in 0..5 {
            assert!(s.admit(&w, t0 + Duration::from_millis(i * 100)));
        }
    }

    #[test]
    fn tier_or_position_change_is_new() {
        let mut s = RepeatSuppressor::new(secs(3));
        let t0 = Instant::now();
        assert!(s.admit(&warning("car", WarningTier::Notice, FramePosition::Left), t0));
        assert!(s.admit(&warning("car", WarningTier::Warning, FramePosition::Left), t0));
        assert!(s.admit(&warning("car", WarningTier::Warning, FramePosition::Center), t0));
        assert!(s.admit(&warning("bike", WarningTier::Warning, FramePosition::Center), t0));
    }

    #[test]
    fn filter_keeps_order_and_drops_clear() {
        let mut s = RepeatSuppressor::new(secs(3));
        let t0 = Instant::now();
        let batch = vec![
            warning("pole", WarningTier::Emergency, FramePosition::Center),
            warning("car", WarningTier::Notice, FramePosition::Left),
            warning("tree", WarningTier::Clear, FramePosition::Right),
        ];
        let first = s.filter(batch.clone(), 3, t0);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].object.object.label, "pole");

        let second = s.filter(batch, 3, t0 + secs(1));
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].tier, WarningTier::Emergency);
    }

    #[test]
    fn muted_warnings_do_not_use_up_the_limit() {
        let mut s = RepeatSuppressor::new(secs(3));
        let t0 = Instant::now();
        let car = warning("car", WarningTier::Notice, FramePosition::Left);
        let bike = warning("bike", WarningTier::Notice, FramePosition::Center);
        let dog = warning("dog", WarningTier::Notice, FramePosition::Right);
        assert_eq!(s.filter(vec![car.clone()], 1, t0).len(), 1);

        let batch = vec![
            warning("tree", WarningTier::Clear, FramePosition::Right),
            car,
            bike.clone(),
            dog.clone(),
        ];
        let spoken = s.filter(batch, 1, t0 + secs(1));
        assert_eq!(spoken.len(), 1);
        assert_eq!(spoken[0].object.object.label, "bike");

        // The dog was past the limit, so it is still new.
        assert!(s.admit(&dog, t0 + secs(1)));
        assert!(!s.admit(&bike, t0 + secs(1)));
    }

    #[test]
    fn reset_clears_history() {
        let mut s = RepeatSuppressor::new(secs(3));
        let t0 = Instant::now();
        let w = warning("car", WarningTier::Warning, FramePosition::Left);
        s.admit(&w, t0);
        s.reset();
        assert!(s.admit(&w, t0));
    }
}

//! `wayguide-perception` – obstacle awareness.
//!
//! Turns the camera detector's per-frame boxes and the narrow-beam ranging
//! sensor's latest sample into distance-resolved, prioritised warnings.
//!
//! # Modules
//!
//! - [`fusion`] – [`ObstacleFusion`][fusion::ObstacleFusion]: picks a
//!   distance source per detection from its viewing angle and the freshness
//!   of the ranging sample, then tiers and orders the results.
//! - [`estimator`] – [`DistanceEstimator`][estimator::DistanceEstimator]:
//!   the replaceable vision-only distance heuristic used when the ranging
//!   sensor cannot see the object.

pub mod estimator;
pub mod fusion;

pub use estimator::{DistanceEstimator, InverseHeightEstimator};
pub use fusion::{FusionConfig, ObstacleFusion, RangingStatus};

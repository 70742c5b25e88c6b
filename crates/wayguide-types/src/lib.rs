//! `wayguide-types` – shared vocabulary of the Wayguide stack.
//!
//! Every other crate speaks in these types: the route a provider hands to the
//! navigator, the per-frame detections and ranging samples the obstacle
//! fusion engine consumes, the events the runtime publishes on the bus, and
//! the single workspace-wide [`GuideError`].
//!
//! # Modules
//!
//! - [`geo`] – [`GeoPoint`], a validated latitude/longitude pair.
//! - [`route`] – [`Route`], [`RouteStep`], [`TravelMode`] and [`TransitInfo`].
//! - [`obstacle`] – detector and ranging inputs plus the fused outputs
//!   ([`FusedObject`], [`Warning`]).
//! - [`event`] – [`NavStatus`], [`NavEvent`] and the bus [`Event`] envelope.
//! - [`error`] – [`GuideError`].

pub mod error;
pub mod event;
pub mod geo;
pub mod obstacle;
pub mod route;

pub use error::GuideError;
pub use event::{AdvanceReason, Event, EventPayload, NavEvent, NavStatus, TransitPhase};
pub use geo::GeoPoint;
pub use obstacle::{
    BoundingBox, DetectedObject, DistanceSource, FramePosition, FusedObject, RangingReading,
    Warning, WarningTier,
};
pub use route::{Route, RouteStep, TransitInfo, TravelMode};

//! `wayguide-hal` – Sensor & Provider Abstraction
//!
//! Every external input of the guide is a trait with a simulated and a
//! feed-backed implementation, picked at construction time:
//!
//! - [`position`] – [`PositionProvider`][position::PositionProvider]
//! - [`ranging`] – [`RangingSensor`][ranging::RangingSensor]
//! - [`camera`] – [`Camera`][camera::Camera]
//! - [`vision`] – [`VisionDetector`][vision::VisionDetector]
//! - [`route`] – [`RouteProvider`][route::RouteProvider] and
//!   [`RouteBuilder`][route::RouteBuilder]
//! - [`feed`] – [`LatestValue`][feed::LatestValue], the cell external
//!   drivers write into
//! - [`rig`] / [`sim_rig`] – bundle the four sensor drivers into a
//!   [`SensorRig`][rig::SensorRig]

pub mod camera;
pub mod feed;
pub mod position;
pub mod ranging;
pub mod rig;
pub mod route;
pub mod sim_rig;
pub mod vision;

pub use camera::{Camera, CameraFrame, FeedCamera, SimCamera};
pub use feed::LatestValue;
pub use position::{FeedPosition, PositionProvider, SimGps};
pub use ranging::{FeedRanging, RangingSensor, SimRanging};
pub use rig::{FeedWriters, SensorRig};
pub use route::{DirectionsMode, RouteBuilder, RouteProvider, SimRouteProvider};
pub use sim_rig::SimRig;
pub use vision::{Detections, FeedDetector, SimDetector, VisionDetector};

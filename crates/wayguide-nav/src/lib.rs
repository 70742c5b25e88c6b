//! `wayguide-nav` – Navigation & Transit State Machines
//!
//! Turns a pre-computed route and a stream of position fixes into
//! announce / advance / reroute / arrival decisions.  It does no I/O: callers
//! feed it the latest snapshot and publish the [`NavEvent`][wayguide_types::NavEvent]s
//! it hands back.
//!
//! # Modules
//!
//! - [`session`] – [`NavigationSession`][session::NavigationSession]: the
//!   top-level state machine and its [`NavThresholds`][session::NavThresholds].
//! - [`transit`] – [`TransitState`][transit::TransitState]: boarding and stop
//!   counting on transit legs, owned by the session.
//! - [`handle`] – [`SharedSession`][handle::SharedSession]: mutex-guarded,
//!   generation-checked access for concurrent drivers.
//! - [`watchdog`] – [`FeedWatchdog`][watchdog::FeedWatchdog]: detects sensor
//!   feeds that have gone silent.

pub mod handle;
pub mod session;
pub mod transit;
pub mod watchdog;

pub use handle::{SessionTicket, SharedSession};
pub use session::{NavThresholds, NavigationSession, Progress, UpdateOutcome};
pub use transit::{ExitWarning, TransitState, TransitStatus};
pub use watchdog::{FeedHealth, FeedWatchdog, SensorFeed};

//! [`GuideLoop`] – the two-rate orchestrator that keeps the traveller guided.
//!
//! The loop owns the [`SensorRig`] and drives two independent cycles:
//!
//! 1. **Navigation tick** (default 1 Hz) – poll the position driver, feed the
//!    fix to the [`SharedSession`] and publish every resulting [`NavEvent`]
//!    on the navigation and transit topics.
//! 2. **Obstacle tick** (default 10 Hz) – poll the ranging sensor, run the
//!    vision detector on the current frame, fuse both through
//!    [`ObstacleFusion`], drop repeats with the [`RepeatSuppressor`] and
//!    publish what is left on the obstacles topic.
//!
//! Both ticks stamp the [`FeedWatchdog`] with the arrival instant each
//! sample carries, so a driver that keeps handing back its last sample still
//! goes silent.  A feed that stays silent past its deadline raises one
//! [`EventPayload::SystemAlert`]; the alert re-arms once the feed delivers
//! again.
//!
//! The navigation session is shared, so a UI can start a different route
//! while the loop is running.  The loop then holds a stale
//! [`SessionTicket`]: its next navigation tick fails with
//! [`GuideError::StaleSession`] and it stops driving the session until it is
//! handed a new route.
//!
//! # Example
//!
//! ```rust
//! use std::time::Instant;
//! use wayguide_hal::{RouteBuilder, SimRig};
//! use wayguide_runtime::guide_loop::{GuideLoop, GuideLoopConfig};
//! use wayguide_types::{GeoPoint, NavStatus};
//!
//! let origin = GeoPoint { lat: 0.0, lon: 0.0 };
//! let rig = SimRig::builder()
//!     .with_path(vec![origin, GeoPoint { lat: 0.001, lon: 0.0 }])
//!     .build();
//! let mut guide = GuideLoop::new(GuideLoopConfig::default(), rig);
//!
//! let route = RouteBuilder::new(origin)
//!     .walk("Head north", GeoPoint { lat: 0.001, lon: 0.0 })
//!     .build();
//! guide.start_navigation(route).unwrap();
//!
//! guide.nav_tick(Instant::now()).unwrap();
//! guide.nav_tick(Instant::now()).unwrap();
//! assert_eq!(guide.session().get_progress().status, NavStatus::Arrived);
//! ```

use std::collections::HashSet;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use wayguide_hal::{DirectionsMode, RouteProvider, SensorRig};
use wayguide_middleware::EventBus;
use wayguide_nav::{
    FeedWatchdog, NavThresholds, SensorFeed, SessionTicket, SharedSession, UpdateOutcome,
};
use wayguide_perception::{FusionConfig, ObstacleFusion};
use wayguide_types::{
    Event, EventPayload, GuideError, NavEvent, NavStatus, RangingReading, Route, Warning,
};

use crate::repeat_suppressor::RepeatSuppressor;

const SOURCE: &str = "wayguide-runtime::guide_loop";

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Timing knobs for [`GuideLoop`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuideLoopConfig {
    /// Period of the navigation tick.
    pub nav_period_ms: u64,
    /// Period of the obstacle tick.
    pub obstacle_period_ms: u64,
    /// How long an identical non-emergency warning stays muted.
    pub warning_cooldown_ms: u64,
    /// Warnings published per obstacle tick.
    pub max_warnings: usize,
    /// Silence after which the GPS feed is reported lost.
    pub position_deadline_ms: u64,
    pub ranging_deadline_ms: u64,
    pub vision_deadline_ms: u64,
}

impl Default for GuideLoopConfig {
    fn default() -> Self {
        Self {
            nav_period_ms: 1000,
            obstacle_period_ms: 100,
            warning_cooldown_ms: 3000,
            max_warnings: 3,
            position_deadline_ms: 5000,
            ranging_deadline_ms: 1000,
            vision_deadline_ms: 1000,
        }
    }
}

impl GuideLoopConfig {
    fn deadline(&self, feed: SensorFeed) -> Duration {
        Duration::from_millis(match feed {
            SensorFeed::Position => self.position_deadline_ms,
            SensorFeed::Ranging => self.ranging_deadline_ms,
            SensorFeed::Vision => self.vision_deadline_ms,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// GuideLoop
// ─────────────────────────────────────────────────────────────────────────────

/// Owns the sensor rig and every per-tick subsystem.
pub struct GuideLoop {
    config: GuideLoopConfig,
    rig: SensorRig,
    session: SharedSession,
    ticket: Option<SessionTicket>,
    fusion: ObstacleFusion,
    suppressor: RepeatSuppressor,
    watchdog: FeedWatchdog,
    /// Feeds already reported silent.
    alerted: HashSet<SensorFeed>,
    /// Last ranging sample; fusion judges its staleness.
    last_ranging: Option<RangingReading>,
    bus: EventBus,
}

impl GuideLoop {
    /// A loop with default navigation thresholds and fusion tuning.
    pub fn new(config: GuideLoopConfig, rig: SensorRig) -> Self {
        Self::with_parts(
            config,
            rig,
            SharedSession::new(NavThresholds::default()),
            FusionConfig::default(),
        )
    }

    pub fn with_parts(
        config: GuideLoopConfig,
        rig: SensorRig,
        session: SharedSession,
        fusion: FusionConfig,
    ) -> Self {
        let now = Instant::now();
        let mut watchdog = FeedWatchdog::new();
        for feed in [SensorFeed::Position, SensorFeed::Ranging, SensorFeed::Vision] {
            watchdog.register(feed, config.deadline(feed), now);
        }
        Self {
            suppressor: RepeatSuppressor::new(Duration::from_millis(config.warning_cooldown_ms)),
            config,
            rig,
            session,
            ticket: None,
            fusion: ObstacleFusion::new(fusion),
            watchdog,
            alerted: HashSet::new(),
            last_ranging: None,
            bus: EventBus::default(),
        }
    }

    /// Use an externally owned bus instead of the loop's own.
    pub fn with_bus(mut self, bus: EventBus) -> Self {
        self.bus = bus;
        self
    }

    /// Return a clone of the event bus for subscribers.
    pub fn bus(&self) -> EventBus {
        self.bus.clone()
    }

    pub fn session(&self) -> SharedSession {
        self.session.clone()
    }

    pub fn status(&self) -> NavStatus {
        self.session.read(|s| s.status())
    }

    pub fn config(&self) -> &GuideLoopConfig {
        &self.config
    }

    pub fn rig(&self) -> &SensorRig {
        &self.rig
    }

    pub fn rig_mut(&mut self) -> &mut SensorRig {
        &mut self.rig
    }

    /// `true` while the loop holds a ticket for the current session.
    pub fn is_driving(&self) -> bool {
        self.ticket.is_some()
    }

    /// Feeds currently reported silent, in watchdog order.
    pub fn silent_feeds(&self) -> Vec<SensorFeed> {
        [SensorFeed::Position, SensorFeed::Ranging, SensorFeed::Vision]
            .into_iter()
            .filter(|feed| self.alerted.contains(feed))
            .collect()
    }

    // ── Session commands ─────────────────────────────────────────────────────

    /// Replace the active route and take the ticket for it.
    pub fn start_navigation(&mut self, route: Route) -> Result<(), GuideError> {
        let (ticket, events) = self.session.start_navigation(route)?;
        info!(generation = ticket.generation(), "guide loop navigating");
        self.ticket = Some(ticket);
        self.suppressor.reset();
        self.publish_nav(events);
        Ok(())
    }

    /// Fetch directions from the current fix and start navigating them.
    ///
    /// # Errors
    ///
    /// [`GuideError::SensorFault`] without a position fix, or whatever the
    /// provider or [`start_navigation`][Self::start_navigation] returns.
    pub fn navigate_to(
        &mut self,
        provider: &dyn RouteProvider,
        destination: &str,
        mode: DirectionsMode,
    ) -> Result<(), GuideError> {
        let origin = self
            .rig
            .poll_position()
            .ok_or_else(|| GuideError::SensorFault {
                component: SensorFeed::Position.to_string(),
                details: "no fix to route from".to_string(),
            })?;
        self.watchdog.record(SensorFeed::Position, Instant::now());
        let route = provider.get_directions(origin, destination, mode)?;
        self.start_navigation(route)
    }

    pub fn stop_navigation(&mut self) {
        self.ticket = None;
        let events = self.session.stop_navigation();
        self.publish_nav(events);
    }

    pub fn board(&mut self) -> Result<(), GuideError> {
        let ticket = self.ticket()?;
        let events = self.guard(self.session.board(&ticket))?;
        self.publish_nav(events);
        Ok(())
    }

    pub fn mark_stop_passed(&mut self) -> Result<(), GuideError> {
        let ticket = self.ticket()?;
        let events = self.guard(self.session.mark_stop_passed(&ticket))?;
        self.publish_nav(events);
        Ok(())
    }

    pub fn advance_step(&mut self) -> Result<(), GuideError> {
        let ticket = self.ticket()?;
        let events = self.guard(self.session.advance_step(&ticket))?;
        self.publish_nav(events);
        Ok(())
    }

    // ── Ticks ────────────────────────────────────────────────────────────────

    /// One navigation cycle.  `Ok(None)` when the loop is not driving a
    /// session.
    pub fn nav_tick(&mut self, now: Instant) -> Result<Option<UpdateOutcome>, GuideError> {
        let fix = self.rig.poll_position();
        if fix.is_some() {
            self.watchdog.record(SensorFeed::Position, now);
        }
        self.check_feeds(now);

        let Some(ticket) = self.ticket else {
            return Ok(None);
        };
        let outcome = self.guard(self.session.update(&ticket, fix, now))?;
        if outcome.stale
            && let Some(age) = outcome.fix_age
        {
            debug!(age_ms = age.as_millis() as u64, "navigating on stale fix");
        }
        self.publish_nav(outcome.events.clone());
        Ok(Some(outcome))
    }

    /// One obstacle cycle.  Returns the warnings that were published.
    ///
    /// At most `max_warnings` are published; repeats muted by the suppressor
    /// do not count against that limit.
    pub fn obstacle_tick(&mut self, now: Instant) -> Vec<Warning> {
        if let Some(reading) = self.rig.poll_ranging() {
            self.watchdog.record(SensorFeed::Ranging, reading.taken_at);
            self.last_ranging = Some(reading);
        }
        let objects = match self.rig.poll_vision() {
            Ok(detections) => {
                self.watchdog.record(SensorFeed::Vision, detections.taken_at);
                detections.objects
            }
            Err(e) => {
                debug!(error = %e, "no detections this tick");
                Vec::new()
            }
        };

        let warnings =
            self.fusion
                .generate_obstacle_warnings(&objects, self.last_ranging.as_ref(), now);
        let fresh = self
            .suppressor
            .filter(warnings, self.config.max_warnings, now);
        if !fresh.is_empty() {
            self.publish(EventPayload::Obstacles(fresh.clone()));
        }
        fresh
    }

    /// Raise one alert per newly silent feed and re-arm recovered ones.
    pub fn check_feeds(&mut self, now: Instant) {
        let silent = self.watchdog.check_all(now);
        for feed in &silent {
            if self.alerted.insert(*feed) {
                warn!(%feed, "sensor feed silent");
                self.publish(EventPayload::SystemAlert {
                    component: feed.to_string(),
                    message: feed.silence_message().to_string(),
                });
            }
        }
        self.alerted.retain(|feed| {
            let still_silent = silent.contains(feed);
            if !still_silent {
                info!(%feed, "sensor feed recovered");
            }
            still_silent
        });
    }

    /// Run both ticks until `shutdown` flips to `true` or its sender drops.
    /// Hands the loop back so the caller can inspect or restart it.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Self {
        let mut nav = tokio::time::interval(Duration::from_millis(self.config.nav_period_ms.max(1)));
        let mut obstacles =
            tokio::time::interval(Duration::from_millis(self.config.obstacle_period_ms.max(1)));
        nav.set_missed_tick_behavior(MissedTickBehavior::Skip);
        obstacles.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            nav_period_ms = self.config.nav_period_ms,
            obstacle_period_ms = self.config.obstacle_period_ms,
            "guide loop started"
        );
        loop {
            tokio::select! {
                _ = nav.tick() => {
                    if let Err(e) = self.nav_tick(Instant::now()) {
                        warn!(error = %e, "navigation tick failed");
                    }
                }
                _ = obstacles.tick() => {
                    self.obstacle_tick(Instant::now());
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("guide loop stopped");
        self
    }

    // ── internals ────────────────────────────────────────────────────────────

    fn ticket(&self) -> Result<SessionTicket, GuideError> {
        self.ticket
            .ok_or_else(|| GuideError::NotNavigating(self.status()))
    }

    /// A stale ticket is dropped so the loop stops driving the session.
    fn guard<T>(&mut self, result: Result<T, GuideError>) -> Result<T, GuideError> {
        if let Err(GuideError::StaleSession { held, current }) = &result {
            warn!(held, current, "session replaced, guide loop released it");
            self.ticket = None;
        }
        result
    }

    fn publish_nav(&self, events: Vec<NavEvent>) {
        for event in events {
            self.publish(EventPayload::Navigation(event));
        }
    }

    fn publish(&self, payload: EventPayload) {
        if let Err(e) = self.bus.publish(Event::new(SOURCE, payload)) {
            debug!(error = %e, "event dropped");
        }
    }
}

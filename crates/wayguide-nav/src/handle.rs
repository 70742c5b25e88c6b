//! [`SharedSession`] – single-writer access to a [`NavigationSession`].
//!
//! The position task, the transit commands and the UI all drive the same
//! session.  Every mutating call goes through one mutex, so step-index
//! monotonicity and announce-once hold however the callers interleave.
//!
//! Starting navigation hands back a [`SessionTicket`] stamped with the
//! session generation.  A later `start_navigation` (or `stop_navigation`)
//! bumps the generation; any caller still presenting the old ticket is
//! refused with [`GuideError::StaleSession`] and must stop driving.
//!
//! # Example
//!
//! ```
//! use std::time::Instant;
//! use wayguide_nav::SharedSession;
//! use wayguide_types::{GeoPoint, GuideError, Route, RouteStep, TravelMode};
//!
//! let route = || Route::new(vec![RouteStep {
//!     mode: TravelMode::Walk,
//!     instruction: "Walk north".to_string(),
//!     start: GeoPoint { lat: 0.0, lon: 0.0 },
//!     end: GeoPoint { lat: 0.001, lon: 0.0 },
//!     distance_m: 111.0,
//!     duration_s: 80.0,
//! }]);
//!
//! let shared = SharedSession::default();
//! let (old, _) = shared.start_navigation(route()).unwrap();
//! let (_new, _) = shared.start_navigation(route()).unwrap();
//!
//! let err = shared.update(&old, None, Instant::now()).unwrap_err();
//! assert!(matches!(err, GuideError::StaleSession { held: 1, current: 2 }));
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tracing::warn;
use wayguide_types::{GeoPoint, GuideError, NavEvent};

use crate::session::{NavThresholds, NavigationSession, Progress, UpdateOutcome};

/// Proof that the holder started the current navigation generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionTicket {
    generation: u64,
}

impl SessionTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Cloneable, thread-safe handle to one navigation session.
#[derive(Debug, Clone, Default)]
pub struct SharedSession {
    inner: Arc<Mutex<NavigationSession>>,
}

impl SharedSession {
    pub fn new(thresholds: NavThresholds) -> Self {
        Self {
            inner: Arc::new(Mutex::new(NavigationSession::new(thresholds))),
        }
    }

    /// Poisoned locks are recovered.
    fn lock(&self) -> MutexGuard<'_, NavigationSession> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(session: &NavigationSession, ticket: &SessionTicket) -> Result<(), GuideError> {
        let current = session.generation();
        if ticket.generation == current {
            Ok(())
        } else {
            warn!(held = ticket.generation, current, "stale session ticket");
            Err(GuideError::StaleSession {
                held: ticket.generation,
                current,
            })
        }
    }

    /// Atomically replace the session.  See
    /// [`NavigationSession::start_navigation`].
    pub fn start_navigation(
        &self,
        route: wayguide_types::Route,
    ) -> Result<(SessionTicket, Vec<NavEvent>), GuideError> {
        let mut session = self.lock();
        let events = session.start_navigation(route)?;
        Ok((
            SessionTicket {
                generation: session.generation(),
            },
            events,
        ))
    }

    /// Stop whatever is running; every outstanding ticket becomes stale.
    pub fn stop_navigation(&self) -> Vec<NavEvent> {
        self.lock().stop_navigation()
    }

    pub fn update(
        &self,
        ticket: &SessionTicket,
        position: Option<GeoPoint>,
        now: Instant,
    ) -> Result<UpdateOutcome, GuideError> {
        let mut session = self.lock();
        Self::check(&session, ticket)?;
        session.update(position, now)
    }

    pub fn advance_step(&self, ticket: &SessionTicket) -> Result<Vec<NavEvent>, GuideError> {
        let mut session = self.lock();
        Self::check(&session, ticket)?;
        session.advance_step()
    }

    pub fn board(&self, ticket: &SessionTicket) -> Result<Vec<NavEvent>, GuideError> {
        let mut session = self.lock();
        Self::check(&session, ticket)?;
        session.board()
    }

    pub fn mark_stop_passed(&self, ticket: &SessionTicket) -> Result<Vec<NavEvent>, GuideError> {
        let mut session = self.lock();
        Self::check(&session, ticket)?;
        session.mark_stop_passed()
    }

    pub fn get_progress(&self) -> Progress {
        self.lock().get_progress()
    }

    /// Run `f` against the session under the lock.
    pub fn read<R>(&self, f: impl FnOnce(&NavigationSession) -> R) -> R {
        f(&self.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use wayguide_types::{NavStatus, Route, RouteStep, TravelMode};

    fn route() -> Route {
        Route::new(vec![
            RouteStep {
                mode: TravelMode::Walk,
                instruction: "Walk north".to_string(),
                start: GeoPoint { lat: 0.0, lon: 0.0 },
                end: GeoPoint {
                    lat: 0.001,
                    lon: 0.0,
                },
                distance_m: 111.0,
                duration_s: 80.0,
            },
            RouteStep {
                mode: TravelMode::Walk,
                instruction: "Walk east".to_string(),
                start: GeoPoint {
                    lat: 0.001,
                    lon: 0.0,
                },
                end: GeoPoint {
                    lat: 0.001,
                    lon: 0.001,
                },
                distance_m: 111.0,
                duration_s: 80.0,
            },
        ])
    }

    #[test]
    fn current_ticket_drives_session() {
        let shared = SharedSession::default();
        let (ticket, events) = shared.start_navigation(route()).unwrap();
        assert_eq!(ticket.generation(), 1);
        assert_eq!(events.len(), 1);
        shared.advance_step(&ticket).unwrap();
        assert_eq!(shared.get_progress().step_index, 1);
    }

    #[test]
    fn restart_invalidates_old_ticket() {
        let shared = SharedSession::default();
        let (old, _) = shared.start_navigation(route()).unwrap();
        let (new, _) = shared.start_navigation(route()).unwrap();
        assert_eq!(
            shared.advance_step(&old),
            Err(GuideError::StaleSession { held: 1, current: 2 })
        );
        assert!(shared.advance_step(&new).is_ok());
    }

    #[test]
    fn stop_invalidates_ticket() {
        let shared = SharedSession::default();
        let (ticket, _) = shared.start_navigation(route()).unwrap();
        shared.stop_navigation();
        assert!(matches!(
            shared.board(&ticket),
            Err(GuideError::StaleSession { .. })
        ));
        assert_eq!(shared.read(|s| s.status()), NavStatus::Idle);
    }

    #[test]
    fn failed_start_keeps_existing_ticket_valid() {
        let shared = SharedSession::default();
        let (ticket, _) = shared.start_navigation(route()).unwrap();
        assert!(shared.start_navigation(Route::new(vec![])).is_err());
        assert!(shared.update(&ticket, None, Instant::now()).is_ok());
    }

    #[test]
    fn concurrent_callers_never_skip_steps() {
        let shared = SharedSession::default();
        let (ticket, _) = shared.start_navigation(route()).unwrap();
        let at_first_end = GeoPoint {
            lat: 0.001,
            lon: 0.0,
        };

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || {
                    shared
                        .update(&ticket, Some(at_first_end), Instant::now())
                        .unwrap()
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        // Only the first caller advances; the rest see step 1 and its end
        // ~111 m away.
        assert_eq!(shared.get_progress().step_index, 1);
        assert_eq!(shared.read(|s| s.status()), NavStatus::Navigating);
    }
}

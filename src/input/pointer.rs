//! Pointer position tracking.
//!
//! The tracker is the single writer of the pointer position. Every effect reads
//! a [`TrackerSnapshot`] copy and never touches the tracker state directly.

use crate::utils::geometry::{Extent, Position, Velocity};
use thiserror::Error;

/// Largest per-event jump (logical pixels) the validation pass accepts.
pub const DEFAULT_MAX_VELOCITY: f64 = 2000.0;

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum TrackerError {
    #[error("Pointer coordinates are not finite: ({0}, {1})")]
    NonFinite(f64, f64),
    #[error("Pointer coordinates ({0}, {1}) are outside of the viewport bounds")]
    OutOfBounds(f64, f64),
    #[error("Pointer velocity {0:.1} exceeds the allowed maximum")]
    ExtremeVelocity(f64),
}

/// Immutable copy of the tracker state handed to the effects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerSnapshot {
    pub current: Position,
    pub previous: Position,
    /// Bumped on every accepted update, reset or rollback.
    pub version: u64,
}

impl TrackerSnapshot {
    fn origin(version: u64) -> Self {
        Self {
            current: Position::ORIGIN,
            previous: Position::ORIGIN,
            version,
        }
    }

    pub fn velocity(&self) -> Velocity {
        Velocity::new(
            self.current.x - self.previous.x,
            self.current.y - self.previous.y,
        )
    }

    /// True once at least one pointer position was accepted.
    pub fn has_position(&self) -> bool {
        self.version > 0
    }
}

#[derive(Debug)]
pub struct PositionTracker {
    state: TrackerSnapshot,
    last_valid: Option<TrackerSnapshot>,
    viewport: Extent,
    max_velocity: f64,
    /// The next accepted update starts a new stroke instead of continuing
    /// from `state.current`.
    detached: bool,
}

impl PositionTracker {
    pub fn new(viewport: Extent) -> Self {
        Self::with_max_velocity(viewport, DEFAULT_MAX_VELOCITY)
    }

    pub fn with_max_velocity(viewport: Extent, max_velocity: f64) -> Self {
        Self {
            state: TrackerSnapshot::origin(0),
            last_valid: None,
            viewport,
            max_velocity,
            detached: false,
        }
    }

    pub fn set_viewport(&mut self, viewport: Extent) {
        log::debug!("PositionTracker::set_viewport: {viewport:?}");
        self.viewport = viewport;
    }

    pub fn viewport(&self) -> Extent {
        self.viewport
    }

    /// Accepts a new pointer position.
    ///
    /// Non-finite coordinates and coordinates outside `[0, 2 × viewport]` are
    /// rejected without touching the tracker state.
    pub fn update(&mut self, x: f64, y: f64) -> Result<TrackerSnapshot, TrackerError> {
        if !x.is_finite() || !y.is_finite() {
            log::warn!("PositionTracker::update: rejecting non finite position ({x}, {y})");
            return Err(TrackerError::NonFinite(x, y));
        }

        let position = Position::new(x, y);
        if !position.is_within(self.viewport) {
            log::warn!(
                "PositionTracker::update: rejecting out of bounds position {position} viewport {:?}",
                self.viewport
            );
            return Err(TrackerError::OutOfBounds(x, y));
        }

        /* First position of a stroke has no meaningful previous one. */
        let previous = if self.state.has_position() && !self.detached {
            self.state.current
        } else {
            position
        };
        self.detached = false;
        self.state = TrackerSnapshot {
            current: position,
            previous,
            version: self.state.version + 1,
        };
        Ok(self.state)
    }

    pub fn current(&self) -> TrackerSnapshot {
        self.state
    }

    pub fn velocity(&self) -> Velocity {
        self.state.velocity()
    }

    /// Ends the current stroke, e.g. when the pointer leaves the window.
    ///
    /// The last position stays readable; the next update is not measured
    /// against it.
    pub fn detach(&mut self) {
        self.detached = true;
    }

    /// Checks the current state and recovers from a bad one.
    ///
    /// A valid state is remembered as the rollback target. An invalid state
    /// (non-finite values or a jump above the velocity limit) is replaced by
    /// the last valid snapshot, or by the origin if there never was one.
    pub fn validate(&mut self) -> Result<(), TrackerError> {
        match self.check_state() {
            Ok(()) => {
                self.last_valid = Some(self.state);
                Ok(())
            }
            Err(e) => {
                match self.last_valid {
                    Some(snapshot) => {
                        let version = self.state.version + 1;
                        log::warn!(
                            "PositionTracker::validate: {e}, rolling back to {}",
                            snapshot.current
                        );
                        self.state = TrackerSnapshot {
                            version,
                            ..snapshot
                        };
                        /* The real pointer is elsewhere, do not measure the next move from here. */
                        self.detached = true;
                    }
                    None => {
                        log::warn!("PositionTracker::validate: {e}, resetting to origin");
                        self.reset();
                    }
                }
                Err(e)
            }
        }
    }

    fn check_state(&self) -> Result<(), TrackerError> {
        let TrackerSnapshot {
            current, previous, ..
        } = self.state;
        if !current.is_finite() {
            return Err(TrackerError::NonFinite(current.x, current.y));
        }
        if !previous.is_finite() {
            return Err(TrackerError::NonFinite(previous.x, previous.y));
        }
        let speed = self.state.velocity().magnitude();
        if speed > self.max_velocity {
            return Err(TrackerError::ExtremeVelocity(speed));
        }
        Ok(())
    }

    pub fn reset(&mut self) {
        log::debug!("PositionTracker::reset");
        self.state = TrackerSnapshot::origin(self.state.version + 1);
        self.last_valid = None;
        self.detached = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> PositionTracker {
        PositionTracker::new(Extent::new(800.0, 600.0))
    }

    #[test]
    fn test_update_accepts_and_bumps_version() {
        let mut tracker = tracker();
        let first = tracker.update(100.0, 100.0).unwrap();
        assert_eq!(first.version, 1);
        assert_eq!(first.current, Position::new(100.0, 100.0));
        assert_eq!(first.previous, Position::new(100.0, 100.0));

        let second = tracker.update(110.0, 90.0).unwrap();
        assert_eq!(second.version, 2);
        assert_eq!(second.previous, Position::new(100.0, 100.0));
        assert_eq!(tracker.velocity(), Velocity::new(10.0, -10.0));
    }

    #[test]
    fn test_nan_is_rejected_without_mutation() {
        let mut tracker = tracker();
        tracker.update(20.0, 50.0).unwrap();
        let before = tracker.current();

        let result = tracker.update(f64::NAN, 50.0);
        assert!(matches!(result, Err(TrackerError::NonFinite(_, _))));
        assert_eq!(tracker.current(), before);
        assert_eq!(tracker.current().current, Position::new(20.0, 50.0));
    }

    #[test]
    fn test_out_of_bounds_is_rejected_without_mutation() {
        let mut tracker = tracker();
        tracker.update(20.0, 50.0).unwrap();
        let before = tracker.current();

        for (x, y) in [
            (-1.0, 10.0),
            (10.0, -0.01),
            (1600.5, 10.0),
            (10.0, 1201.0),
            (f64::INFINITY, 10.0),
        ] {
            assert!(tracker.update(x, y).is_err(), "({x}, {y}) accepted");
            assert_eq!(tracker.current(), before);
        }

        // The expanded bound itself is still valid
        assert!(tracker.update(1600.0, 1200.0).is_ok());
    }

    #[test]
    fn test_current_does_not_mutate() {
        let mut tracker = tracker();
        tracker.update(1.0, 2.0).unwrap();
        let a = tracker.current();
        let b = tracker.current();
        assert_eq!(a, b);
        assert_eq!(a.version, 1);
    }

    #[test]
    fn test_validate_rolls_back_extreme_velocity() {
        let mut tracker = PositionTracker::with_max_velocity(Extent::new(800.0, 600.0), 100.0);
        tracker.update(10.0, 10.0).unwrap();
        tracker.update(20.0, 20.0).unwrap();
        assert!(tracker.validate().is_ok());
        let valid = tracker.current();

        tracker.update(700.0, 500.0).unwrap();
        let result = tracker.validate();
        assert!(matches!(result, Err(TrackerError::ExtremeVelocity(_))));

        let restored = tracker.current();
        assert_eq!(restored.current, valid.current);
        assert_eq!(restored.previous, valid.previous);
        assert!(restored.version > valid.version + 1);
    }

    #[test]
    fn test_validate_resets_to_origin_without_valid_snapshot() {
        let mut tracker = PositionTracker::with_max_velocity(Extent::new(800.0, 600.0), 100.0);
        tracker.update(10.0, 10.0).unwrap();
        tracker.update(700.0, 500.0).unwrap();

        assert!(tracker.validate().is_err());
        let state = tracker.current();
        assert_eq!(state.current, Position::ORIGIN);
        assert_eq!(state.previous, Position::ORIGIN);
        assert_eq!(state.version, 3);
    }

    #[test]
    fn test_moves_after_rollback_are_not_measured_from_stale_position() {
        let mut tracker = PositionTracker::with_max_velocity(Extent::new(800.0, 600.0), 100.0);
        tracker.update(10.0, 10.0).unwrap();
        assert!(tracker.validate().is_ok());

        tracker.update(700.0, 500.0).unwrap();
        assert!(tracker.validate().is_err());
        assert_eq!(tracker.current().current, Position::new(10.0, 10.0));

        let snapshot = tracker.update(705.0, 500.0).unwrap();
        assert_eq!(snapshot.previous, Position::new(705.0, 500.0));
        assert!(tracker.validate().is_ok());

        tracker.update(710.0, 505.0).unwrap();
        assert!(tracker.validate().is_ok());
        assert_eq!(tracker.current().current, Position::new(710.0, 505.0));
        assert_eq!(tracker.velocity(), Velocity::new(5.0, 5.0));
    }

    #[test]
    fn test_detach_starts_a_new_stroke() {
        let mut tracker = PositionTracker::with_max_velocity(Extent::new(800.0, 600.0), 100.0);
        tracker.update(10.0, 10.0).unwrap();
        assert!(tracker.validate().is_ok());

        tracker.detach();
        assert_eq!(tracker.current().current, Position::new(10.0, 10.0));
        tracker.update(790.0, 590.0).unwrap();
        assert!(tracker.validate().is_ok());
        assert_eq!(tracker.velocity(), Velocity::new(0.0, 0.0));
    }

    #[test]
    fn test_reset_returns_to_origin() {
        let mut tracker = tracker();
        tracker.update(10.0, 10.0).unwrap();
        tracker.update(20.0, 20.0).unwrap();
        tracker.reset();
        let state = tracker.current();
        assert_eq!(state.current, Position::ORIGIN);
        assert_eq!(state.version, 3);

        let snapshot = tracker.update(300.0, 300.0).unwrap();
        assert_eq!(snapshot.previous, Position::new(300.0, 300.0));
    }

    #[test]
    fn test_viewport_change_moves_bounds() {
        let mut tracker = tracker();
        assert!(tracker.update(1700.0, 100.0).is_err());
        tracker.set_viewport(Extent::new(1000.0, 600.0));
        assert!(tracker.update(1700.0, 100.0).is_ok());
    }
}

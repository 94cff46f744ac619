//! Mouse button helpers.

use crate::utils::clock::Clock;
use crate::utils::geometry::Position;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DOUBLE_CLICK_INTERVAL: Duration = Duration::from_millis(400);
/// Largest distance (logical pixels) between the two presses of a double click.
pub const DOUBLE_CLICK_DISTANCE: f64 = 6.0;

/// Recognizes double clicks from a stream of button presses.
///
/// winit only reports single presses, so two presses close in time and space
/// are folded into one double click here.
#[derive(Debug)]
pub struct DoubleClickDetector {
    clock: Arc<dyn Clock>,
    last_press: Option<(Instant, Position)>,
}

impl DoubleClickDetector {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            last_press: None,
        }
    }

    /// Registers a press. Returns true when it completes a double click.
    pub fn press(&mut self, position: Position) -> bool {
        let now = self.clock.now();
        let is_double = self.last_press.is_some_and(|(at, last)| {
            now.duration_since(at) <= DOUBLE_CLICK_INTERVAL
                && last.distance(&position) <= DOUBLE_CLICK_DISTANCE
        });

        /* A third press starts a new sequence. */
        self.last_press = if is_double { None } else { Some((now, position)) };
        is_double
    }

    pub fn reset(&mut self) {
        self.last_press = None;
    }
}

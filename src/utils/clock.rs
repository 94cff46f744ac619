use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Longest step a single frame may advance the simulation by.
pub const MAX_FRAME_DT: f32 = 1.0 / 15.0;
/// Step used when the measured delta is unusable (first frame, zero, clock skew).
pub const REFERENCE_FRAME_DT: f32 = 1.0 / 60.0;

pub trait Clock: Send + Sync + std::fmt::Debug + 'static {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy)]
pub struct RealClock;

impl Clock for RealClock {
    #[inline(always)]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

pub fn default_clock() -> Arc<dyn Clock> {
    Arc::new(RealClock)
}

#[derive(Debug)]
pub struct TestClock {
    current: Mutex<Instant>,
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TestClock {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, duration: Duration) {
        let mut current = self.current.lock().unwrap();
        *current += duration;
    }
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        *self.current.lock().unwrap()
    }
}

/// Measures the delta between consecutive frames.
///
/// The returned step is always strictly positive and never larger than
/// [`MAX_FRAME_DT`], so a stalled window does not launch every particle
/// across the screen on the next frame.
#[derive(Debug)]
pub struct FrameClock {
    clock: Arc<dyn Clock>,
    last_tick: Option<Instant>,
}

impl FrameClock {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            last_tick: None,
        }
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Returns the clamped step since the previous call, in seconds.
    pub fn tick(&mut self) -> f32 {
        let now = self.clock.now();
        let dt = match self.last_tick {
            Some(last) => now.duration_since(last).as_secs_f32(),
            None => REFERENCE_FRAME_DT,
        };
        self.last_tick = Some(now);
        clamp_frame_dt(dt)
    }

    /// Forgets the previous tick, the next step will be a reference frame.
    pub fn reset(&mut self) {
        self.last_tick = None;
    }
}

pub fn clamp_frame_dt(dt: f32) -> f32 {
    if !dt.is_finite() || dt <= 0.0 {
        return REFERENCE_FRAME_DT;
    }
    dt.min(MAX_FRAME_DT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_tick_is_reference_frame() {
        let clock = Arc::new(TestClock::new());
        let mut frame_clock = FrameClock::new(clock);
        assert_eq!(frame_clock.tick(), REFERENCE_FRAME_DT);
    }

    #[test]
    fn test_tick_is_clamped() {
        let clock = Arc::new(TestClock::new());
        let mut frame_clock = FrameClock::new(clock.clone());
        frame_clock.tick();

        clock.advance(Duration::from_secs(2));
        assert_eq!(frame_clock.tick(), MAX_FRAME_DT);

        // Same instant twice must still move the simulation forward
        assert_eq!(frame_clock.tick(), REFERENCE_FRAME_DT);

        clock.advance(Duration::from_millis(20));
        let dt = frame_clock.tick();
        assert!((dt - 0.02).abs() < 1e-4);
    }

    #[test]
    fn test_reset_forgets_previous_tick() {
        let clock = Arc::new(TestClock::new());
        let mut frame_clock = FrameClock::new(clock.clone());
        frame_clock.tick();
        clock.advance(Duration::from_millis(50));
        frame_clock.reset();
        assert_eq!(frame_clock.tick(), REFERENCE_FRAME_DT);
    }

    #[test]
    fn test_clamp_frame_dt_rejects_garbage() {
        assert_eq!(clamp_frame_dt(f32::NAN), REFERENCE_FRAME_DT);
        assert_eq!(clamp_frame_dt(-1.0), REFERENCE_FRAME_DT);
        assert_eq!(clamp_frame_dt(f32::INFINITY), REFERENCE_FRAME_DT);
    }
}
